//! Scripted [`Provider`] for aggregator and poller tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use super::Provider;
use crate::observation::{Observation, ProviderName, ProviderResult};
use crate::query::FlightQuery;

pub(crate) struct StubProvider {
    name: ProviderName,
    result: ProviderResult,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    callsigns: Mutex<Vec<String>>,
}

impl StubProvider {
    pub(crate) fn new(name: ProviderName, result: ProviderResult) -> Self {
        Self {
            name,
            result,
            delay: None,
            gate: None,
            calls: AtomicUsize::new(0),
            callsigns: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn success(name: ProviderName, lat: f64, lon: f64) -> Self {
        Self::new(name, ProviderResult::Success(observation(name, lat, lon)))
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Each call holds until a permit is added to `gate`.
    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn callsigns(&self) -> Vec<String> {
        self.callsigns.lock().unwrap().clone()
    }
}

pub(crate) fn observation(name: ProviderName, lat: f64, lon: f64) -> Observation {
    Observation::new(name, "abc123", Some(lat), Some(lon))
        .unwrap()
        .with_track(Some(90.0))
        .with_altitude_feet(30000.0)
        .with_speed_knots(450.0)
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> ProviderName {
        self.name
    }

    async fn fetch(&self, query: &FlightQuery) -> ProviderResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.callsigns.lock().unwrap().push(query.callsign().to_string());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
