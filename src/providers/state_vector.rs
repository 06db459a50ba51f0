use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{Provider, parse_base_url};
use crate::fetch::{HttpClient, fetch_json};
use crate::observation::{Observation, ProviderName, ProviderResult};
use crate::query::FlightQuery;
use crate::units::{meters_to_feet, mps_to_feet_per_minute, mps_to_knots};

/// Payload of the state-vector endpoint. `states` is `null` when the
/// transponder is not currently seen.
#[derive(Debug, Deserialize)]
struct StateVectorResponse {
    #[serde(default)]
    time: Option<i64>,
    states: Option<Vec<Vec<Value>>>,
}

// Positions within a state row. This layout is the provider's wire contract.
const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE_M: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY_MPS: usize = 9;
const TRUE_TRACK: usize = 10;
const VERTICAL_RATE_MPS: usize = 11;

/// A state row with its positional fields named. Values are still SI.
#[derive(Debug)]
struct StateVector {
    icao24: String,
    callsign: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    baro_altitude_m: Option<f64>,
    on_ground: bool,
    velocity_mps: Option<f64>,
    true_track: Option<f64>,
    vertical_rate_mps: Option<f64>,
}

impl StateVector {
    fn from_row(row: &[Value]) -> Self {
        let number = |i: usize| row.get(i).and_then(Value::as_f64);
        let text = |i: usize| {
            row.get(i)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            icao24: text(ICAO24).unwrap_or_default(),
            callsign: text(CALLSIGN),
            longitude: number(LONGITUDE),
            latitude: number(LATITUDE),
            baro_altitude_m: number(BARO_ALTITUDE_M),
            on_ground: row.get(ON_GROUND).and_then(Value::as_bool).unwrap_or(false),
            velocity_mps: number(VELOCITY_MPS),
            true_track: number(TRUE_TRACK),
            vertical_rate_mps: number(VERTICAL_RATE_MPS),
        }
    }

    fn into_observation(self) -> Option<Observation> {
        let obs = Observation::new(
            ProviderName::StateVector,
            self.icao24,
            self.latitude,
            self.longitude,
        )?
        .with_track(self.true_track)
        .with_altitude_feet(meters_to_feet(self.baro_altitude_m))
        .with_speed_knots(mps_to_knots(self.velocity_mps))
        .with_vertical_rate(mps_to_feet_per_minute(self.vertical_rate_mps));
        Some(obs)
    }
}

/// Adapter for the state-vector-by-transponder endpoint
/// (`<base>?icao24=<hex>`). Needs the aircraft hex; without one it reports
/// `Empty` and makes no request.
pub struct StateVectorFeed {
    base_url: Url,
    client: Arc<dyn HttpClient>,
}

impl StateVectorFeed {
    pub fn new(base_url: &str, client: Arc<dyn HttpClient>) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client,
        })
    }

    fn request_url(&self, hex: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("icao24", hex);
        url
    }
}

#[async_trait]
impl Provider for StateVectorFeed {
    fn name(&self) -> ProviderName {
        ProviderName::StateVector
    }

    #[tracing::instrument(
        skip(self, query),
        fields(provider = %ProviderName::StateVector, hex = ?query.hex())
    )]
    async fn fetch(&self, query: &FlightQuery) -> ProviderResult {
        let Some(hex) = query.hex() else {
            debug!("No aircraft hex, skipping state-vector request");
            return ProviderResult::Empty;
        };

        let url = self.request_url(hex);
        let response: StateVectorResponse = match fetch_json(self.client.as_ref(), url).await {
            Ok(r) => r,
            Err(reason) => return ProviderResult::Failure(reason),
        };

        let feed_time = response.time;
        let Some(row) = response.states.unwrap_or_default().into_iter().next() else {
            return ProviderResult::Empty;
        };

        let state = StateVector::from_row(&row);
        debug!(
            feed_time = ?feed_time,
            icao24 = %state.icao24,
            callsign = ?state.callsign,
            on_ground = state.on_ground,
            "State vector received"
        );

        match state.into_observation() {
            Some(obs) => ProviderResult::Success(obs),
            None => {
                debug!("State vector has no usable position");
                ProviderResult::Empty
            }
        }
    }
}
