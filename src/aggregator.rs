//! Concurrent fan-out over all providers and the priority merge of their answers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, warn};

use crate::observation::{AggregateResult, FailureReason, ProviderName, ProviderResult};
use crate::providers::Provider;
use crate::query::FlightQuery;

/// Runs one aggregate cycle across a fixed set of providers.
///
/// Holds at most one provider per [`ProviderName`], since each name owns
/// exactly one slot in [`AggregateResult::raw`].
pub struct Aggregator {
    providers: Vec<Arc<dyn Provider>>,
}

impl Aggregator {
    /// Later providers reporting an already-registered name are dropped.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        let mut kept: Vec<Arc<dyn Provider>> = Vec::with_capacity(providers.len());
        for provider in providers {
            if kept.iter().any(|p| p.name() == provider.name()) {
                warn!(provider = %provider.name(), "Duplicate provider ignored");
                continue;
            }
            kept.push(provider);
        }
        Self { providers: kept }
    }

    pub fn provider_names(&self) -> Vec<ProviderName> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Queries every provider concurrently and merges the results.
    ///
    /// Each call is bounded by `per_call_timeout`; a call that runs over is
    /// recorded as [`FailureReason::Timeout`]. All calls are awaited before
    /// merging, since precedence rather than arrival order picks the winner.
    /// Never fails: with no successful provider the result has no `best`.
    /// Dropping the returned future aborts any calls still running.
    #[tracing::instrument(
        skip(self, query),
        fields(query = %query, timeout_ms = per_call_timeout.as_millis() as u64)
    )]
    pub async fn aggregate(
        &self,
        query: &FlightQuery,
        per_call_timeout: Duration,
    ) -> AggregateResult {
        let mut tasks = JoinSet::new();

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let query = query.clone();
            let name = provider.name();
            let span = tracing::info_span!("provider_fetch", provider = %name);

            tasks.spawn(
                async move {
                    let fetch = provider.fetch(&query);
                    let result = match tokio::time::timeout(per_call_timeout, fetch).await {
                        Ok(result) => result,
                        Err(_) => ProviderResult::Failure(FailureReason::Timeout),
                    };
                    (name, result)
                }
                .instrument(span),
            );
        }

        let mut raw = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    log_result(name, &result);
                    raw.insert(name, result);
                }
                Err(e) => warn!(error = %e, "Provider task did not complete"),
            }
        }

        // a task that panicked never reported its name
        for name in self.provider_names() {
            raw.entry(name).or_insert_with(|| {
                ProviderResult::Failure(FailureReason::Aborted("task panicked".to_string()))
            });
        }

        let merged = AggregateResult::merge(raw);
        match (merged.source(), merged.best()) {
            (Some(source), Some(best)) => info!(
                source = %source,
                lat = best.latitude(),
                lon = best.longitude(),
                altitude_ft = best.altitude_feet(),
                "Best observation selected"
            ),
            _ => info!("No live position from any provider"),
        }
        merged
    }
}

fn log_result(name: ProviderName, result: &ProviderResult) {
    match result {
        ProviderResult::Success(_) => debug!(provider = %name, "Provider returned a position"),
        ProviderResult::Empty => debug!(provider = %name, "Provider has no match"),
        ProviderResult::Failure(reason) => {
            warn!(provider = %name, reason = %reason, "Provider failed")
        }
    }
}
