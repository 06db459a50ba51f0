//! Adapters for the upstream aircraft-position feeds.
//!
//! Each adapter owns one provider's request shape and payload schema and
//! converts the payload into an [`Observation`](crate::observation::Observation)
//! at its boundary, so nothing provider-specific reaches the merge logic.
//! Adapters make a single attempt per call and never return an error: every
//! outcome is a [`ProviderResult`].

mod fleet;
mod state_vector;
#[cfg(test)]
pub(crate) mod testing;

pub use fleet::FleetFeed;
pub use state_vector::StateVectorFeed;

use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Url;

use crate::observation::{ProviderName, ProviderResult};
use crate::query::FlightQuery;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> ProviderName;

    async fn fetch(&self, query: &FlightQuery) -> ProviderResult;
}

/// Parses a configured base URL, rejecting ones that cannot take path segments.
pub(crate) fn parse_base_url(base: &str) -> Result<Url> {
    let url = Url::parse(base)?;
    if url.cannot_be_a_base() {
        bail!("'{base}' cannot be used as a base URL");
    }
    Ok(url)
}
