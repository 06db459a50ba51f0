//! Runtime configuration, read from the environment (and `.env` via the binary).

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::Aggregator;
use crate::fetch::{ApiKey, BasicClient, HttpClient};
use crate::observation::ProviderName;
use crate::providers::{FleetFeed, Provider, StateVectorFeed};

pub const DEFAULT_PRIMARY_FLEET_URL: &str = "https://api.airplanes.live/v2/callsign";
pub const DEFAULT_STATE_VECTOR_URL: &str = "https://opensky-network.org/api/states/all";
pub const DEFAULT_SECONDARY_FLEET_URL: &str = "https://opendata.adsb.fi/api/v2/callsign";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_PER_CALL_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub primary_fleet_url: String,
    pub state_vector_url: String,
    pub secondary_fleet_url: String,
    pub poll_interval: Duration,
    pub per_call_timeout: Duration,
    /// Bearer token for the state-vector feed. Anonymous access when unset.
    pub state_vector_token: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            primary_fleet_url: DEFAULT_PRIMARY_FLEET_URL.to_string(),
            state_vector_url: DEFAULT_STATE_VECTOR_URL.to_string(),
            secondary_fleet_url: DEFAULT_SECONDARY_FLEET_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            per_call_timeout: DEFAULT_PER_CALL_TIMEOUT,
            state_vector_token: None,
        }
    }
}

impl TrackerConfig {
    /// Reads `PRIMARY_FLEET_URL`, `STATE_VECTOR_URL`, `SECONDARY_FLEET_URL`,
    /// `POLL_INTERVAL_MS`, `PER_CALL_TIMEOUT_MS` and `OPENSKY_TOKEN`, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            primary_fleet_url: get("PRIMARY_FLEET_URL").unwrap_or(defaults.primary_fleet_url),
            state_vector_url: get("STATE_VECTOR_URL").unwrap_or(defaults.state_vector_url),
            secondary_fleet_url: get("SECONDARY_FLEET_URL").unwrap_or(defaults.secondary_fleet_url),
            poll_interval: match get("POLL_INTERVAL_MS") {
                Some(v) => parse_millis("POLL_INTERVAL_MS", &v)?,
                None => defaults.poll_interval,
            },
            per_call_timeout: match get("PER_CALL_TIMEOUT_MS") {
                Some(v) => parse_millis("PER_CALL_TIMEOUT_MS", &v)?,
                None => defaults.per_call_timeout,
            },
            state_vector_token: get("OPENSKY_TOKEN"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }
        if self.per_call_timeout.is_zero() {
            bail!("per-call timeout must be greater than zero");
        }
        Ok(())
    }

    /// Builds the aggregator over all three feeds with real HTTP clients.
    pub fn build_aggregator(&self) -> Result<Aggregator> {
        let client: Arc<dyn HttpClient> = Arc::new(BasicClient::new()?);

        let state_client: Arc<dyn HttpClient> = match &self.state_vector_token {
            Some(token) => Arc::new(ApiKey::bearer(BasicClient::new()?, token)?),
            None => Arc::clone(&client),
        };

        self.build_aggregator_with(client, state_client)
    }

    /// Builds the aggregator with caller-supplied clients for the fleet feeds
    /// and the state-vector feed.
    pub fn build_aggregator_with(
        &self,
        fleet_client: Arc<dyn HttpClient>,
        state_client: Arc<dyn HttpClient>,
    ) -> Result<Aggregator> {
        let primary: Arc<dyn Provider> = Arc::new(
            FleetFeed::new(
                ProviderName::PrimaryFleet,
                &self.primary_fleet_url,
                Arc::clone(&fleet_client),
            )
            .context("invalid PRIMARY_FLEET_URL")?,
        );
        let state_vector: Arc<dyn Provider> = Arc::new(
            StateVectorFeed::new(&self.state_vector_url, state_client)
                .context("invalid STATE_VECTOR_URL")?,
        );
        let secondary: Arc<dyn Provider> = Arc::new(
            FleetFeed::new(ProviderName::SecondaryFleet, &self.secondary_fleet_url, fleet_client)
                .context("invalid SECONDARY_FLEET_URL")?,
        );

        let providers = vec![primary, state_vector, secondary];
        Ok(Aggregator::new(providers))
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    let ms: u64 = value
        .parse()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got '{value}'"))?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = TrackerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.per_call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("POLL_INTERVAL_MS", "15000"),
            ("PER_CALL_TIMEOUT_MS", " 3000 "),
            ("SECONDARY_FLEET_URL", "https://api.adsb.lol/v2/callsign"),
            ("OPENSKY_TOKEN", "tok"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.per_call_timeout, Duration::from_secs(3));
        assert_eq!(config.secondary_fleet_url, "https://api.adsb.lol/v2/callsign");
        assert_eq!(config.state_vector_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(TrackerConfig::from_lookup(lookup(&[("POLL_INTERVAL_MS", "5s")])).is_err());
        assert!(TrackerConfig::from_lookup(lookup(&[("PER_CALL_TIMEOUT_MS", "0")])).is_err());
    }

    #[test]
    fn test_builds_all_three_feeds() {
        let aggregator = TrackerConfig::default().build_aggregator().unwrap();
        assert_eq!(
            aggregator.provider_names(),
            vec![
                ProviderName::PrimaryFleet,
                ProviderName::StateVector,
                ProviderName::SecondaryFleet
            ]
        );
    }

    #[test]
    fn test_invalid_url_is_reported() {
        let config = TrackerConfig {
            primary_fleet_url: "::nope::".to_string(),
            ..TrackerConfig::default()
        };
        let err = config.build_aggregator().err().expect("invalid URL must fail");
        assert!(err.to_string().contains("PRIMARY_FLEET_URL"));
    }
}
