use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{Provider, parse_base_url};
use crate::fetch::{HttpClient, fetch_json};
use crate::observation::{Observation, ProviderName, ProviderResult};
use crate::query::FlightQuery;

/// Payload of a fleet feed's callsign endpoint. The `ac` list is required;
/// a body without it is malformed, not empty.
#[derive(Debug, Deserialize)]
struct FleetResponse {
    ac: Vec<FleetAircraft>,
}

/// One aircraft object, already in feet / knots / ft-per-minute.
#[derive(Debug, Deserialize)]
struct FleetAircraft {
    #[serde(default)]
    hex: Option<String>,
    #[serde(default, deserialize_with = "number")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    lon: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    track: Option<f64>,
    #[serde(default, deserialize_with = "barometric_altitude")]
    alt_baro: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    gs: Option<f64>,
    #[serde(default, deserialize_with = "number")]
    baro_rate: Option<f64>,
}

// A field of the wrong type is treated as absent rather than failing the body.
fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(d)?.as_f64())
}

// `alt_baro` is the string "ground" for aircraft on the surface.
fn barometric_altitude<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if s.eq_ignore_ascii_case("ground") => Some(0.0),
        other => other.as_f64(),
    })
}

impl FleetAircraft {
    fn into_observation(self, source: ProviderName) -> Option<Observation> {
        let obs = Observation::new(source, self.hex.unwrap_or_default(), self.lat, self.lon)?
            .with_track(self.track)
            .with_altitude_feet(self.alt_baro.unwrap_or_default())
            .with_speed_knots(self.gs.unwrap_or_default())
            .with_vertical_rate(self.baro_rate.unwrap_or_default());
        Some(obs)
    }
}

/// Adapter for a fleet-position-by-callsign endpoint (`<base>/<CALLSIGN>`).
///
/// The primary and secondary fleet feeds share this schema and differ only in
/// base URL and the name they report under.
pub struct FleetFeed {
    name: ProviderName,
    base_url: Url,
    client: Arc<dyn HttpClient>,
}

impl FleetFeed {
    pub fn new(
        name: ProviderName,
        base_url: &str,
        client: Arc<dyn HttpClient>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            name,
            base_url: parse_base_url(base_url)?,
            client,
        })
    }

    fn request_url(&self, query: &FlightQuery) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(query.callsign());
        }
        url
    }
}

#[async_trait]
impl Provider for FleetFeed {
    fn name(&self) -> ProviderName {
        self.name
    }

    #[tracing::instrument(
        skip(self, query),
        fields(provider = %self.name, callsign = %query.callsign())
    )]
    async fn fetch(&self, query: &FlightQuery) -> ProviderResult {
        let url = self.request_url(query);
        let response: FleetResponse = match fetch_json(self.client.as_ref(), url).await {
            Ok(r) => r,
            Err(reason) => return ProviderResult::Failure(reason),
        };

        debug!(aircraft = response.ac.len(), "Fleet feed answered");

        match response.ac.into_iter().next() {
            Some(aircraft) => match aircraft.into_observation(self.name) {
                Some(obs) => ProviderResult::Success(obs),
                None => {
                    debug!("First aircraft has no usable position");
                    ProviderResult::Empty
                }
            },
            None => ProviderResult::Empty,
        }
    }
}
