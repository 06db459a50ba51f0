//! Normalized aircraft observations and the per-cycle aggregate built from them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::units::finite_or_zero;

/// The upstream feeds, in declaration order. Merge precedence is given by
/// [`ProviderName::priority`], not by this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    PrimaryFleet,
    StateVector,
    SecondaryFleet,
}

impl ProviderName {
    pub const ALL: [ProviderName; 3] = [
        ProviderName::PrimaryFleet,
        ProviderName::StateVector,
        ProviderName::SecondaryFleet,
    ];

    /// Merge rank, lower wins. The state-vector feed is the reference when it
    /// has data; the fleet feeds are fallbacks.
    pub fn priority(self) -> u8 {
        match self {
            ProviderName::StateVector => 0,
            ProviderName::PrimaryFleet => 1,
            ProviderName::SecondaryFleet => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProviderName::PrimaryFleet => "Primary fleet feed",
            ProviderName::StateVector => "State-vector feed",
            ProviderName::SecondaryFleet => "Secondary fleet feed",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized aircraft state snapshot.
///
/// Built once per adapter per cycle and never mutated afterwards; the
/// `with_*` methods consume the value and are only used while an adapter
/// assembles it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    latitude: f64,
    longitude: f64,
    track_degrees: f64,
    altitude_feet: f64,
    speed_knots: f64,
    vertical_rate_ft_per_min: f64,
    aircraft_id: String,
    source: ProviderName,
}

impl Observation {
    /// Starts an observation at the given position.
    ///
    /// Returns `None` when either coordinate is missing, non-finite or out of
    /// range, since an observation without a position is unusable.
    pub fn new(
        source: ProviderName,
        aircraft_id: impl Into<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Option<Self> {
        let latitude = latitude.filter(|v| v.is_finite() && (-90.0..=90.0).contains(v))?;
        let longitude = longitude.filter(|v| v.is_finite() && (-180.0..=180.0).contains(v))?;
        let aircraft_id: String = aircraft_id.into();

        Some(Self {
            latitude,
            longitude,
            track_degrees: 0.0,
            altitude_feet: 0.0,
            speed_knots: 0.0,
            vertical_rate_ft_per_min: 0.0,
            aircraft_id: aircraft_id.trim().to_ascii_lowercase(),
            source,
        })
    }

    /// Compass track, wrapped into `[0, 360)`.
    pub fn with_track(mut self, degrees: Option<f64>) -> Self {
        let track = finite_or_zero(degrees).rem_euclid(360.0);
        // rem_euclid rounds up to 360.0 for tiny negative inputs
        self.track_degrees = if track >= 360.0 { 0.0 } else { track };
        self
    }

    pub fn with_altitude_feet(mut self, feet: f64) -> Self {
        self.altitude_feet = finite_or_zero(Some(feet));
        self
    }

    pub fn with_speed_knots(mut self, knots: f64) -> Self {
        self.speed_knots = finite_or_zero(Some(knots));
        self
    }

    pub fn with_vertical_rate(mut self, ft_per_min: f64) -> Self {
        self.vertical_rate_ft_per_min = finite_or_zero(Some(ft_per_min));
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn track_degrees(&self) -> f64 {
        self.track_degrees
    }

    pub fn altitude_feet(&self) -> f64 {
        self.altitude_feet
    }

    pub fn speed_knots(&self) -> f64 {
        self.speed_knots
    }

    pub fn vertical_rate_ft_per_min(&self) -> f64 {
        self.vertical_rate_ft_per_min
    }

    /// Transponder hex, lowercased. Display only.
    pub fn aircraft_id(&self) -> &str {
        &self.aircraft_id
    }

    pub fn source(&self) -> ProviderName {
        self.source
    }
}

/// Why a provider produced no usable answer in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("adapter task aborted: {0}")]
    Aborted(String),
}

/// Outcome of one adapter call.
///
/// `Empty` means the feed answered but has nothing for this aircraft, which is
/// a normal outcome; `Failure` means the feed could not be used this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ProviderResult {
    Success(Observation),
    Empty,
    Failure(FailureReason),
}

impl ProviderResult {
    pub fn observation(&self) -> Option<&Observation> {
        match self {
            ProviderResult::Success(obs) => Some(obs),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProviderResult::Failure(_))
    }
}

impl From<FailureReason> for ProviderResult {
    fn from(reason: FailureReason) -> Self {
        ProviderResult::Failure(reason)
    }
}

/// Result of one aggregate cycle: the winning observation plus every
/// provider's individual outcome.
///
/// `best` is `None` exactly when no provider succeeded, and `source` always
/// names the provider whose slot in `raw` produced `best`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    best: Option<Observation>,
    source: Option<ProviderName>,
    raw: BTreeMap<ProviderName, ProviderResult>,
}

impl AggregateResult {
    /// Applies the priority merge over the collected provider outcomes.
    pub fn merge(raw: BTreeMap<ProviderName, ProviderResult>) -> Self {
        let winner = raw
            .iter()
            .filter_map(|(name, result)| result.observation().map(|obs| (*name, obs)))
            .min_by_key(|(name, _)| name.priority());

        let (source, best) = match winner {
            Some((name, obs)) => (Some(name), Some(obs.clone())),
            None => (None, None),
        };

        Self { best, source, raw }
    }

    pub fn best(&self) -> Option<&Observation> {
        self.best.as_ref()
    }

    pub fn source(&self) -> Option<ProviderName> {
        self.source
    }

    pub fn raw(&self) -> &BTreeMap<ProviderName, ProviderResult> {
        &self.raw
    }

    pub fn result_for(&self, name: ProviderName) -> Option<&ProviderResult> {
        self.raw.get(&name)
    }
}
