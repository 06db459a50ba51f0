//! Validated lookup input: a callsign plus an optional transponder hex.

use std::fmt;
use thiserror::Error;

/// Contract violations detected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("callsign is required")]
    EmptyCallsign,

    #[error("invalid callsign '{0}': expected 1-8 ASCII letters or digits")]
    InvalidCallsign(String),

    #[error("invalid aircraft hex '{0}': expected 6 hex digits")]
    InvalidHex(String),
}

const MAX_CALLSIGN_LEN: usize = 8;
const HEX_LEN: usize = 6;

/// What to look up in one aggregate cycle.
///
/// The callsign is stored uppercased and the hex lowercased, which is the
/// form each upstream expects in its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlightQuery {
    callsign: String,
    hex: Option<String>,
}

impl FlightQuery {
    /// Validates and normalizes the inputs. A blank hex counts as absent.
    pub fn new(callsign: &str, hex: Option<&str>) -> Result<Self, QueryError> {
        let callsign = callsign.trim();
        if callsign.is_empty() {
            return Err(QueryError::EmptyCallsign);
        }
        if callsign.len() > MAX_CALLSIGN_LEN
            || !callsign.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(QueryError::InvalidCallsign(callsign.to_string()));
        }

        let hex = match hex.map(str::trim).filter(|h| !h.is_empty()) {
            Some(h) if h.len() == HEX_LEN && h.chars().all(|c| c.is_ascii_hexdigit()) => {
                Some(h.to_ascii_lowercase())
            }
            Some(h) => return Err(QueryError::InvalidHex(h.to_string())),
            None => None,
        };

        Ok(Self {
            callsign: callsign.to_ascii_uppercase(),
            hex,
        })
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn hex(&self) -> Option<&str> {
        self.hex.as_deref()
    }
}

impl fmt::Display for FlightQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hex {
            Some(hex) => write!(f, "{} ({})", self.callsign, hex),
            None => f.write_str(&self.callsign),
        }
    }
}
