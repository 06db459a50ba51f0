//! Live aircraft position by callsign, reconciled across several independent
//! tracking feeds and refreshed on a fixed cadence.

pub mod aggregator;
pub mod config;
pub mod fetch;
pub mod observation;
pub mod output;
pub mod poller;
pub mod providers;
pub mod query;
pub mod units;

pub use aggregator::Aggregator;
pub use config::TrackerConfig;
pub use observation::{AggregateResult, FailureReason, Observation, ProviderName, ProviderResult};
pub use poller::{PollUpdate, Poller, PollerState};
pub use query::{FlightQuery, QueryError};
