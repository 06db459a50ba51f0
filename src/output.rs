//! Output formatting for aggregate results.
//!
//! Supports a human-readable per-source summary and JSON.

use anyhow::Result;
use std::fmt::Write;

use crate::observation::{AggregateResult, Observation, ProviderName, ProviderResult};
use crate::poller::PollUpdate;

/// Serializes the result as pretty-printed JSON.
pub fn to_json(result: &AggregateResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

fn describe(obs: &Observation) -> String {
    format!(
        "{:.4}, {:.4}  alt {:.0} ft  gs {:.0} kt  hdg {:.0}°  vs {:+.0} ft/min",
        obs.latitude(),
        obs.longitude(),
        obs.altitude_feet(),
        obs.speed_knots(),
        obs.track_degrees(),
        obs.vertical_rate_ft_per_min(),
    )
}

/// Renders the best position followed by one line per provider, marking
/// providers without data as "No match" or "Unavailable".
pub fn render_summary(result: &AggregateResult) -> String {
    let mut out = String::new();

    match (result.best(), result.source()) {
        (Some(best), Some(source)) => {
            let _ = writeln!(out, "Best ({source}): {}", describe(best));
        }
        _ => {
            let _ = writeln!(out, "Best: no live position");
        }
    }

    for name in ProviderName::ALL {
        let line = match result.result_for(name) {
            Some(ProviderResult::Success(obs)) => describe(obs),
            Some(ProviderResult::Empty) => "No match".to_string(),
            Some(ProviderResult::Failure(reason)) => format!("Unavailable ({reason})"),
            None => "Not configured".to_string(),
        };
        let _ = writeln!(out, "  {:<22} {}", format!("{name}:"), line);
    }

    out
}

/// Summary of a poll update with its refresh countdown.
pub fn render_update(update: &PollUpdate) -> String {
    format!(
        "[#{} {}] refresh in {}s\n{}",
        update.cycle,
        update.published_at.format("%H:%M:%S"),
        update.next_refresh_in.as_secs(),
        render_summary(&update.result)
    )
}
