//! Conversions from provider-native SI units into the canonical unit set
//! (feet, knots, feet per minute, degrees).
//!
//! Every function is total: a missing or non-finite input yields `0.0`,
//! because feeds routinely omit fields for aircraft on the ground or
//! without a full state.

/// Feet per meter.
pub const FEET_PER_METER: f64 = 3.28084;
/// Knots per meter/second.
pub const KNOTS_PER_MPS: f64 = 1.94384;
/// Feet/minute per meter/second.
pub const FPM_PER_MPS: f64 = 196.85;

/// Returns the value if present and finite, otherwise `0.0`.
pub fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

// a product that overflows is treated like any other unusable value
fn scale(value: Option<f64>, factor: f64) -> f64 {
    finite_or_zero(Some(finite_or_zero(value) * factor))
}

pub fn meters_to_feet(meters: Option<f64>) -> f64 {
    scale(meters, FEET_PER_METER)
}

pub fn mps_to_knots(mps: Option<f64>) -> f64 {
    scale(mps, KNOTS_PER_MPS)
}

/// Vertical rate conversion; sign is preserved (negative means descending).
pub fn mps_to_feet_per_minute(mps: Option<f64>) -> f64 {
    scale(mps, FPM_PER_MPS)
}
