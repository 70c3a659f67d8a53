//! Precision policies.
//!
//! This module is intentionally small and conservative: one fixed-decimal
//! rounding rule, shared by the coordinate inverse transform and by stored
//! marker identifiers so both always agree on coordinate text.

/// Round `v` to `places` decimal places.
#[inline]
pub fn round_places(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}
