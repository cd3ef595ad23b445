//! Rounding helpers matching Python's `round()`
//!
//! Distances and poll intervals are rounded half-to-even, so `2.5` becomes
//! `2` and `3.5` becomes `4`.

/// Round to the nearest integer, ties to even
pub fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

/// Round to `digits` decimal places, ties to even
pub fn round_to(value: f64, digits: u32) -> f64 {
    if digits == 0 {
        return round_half_even(value);
    }
    let factor = 10f64.powi(digits as i32);
    (value * factor).round_ties_even() / factor
}
