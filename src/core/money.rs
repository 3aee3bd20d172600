//! Monetary rounding

/// Round to 2 decimal places, halves away from zero
///
/// The nudge absorbs binary representation error so that e.g. 1.005
/// rounds to 1.01 rather than 1.00.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scaled = value * 100.0;
    let nudged = scaled + 1e-7_f64.copysign(scaled);
    nudged.round() / 100.0
}
