//! Shared primitive types used across the engine.

/// Zero-based index into a projection horizon. One period = one month.
/// Period 0 is the launch month.
pub type Period = usize;

/// Whole-number headcount at a funnel stage.
pub type StageCount = u64;

/// An amount in the knowledge base's base currency.
pub type Money = f64;

/// Average weeks in a calendar month.
pub const WEEKS_PER_MONTH: f64 = 52.0 / 12.0;

/// Slack applied before flooring so that values like `139.99999999999997`
/// (an artifact of `1000.0 * 0.14`) still floor to 140.
pub const FLOOR_EPSILON: f64 = 1e-9;

/// Floor a non-negative quantity to a whole count. Negative and
/// non-finite values count as zero.
pub fn floor_count(value: f64) -> StageCount {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value + FLOOR_EPSILON).floor() as StageCount
}

/// Clamp a caller-supplied amount to a finite, non-negative value.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

/// Ceiling of a non-negative quantity, tolerant of representation error
/// in the same way as [`floor_count`]. Stays in `f64` so that amounts
/// priced per unit are never cut short by an integer cast.
pub fn ceil_units(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    (value - FLOOR_EPSILON).ceil().max(0.0)
}
