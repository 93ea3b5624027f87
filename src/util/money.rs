//! Major-unit decimal to minor-unit integer conversion.

/// Convert a major-unit decimal amount (dollars) to integer minor units
/// (cents) by truncation, never rounding: `25.999` becomes `2599`.
///
/// `f64` cannot represent most decimal amounts exactly and the product may
/// land just under the true value (`25.99_f64 * 100.0 == 2598.999…`), so
/// the product is nudged by half a micro-cent before flooring. Negative
/// and non-finite inputs clamp to zero; stored amounts are non-negative.
pub fn to_minor_units(amount: f64) -> i64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    (amount * 100.0 + 5e-7).floor() as i64
}
