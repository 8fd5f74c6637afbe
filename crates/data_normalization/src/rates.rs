/// Rates at or below this are read as fractions (`0.0599` means 5.99%).
pub const FRACTION_THRESHOLD: f64 = 1.0;

/// Converts a rate to a percentage with two decimals.
///
/// Spreadsheets often store `5.99%` as the fraction `0.0599`, so anything
/// `<= 1.0` is scaled by 100. A genuine rate below 1% (say `0.75` meaning 0.75%)
/// is therefore read as 75%; there is no way to tell the two apart from the
/// value alone, and callers that know their sheet stores percentages should
/// keep rates above 1.
pub fn normalize_interest_rate(rate: f64) -> f64 {
    let percent = if rate <= FRACTION_THRESHOLD {
        rate * 100.0
    } else {
        rate
    };
    round_cents(percent)
}

/// Rounds to two decimals, halves away from zero (`f64::round`).
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
