pub mod accumulator;
pub mod period;
pub mod unit;

/// Number of decimal places every emitted reading is rounded to.
pub const DECIMALS: usize = 5;

/// Round the value to [`DECIMALS`] places.
///
/// Goes through the decimal representation, so that float artifacts like `0.000555800000000186`
/// come out as `0.00056` rather than the nearest binary neighbour of a scaled value.
#[must_use]
pub fn round(value: f64) -> f64 {
    format!("{value:.DECIMALS$}").parse().unwrap_or(value)
}
