//! Fixed-point money and price representation.
//!
//! All escrow accounting uses integer fixed-point with 8 decimal places.
//! This avoids floating point errors in payout and fee arithmetic.

/// Fixed-point value amount with 8 decimal places.
pub type Amount = i128;

/// Conversion factor: 1 unit of value = 100_000_000 sub-units
pub const AMOUNT_SCALE: i128 = 100_000_000;

/// Oracle price, fixed-point with 8 decimal places.
pub type Price = i64;

/// Feed precision: predicted whole-unit prices are scaled by this before
/// comparison against the oracle snapshot.
pub const PRICE_SCALE: i64 = 100_000_000;

/// Convert f64 to fixed-point Amount.
#[inline]
pub fn to_amount(value: f64) -> Amount {
    (value * AMOUNT_SCALE as f64).round() as Amount
}

/// Convert fixed-point Amount to f64.
#[inline]
pub fn from_amount(amount: Amount) -> f64 {
    amount as f64 / AMOUNT_SCALE as f64
}

/// Convert f64 to a fixed-point oracle Price.
#[inline]
pub fn to_price(value: f64) -> Price {
    (value * PRICE_SCALE as f64).round() as Price
}
