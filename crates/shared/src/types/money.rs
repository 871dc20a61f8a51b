//! Monetary rounding rules.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All monetary values are `rust_decimal::Decimal`, rounded to two fractional
//! digits with half-away-from-zero rounding. Exchange rates carry six digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits carried by monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Fractional digits carried by exchange rates.
pub const RATE_SCALE: u32 = 6;

/// The tolerance inside which two monetary amounts are considered equal.
///
/// Balance checks, accounting identities, and the model-mode convergence
/// loop all compare against this value.
#[must_use]
pub fn tolerance() -> Decimal {
    Decimal::new(1, MONEY_SCALE)
}

/// Rounds a monetary amount to two decimal places, half away from zero.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an exchange rate to six decimal places, half away from zero.
#[must_use]
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true if two amounts differ by no more than the tolerance.
#[must_use]
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= tolerance()
}
