//! Multi-currency types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tessera_shared::Period;

/// A registered currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Symbol, e.g. `$`.
    pub symbol: Option<String>,
    /// Fractional digits for display.
    pub precision: u32,
    /// Inactive currencies reject new rates and postings.
    pub is_active: bool,
}

/// The kind of exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateType {
    /// Transaction-date rate.
    #[default]
    Spot,
    /// Period-end rate used for revaluation.
    Closing,
    /// Period-average rate.
    Average,
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spot => "spot",
            Self::Closing => "closing",
            Self::Average => "average",
        };
        f.write_str(s)
    }
}

/// One exchange-rate observation, unique per (currency, date, type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Currency code.
    pub currency: String,
    /// Observation date.
    pub date: NaiveDate,
    /// Units of functional currency per unit of foreign currency,
    /// six decimal places.
    pub rate: Decimal,
    /// Rate kind.
    pub rate_type: RateType,
    /// Where the rate came from.
    pub source: Option<String>,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// One account's revaluation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RevaluationLine {
    /// The revalued account.
    pub account_code: String,
    /// The foreign currency.
    pub currency: String,
    /// Foreign closing balance (unchanged by revaluation).
    pub foreign_closing: Decimal,
    /// Rate applied.
    pub rate: Decimal,
    /// Functional closing before revaluation.
    pub functional_before: Decimal,
    /// Gain (positive) or loss (negative) posted.
    pub delta: Decimal,
    /// The voucher that carried the adjustment.
    pub voucher_id: i64,
}

/// Result of a period-end revaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct RevaluationResult {
    /// The revalued period.
    pub period: Period,
    /// Rate type used.
    pub rate_type: RateType,
    /// Per-account outcomes; accounts with no adjustment are omitted.
    pub lines: Vec<RevaluationLine>,
}
