//! Balance row types.
//!
//! A balance row is uniquely keyed by account code, period, and the five
//! dimension ids. Rows are derived state: replaying all confirmed vouchers
//! reproduces them exactly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tessera_shared::Period;

use crate::chart::Direction;
use crate::dimension::DimensionRefs;

/// Unique key of a balance row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    /// Account code.
    pub account_code: String,
    /// Period.
    pub period: Period,
    /// The five dimension ids (`0` = absent).
    pub dims: DimensionRefs,
}

impl BalanceKey {
    /// The same key in a different period.
    #[must_use]
    pub fn in_period(&self, period: Period) -> Self {
        Self {
            account_code: self.account_code.clone(),
            period,
            dims: self.dims,
        }
    }
}

/// One row of the balance index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Account code.
    pub account_code: String,
    /// Period.
    pub period: Period,
    /// Dimension ids.
    #[serde(default)]
    pub dims: DimensionRefs,
    /// Balance carried in from the previous period.
    pub opening: Decimal,
    /// Period debit total.
    pub debit: Decimal,
    /// Period credit total.
    pub credit: Decimal,
    /// `opening` plus signed period activity.
    pub closing: Decimal,
    /// Foreign currency code when the row carries foreign amounts.
    pub currency: Option<String>,
    /// Foreign opening balance.
    pub foreign_opening: Decimal,
    /// Foreign period debit total.
    pub foreign_debit: Decimal,
    /// Foreign period credit total.
    pub foreign_credit: Decimal,
    /// Foreign closing balance.
    pub foreign_closing: Decimal,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// A fresh row with the given opening balances and no activity.
    #[must_use]
    pub fn opening_row(key: BalanceKey, opening: Decimal, foreign_opening: Decimal) -> Self {
        Self {
            account_code: key.account_code,
            period: key.period,
            dims: key.dims,
            opening,
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
            closing: opening,
            currency: None,
            foreign_opening,
            foreign_debit: Decimal::ZERO,
            foreign_credit: Decimal::ZERO,
            foreign_closing: foreign_opening,
            updated_at: Utc::now(),
        }
    }

    /// The row's unique key.
    #[must_use]
    pub fn key(&self) -> BalanceKey {
        BalanceKey {
            account_code: self.account_code.clone(),
            period: self.period,
            dims: self.dims,
        }
    }

    /// Recomputes both closing balances from opening plus activity.
    pub fn recompute_closing(&mut self, direction: Direction) {
        self.closing = self.opening + direction.balance_change(self.debit, self.credit);
        self.foreign_closing =
            self.foreign_opening + direction.balance_change(self.foreign_debit, self.foreign_credit);
    }

    /// Signed net change over the period.
    #[must_use]
    pub fn net_change(&self) -> Decimal {
        self.closing - self.opening
    }

    /// Returns true if the row has no period activity.
    #[must_use]
    pub fn is_pure_rollover(&self) -> bool {
        self.debit.is_zero()
            && self.credit.is_zero()
            && self.foreign_debit.is_zero()
            && self.foreign_credit.is_zero()
    }
}
