//! Voucher domain types.
//!
//! A voucher is the atomic unit of posting: a dated, balanced set of debit
//! and credit lines. Vouchers move draft → reviewed → confirmed → voided;
//! confirmed vouchers are immutable and can only be cancelled by a
//! red-letter reversal.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tessera_shared::{money, Period};

use crate::dimension::DimensionRefs;

/// Voucher lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    /// Being drafted; can be modified or deleted.
    Draft,
    /// Reviewed and awaiting confirmation.
    Reviewed,
    /// Posted to the ledger (immutable).
    Confirmed,
    /// Cancelled by a red-letter reversal (immutable, retained).
    Voided,
}

impl VoucherStatus {
    /// Returns true if the voucher can still be modified.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the voucher has affected balances.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Voided)
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Reviewed => "reviewed",
            Self::Confirmed => "confirmed",
            Self::Voided => "voided",
        };
        f.write_str(s)
    }
}

/// Whether a voucher is an ordinary posting or a period-adjustment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Ordinary posting; requires an open period.
    #[default]
    Normal,
    /// Adjustment posting; admitted while a period is in adjustment.
    Adjustment,
}

/// A single posting line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherEntry {
    /// Line number within the voucher, starting at 1.
    pub line_no: u32,
    /// Account posted to.
    pub account_code: String,
    /// Account display name at posting time.
    pub account_name: String,
    /// Optional line memo.
    pub description: Option<String>,
    /// Debit amount in functional currency (>= 0).
    pub debit: Decimal,
    /// Credit amount in functional currency (>= 0).
    pub credit: Decimal,
    /// Foreign currency code when the line is multi-currency.
    pub currency: Option<String>,
    /// Exchange rate applied (1 for functional-currency lines).
    pub fx_rate: Decimal,
    /// Debit amount in the foreign currency.
    pub foreign_debit: Decimal,
    /// Credit amount in the foreign currency.
    pub foreign_credit: Decimal,
    /// Dimension references (sentinel `0` = absent).
    #[serde(default)]
    pub dims: DimensionRefs,
}

/// A voucher with its entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Internal id.
    pub id: i64,
    /// External number `V<YYYYMMDD><seq>`, assigned at first confirmation
    /// and never reused.
    pub voucher_no: Option<String>,
    /// Posting date.
    pub date: NaiveDate,
    /// Period derived from the posting date.
    pub period: Period,
    /// Header description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: VoucherStatus,
    /// Normal or adjustment entry.
    #[serde(default)]
    pub entry_type: EntryKind,
    /// Template that synthesized this voucher, if any.
    pub source_template: Option<String>,
    /// Idempotency key of the originating event, if any.
    pub source_event_id: Option<String>,
    /// Reason recorded when voided.
    pub void_reason: Option<String>,
    /// Back-reference to the voucher this one reverses, if any.
    pub void_of: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Review timestamp.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Confirmation timestamp.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Void timestamp.
    pub voided_at: Option<DateTime<Utc>>,
    /// Posting lines, ordered by line number.
    pub entries: Vec<VoucherEntry>,
}

impl Voucher {
    /// Debit/credit totals of the entries.
    #[must_use]
    pub fn totals(&self) -> VoucherTotals {
        let debit_total: Decimal = self.entries.iter().map(|e| e.debit).sum();
        let credit_total: Decimal = self.entries.iter().map(|e| e.credit).sum();
        VoucherTotals::new(debit_total, credit_total)
    }
}

/// Debit/credit totals with the balance verdict.
#[derive(Debug, Clone, Serialize)]
pub struct VoucherTotals {
    /// Sum of debit amounts.
    pub debit_total: Decimal,
    /// Sum of credit amounts.
    pub credit_total: Decimal,
    /// Whether the totals agree within tolerance.
    pub is_balanced: bool,
}

impl VoucherTotals {
    /// Creates totals from the two sums.
    #[must_use]
    pub fn new(debit_total: Decimal, credit_total: Decimal) -> Self {
        Self {
            debit_total,
            credit_total,
            is_balanced: money::within_tolerance(debit_total, credit_total),
        }
    }

    /// Signed difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit_total - self.credit_total
    }
}

/// Input for one posting line.
///
/// Dimension references arrive as codes and are resolved on submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryDraft {
    /// Account code.
    pub account: String,
    /// Optional line memo.
    #[serde(default)]
    pub description: Option<String>,
    /// Debit amount (functional currency unless `currency` is set).
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount.
    #[serde(default)]
    pub credit: Decimal,
    /// Foreign currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Explicit exchange rate; looked up from the rate table when absent.
    #[serde(default)]
    pub fx_rate: Option<Decimal>,
    /// Foreign-currency debit amount.
    #[serde(default)]
    pub foreign_debit: Option<Decimal>,
    /// Foreign-currency credit amount.
    #[serde(default)]
    pub foreign_credit: Option<Decimal>,
    /// Department dimension code.
    #[serde(default)]
    pub department: Option<String>,
    /// Project dimension code.
    #[serde(default)]
    pub project: Option<String>,
    /// Customer dimension code.
    #[serde(default)]
    pub customer: Option<String>,
    /// Supplier dimension code.
    #[serde(default)]
    pub supplier: Option<String>,
    /// Employee dimension code.
    #[serde(default)]
    pub employee: Option<String>,
}

/// Input for a new voucher.
#[derive(Debug, Clone, Deserialize)]
pub struct VoucherDraft {
    /// Posting date.
    pub date: NaiveDate,
    /// Header description.
    #[serde(default)]
    pub description: Option<String>,
    /// Normal or adjustment entry.
    #[serde(default)]
    pub entry_type: EntryKind,
    /// Idempotency key; resubmissions return the original voucher.
    #[serde(default)]
    pub source_event_id: Option<String>,
    /// Posting lines.
    pub entries: Vec<EntryDraft>,
}

/// Filter for voucher lookup.
#[derive(Debug, Clone, Default)]
pub struct VoucherFilter {
    /// Match a status.
    pub status: Option<VoucherStatus>,
    /// Match an entry kind.
    pub entry_type: Option<EntryKind>,
    /// Match a period.
    pub period: Option<Period>,
    /// Posting date lower bound.
    pub date_from: Option<NaiveDate>,
    /// Posting date upper bound.
    pub date_to: Option<NaiveDate>,
    /// Match vouchers touching an account.
    pub account: Option<String>,
}

/// Link between a voided voucher and its red-letter reversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidLink {
    /// The voucher that was voided.
    pub original_voucher_id: i64,
    /// The reversal voucher.
    pub void_voucher_id: i64,
    /// Why it was voided.
    pub reason: String,
    /// When the link was recorded.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_editable() {
        assert!(VoucherStatus::Draft.is_editable());
        assert!(!VoucherStatus::Reviewed.is_editable());
        assert!(!VoucherStatus::Confirmed.is_editable());
        assert!(!VoucherStatus::Voided.is_editable());
    }

    #[test]
    fn test_status_posted() {
        assert!(!VoucherStatus::Draft.is_posted());
        assert!(!VoucherStatus::Reviewed.is_posted());
        assert!(VoucherStatus::Confirmed.is_posted());
        assert!(VoucherStatus::Voided.is_posted());
    }

    #[test]
    fn test_totals_within_tolerance() {
        let totals = VoucherTotals::new(dec!(100.00), dec!(100.01));
        assert!(totals.is_balanced);
        assert_eq!(totals.difference(), dec!(-0.01));

        let totals = VoucherTotals::new(dec!(100.00), dec!(100.02));
        assert!(!totals.is_balanced);
    }
}
