//! Ledger error types.
//!
//! Every failure a ledger operation can produce, with a stable error code
//! for the external envelope. Validation and state errors leave the ledger
//! unchanged; consistency errors additionally indicate possible corruption.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use tessera_shared::error::ErrorEnvelope;
use tessera_shared::Period;

use crate::dimension::DimensionType;
use crate::fx::RateType;
use crate::period::PeriodStatus;
use crate::template::ExprError;
use crate::voucher::VoucherStatus;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors produced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Voucher Validation ==========
    /// Debits and credits differ by more than the tolerance.
    #[error("Voucher is not balanced. Debit: {debit}, Credit: {credit}")]
    NotBalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Entry amounts must not be negative.
    #[error("Entry amount cannot be negative on line {line_no}")]
    NegativeAmount {
        /// The offending entry line.
        line_no: u32,
    },

    // ========== Accounts ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account is disabled.
    #[error("Account is disabled: {0}")]
    AccountDisabled(String),

    /// Account code already exists.
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// Parent account missing or of a different type.
    #[error("Parent account invalid for {code}: {parent}")]
    AccountParentInvalid {
        /// The account being added.
        code: String,
        /// The offending parent code.
        parent: String,
    },

    // ========== Dimensions ==========
    /// Dimension value not found or disabled.
    #[error("Dimension not found: {dim_type}:{code}")]
    DimensionNotFound {
        /// The dimension type.
        dim_type: DimensionType,
        /// The code that failed to resolve.
        code: String,
    },

    /// Dimension code already exists within its type.
    #[error("Dimension already exists: {dim_type}:{code}")]
    DimensionExists {
        /// The dimension type.
        dim_type: DimensionType,
        /// The duplicate code.
        code: String,
    },

    // ========== Voucher State ==========
    /// Voucher not found.
    #[error("Voucher not found: {0}")]
    VoucherNotFound(i64),

    /// Operation requires a draft voucher.
    #[error("Voucher {id} is {status}; only draft vouchers can be modified or deleted")]
    VoucherNotDraft {
        /// The voucher id.
        id: i64,
        /// Its current status.
        status: VoucherStatus,
    },

    /// Operation requires a reviewed voucher.
    #[error("Voucher {id} is {status}; it must be reviewed first")]
    VoucherNotReviewed {
        /// The voucher id.
        id: i64,
        /// Its current status.
        status: VoucherStatus,
    },

    /// Only confirmed vouchers can be voided.
    #[error("Voucher {id} is {status}; only confirmed vouchers can be voided")]
    VoidRequiresConfirmed {
        /// The voucher id.
        id: i64,
        /// Its current status.
        status: VoucherStatus,
    },

    // ========== Periods ==========
    /// Period is closed; no postings admitted.
    #[error("Period {0} is closed")]
    PeriodClosed(Period),

    /// Period only admits adjustment vouchers.
    #[error("Period {0} only admits adjustment vouchers")]
    PeriodAdjustmentOnly(Period),

    /// Period is not closed (reopen requires a closed period).
    #[error("Period {0} is not closed")]
    PeriodNotClosed(Period),

    /// Requested period status transition is not allowed.
    #[error("Period {period} cannot move from {from} to {to}")]
    PeriodTransitionInvalid {
        /// The period.
        period: Period,
        /// Current status.
        from: PeriodStatus,
        /// Requested status.
        to: PeriodStatus,
    },

    // ========== Templates ==========
    /// Template not found.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template is disabled.
    #[error("Template is disabled: {0}")]
    TemplateDisabled(String),

    /// Template evaluation produced an unbalanced voucher.
    #[error("Template {code} produced an unbalanced voucher. Debit: {debit}, Credit: {credit}")]
    TemplateUnbalanced {
        /// The template code.
        code: String,
        /// Total debit of the produced voucher.
        debit: Decimal,
        /// Total credit of the produced voucher.
        credit: Decimal,
    },

    /// Template code already exists.
    #[error("Template already exists: {0}")]
    TemplateExists(String),

    /// Template expression failed to parse or evaluate.
    #[error("Template expression error: {0}")]
    TemplateExpr(#[from] ExprError),

    /// Template event is missing a declared field.
    #[error("Template event missing field: {0}")]
    EventFieldMissing(String),

    // ========== Currencies & Rates ==========
    /// Currency not registered.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    /// No exchange rate on or before the date for the rate type.
    #[error("No {rate_type} rate for {currency} on or before {date}")]
    RateNotFound {
        /// The currency code.
        currency: String,
        /// The lookup date.
        date: NaiveDate,
        /// The rate type searched.
        rate_type: RateType,
    },

    // ========== Sub-ledgers ==========
    /// Receivable/payable item not found.
    #[error("Open item not found: {0}")]
    ItemNotFound(i64),

    /// Settlement exceeds the item's outstanding balance.
    #[error("Settlement {amount} exceeds outstanding {outstanding} on item {item_id}")]
    SettleExceedsOutstanding {
        /// The item id.
        item_id: i64,
        /// Requested settlement amount.
        amount: Decimal,
        /// Outstanding balance.
        outstanding: Decimal,
    },

    /// Inventory item not found.
    #[error("Inventory item not found: {0}")]
    SkuNotFound(String),

    /// Issue would drive inventory negative.
    #[error("Issue of {requested} {sku} exceeds on-hand quantity {available}")]
    NegativeInventory {
        /// The SKU.
        sku: String,
        /// Quantity requested.
        requested: Decimal,
        /// Quantity available.
        available: Decimal,
    },

    /// Inventory movement not found.
    #[error("Inventory move not found: {0}")]
    MoveNotFound(i64),

    /// Serial number already registered.
    #[error("Serial number already registered: {0}")]
    SerialExists(String),

    /// Serial number unknown or not in stock.
    #[error("Serial number not available: {0}")]
    SerialNotAvailable(String),

    /// More serial numbers than the movement's quantity.
    #[error("{count} serial numbers exceed move {move_id} quantity {qty}")]
    SerialCountExceedsMove {
        /// The movement.
        move_id: i64,
        /// Serial numbers supplied.
        count: usize,
        /// Movement quantity.
        qty: Decimal,
    },

    /// Fixed asset not found.
    #[error("Fixed asset not found: {0}")]
    AssetNotFound(i64),

    /// Asset already disposed.
    #[error("Fixed asset {0} is already disposed")]
    AssetDisposed(i64),

    /// CIP project not found.
    #[error("Construction project not found: {0}")]
    CipProjectNotFound(i64),

    /// CIP transfer exceeds the accumulated project cost.
    #[error("Transfer {amount} exceeds remaining project cost {remaining} on project {project_id}")]
    CipTransferExceedsCost {
        /// The project id.
        project_id: i64,
        /// Requested transfer amount.
        amount: Decimal,
        /// Remaining accumulated cost.
        remaining: Decimal,
    },

    /// Impairment reversal exceeds recorded impairment.
    #[error("Reversal {amount} exceeds recorded impairment {recorded} on asset {asset_id}")]
    ImpairmentReversalExceeds {
        /// The asset id.
        asset_id: i64,
        /// Requested reversal.
        amount: Decimal,
        /// Impairment recorded so far.
        recorded: Decimal,
    },

    // ========== Reports & Consistency ==========
    /// Statement mapping is malformed.
    #[error("Report mapping invalid: {0}")]
    MappingInvalid(String),

    /// The accounting identity failed beyond tolerance.
    #[error("Accounting identity violated in {period}: assets {assets}, liabilities+equity {liabilities_equity}")]
    IdentityViolation {
        /// The reported period.
        period: Period,
        /// Total assets.
        assets: Decimal,
        /// Total liabilities plus equity.
        liabilities_equity: Decimal,
    },

    /// The cash-flow statement does not reconcile to the cash delta.
    #[error("Cash flow in {period} does not reconcile: net change {net_change}, cash delta {cash_delta}")]
    CashNotReconciled {
        /// The reported period.
        period: Period,
        /// Sum of the three cash-flow sections.
        net_change: Decimal,
        /// Closing cash minus opening cash.
        cash_delta: Decimal,
    },

    /// Replaying vouchers produced a different balance index.
    #[error("Balance rebuild mismatch: {details}")]
    RebuildMismatch {
        /// Human-readable description of the first divergence.
        details: String,
    },
}

impl LedgerError {
    /// Returns the stable error code for the external envelope.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotBalanced { .. } => "NOT_BALANCED",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountDisabled(_) => "ACCOUNT_DISABLED",
            Self::AccountExists(_) => "ACCOUNT_EXISTS",
            Self::AccountParentInvalid { .. } => "ACCOUNT_PARENT_INVALID",
            Self::DimensionNotFound { .. } => "DIMENSION_NOT_FOUND",
            Self::DimensionExists { .. } => "DIMENSION_EXISTS",
            Self::VoucherNotFound(_) => "VOUCHER_NOT_FOUND",
            Self::VoucherNotDraft { .. } => "VOUCHER_NOT_DRAFT",
            Self::VoucherNotReviewed { .. } => "VOUCHER_NOT_REVIEWED",
            Self::VoidRequiresConfirmed { .. } => "VOID_CONFIRMED",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::PeriodAdjustmentOnly(_) => "PERIOD_ADJUSTMENT_ONLY",
            Self::PeriodNotClosed(_) => "PERIOD_NOT_CLOSED",
            Self::PeriodTransitionInvalid { .. } => "PERIOD_TRANSITION_INVALID",
            Self::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Self::TemplateDisabled(_) => "TEMPLATE_DISABLED",
            Self::TemplateUnbalanced { .. } => "TEMPLATE_UNBALANCED",
            Self::TemplateExists(_) => "TEMPLATE_EXISTS",
            Self::TemplateExpr(_) => "TEMPLATE_EXPR_INVALID",
            Self::EventFieldMissing(_) => "EVENT_FIELD_MISSING",
            Self::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            Self::RateNotFound { .. } => "RATE_NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::SettleExceedsOutstanding { .. } => "SETTLE_EXCEEDS_OUTSTANDING",
            Self::SkuNotFound(_) => "SKU_NOT_FOUND",
            Self::NegativeInventory { .. } => "NEGATIVE_INVENTORY",
            Self::MoveNotFound(_) => "MOVE_NOT_FOUND",
            Self::SerialExists(_) => "SERIAL_EXISTS",
            Self::SerialNotAvailable(_) => "SERIAL_NOT_AVAILABLE",
            Self::SerialCountExceedsMove { .. } => "SERIAL_COUNT_EXCEEDS_MOVE",
            Self::AssetNotFound(_) => "ASSET_NOT_FOUND",
            Self::AssetDisposed(_) => "ASSET_DISPOSED",
            Self::CipProjectNotFound(_) => "CIP_PROJECT_NOT_FOUND",
            Self::CipTransferExceedsCost { .. } => "CIP_TRANSFER_EXCEEDS_COST",
            Self::ImpairmentReversalExceeds { .. } => "IMPAIRMENT_REVERSAL_EXCEEDS",
            Self::MappingInvalid(_) => "REPORT_MAPPING_INVALID",
            Self::IdentityViolation { .. } => "IDENTITY_VIOLATION",
            Self::CashNotReconciled { .. } => "CASH_NOT_RECONCILED",
            Self::RebuildMismatch { .. } => "REBUILD_MISMATCH",
        }
    }

    /// Returns true for errors that indicate possible state corruption
    /// rather than bad input.
    #[must_use]
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            Self::IdentityViolation { .. }
                | Self::CashNotReconciled { .. }
                | Self::RebuildMismatch { .. }
        )
    }

    /// Converts the error into the structured envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.error_code(), self.to_string());
        match self {
            Self::NotBalanced { debit, credit } => envelope.with_details(json!({
                "debit_total": debit,
                "credit_total": credit,
                "difference": debit - credit,
            })),
            Self::TemplateUnbalanced { code, debit, credit } => envelope.with_details(json!({
                "template": code,
                "debit_total": debit,
                "credit_total": credit,
                "difference": debit - credit,
            })),
            Self::IdentityViolation {
                period,
                assets,
                liabilities_equity,
            } => envelope.with_details(json!({
                "period": period,
                "total_assets": assets,
                "total_liabilities_equity": liabilities_equity,
                "difference": assets - liabilities_equity,
            })),
            Self::CashNotReconciled {
                period,
                net_change,
                cash_delta,
            } => envelope.with_details(json!({
                "period": period,
                "net_change": net_change,
                "cash_delta": cash_delta,
                "difference": net_change - cash_delta,
            })),
            Self::SettleExceedsOutstanding {
                item_id,
                amount,
                outstanding,
            } => envelope.with_details(json!({
                "item_id": item_id,
                "amount": amount,
                "outstanding": outstanding,
            })),
            Self::NegativeInventory {
                sku,
                requested,
                available,
            } => envelope.with_details(json!({
                "sku": sku,
                "requested": requested,
                "available": available,
            })),
            _ => envelope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::NotBalanced {
                debit: dec!(100),
                credit: dec!(90)
            }
            .error_code(),
            "NOT_BALANCED"
        );
        assert_eq!(
            LedgerError::AccountNotFound("1001".into()).error_code(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            LedgerError::PeriodClosed("2025-01".parse().unwrap()).error_code(),
            "PERIOD_CLOSED"
        );
    }

    #[test]
    fn test_not_balanced_details() {
        let err = LedgerError::NotBalanced {
            debit: dec!(100.00),
            credit: dec!(90.00),
        };
        let envelope = err.to_envelope();
        let details = envelope.details.unwrap();
        assert_eq!(details["difference"], serde_json::json!(dec!(10.00)));
    }

    #[test]
    fn test_consistency_classification() {
        assert!(LedgerError::RebuildMismatch {
            details: "x".into()
        }
        .is_consistency_error());
        assert!(!LedgerError::VoucherNotFound(1).is_consistency_error());
    }
}
