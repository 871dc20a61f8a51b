//! Statement mapping and report types.
//!
//! A report mapping is declarative: each statement line names its account
//! selectors, the balance field it reads, and the sign convention. The
//! engine aggregates matching balance rows and signs each row by its
//! account's normal side relative to the line's sign, so contra accounts
//! net correctly.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tessera_shared::Period;

use crate::chart::{AccountType, Direction};
use crate::dimension::DimensionRefs;

/// Which balance field a line reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceField {
    /// Opening balance.
    OpeningBalance,
    /// Closing balance.
    ClosingBalance,
    /// Period debit total.
    DebitTotal,
    /// Period credit total.
    CreditTotal,
    /// Closing minus opening.
    NetChange,
}

/// Optional dimension filter on a line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionFilter {
    /// Match a department.
    #[serde(default)]
    pub dept_id: Option<i64>,
    /// Match a project.
    #[serde(default)]
    pub project_id: Option<i64>,
    /// Match a customer.
    #[serde(default)]
    pub customer_id: Option<i64>,
    /// Match a supplier.
    #[serde(default)]
    pub supplier_id: Option<i64>,
    /// Match an employee.
    #[serde(default)]
    pub employee_id: Option<i64>,
}

impl DimensionFilter {
    /// Returns true if a row's dimension refs pass the filter.
    #[must_use]
    pub fn matches(&self, dims: &DimensionRefs) -> bool {
        self.dept_id.map_or(true, |id| dims.dept_id == id)
            && self.project_id.map_or(true, |id| dims.project_id == id)
            && self.customer_id.map_or(true, |id| dims.customer_id == id)
            && self.supplier_id.map_or(true, |id| dims.supplier_id == id)
            && self.employee_id.map_or(true, |id| dims.employee_id == id)
    }
}

/// One statement line's aggregation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRule {
    /// Account-code prefixes to match.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Account types to match.
    #[serde(default)]
    pub account_types: Vec<AccountType>,
    /// The balance field read.
    pub source: SourceField,
    /// Sign convention: rows whose account runs on this side add, the
    /// others subtract.
    pub sign: Direction,
    /// Optional dimension filter.
    #[serde(default)]
    pub dims: Option<DimensionFilter>,
}

impl LineRule {
    /// A rule over account types.
    #[must_use]
    pub fn by_types(types: &[AccountType], source: SourceField, sign: Direction) -> Self {
        Self {
            prefixes: Vec::new(),
            account_types: types.to_vec(),
            source,
            sign,
            dims: None,
        }
    }

    /// A rule over code prefixes.
    #[must_use]
    pub fn by_prefixes(prefixes: &[&str], source: SourceField, sign: Direction) -> Self {
        Self {
            prefixes: prefixes.iter().map(ToString::to_string).collect(),
            account_types: Vec::new(),
            source,
            sign,
            dims: None,
        }
    }
}

/// Balance-sheet section of a mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetMapping {
    /// Total assets.
    pub assets: LineRule,
    /// Total liabilities.
    pub liabilities: LineRule,
    /// Equity before current-period income.
    pub equity: LineRule,
    /// Additional display lines.
    #[serde(default)]
    pub lines: BTreeMap<String, LineRule>,
}

/// Income-statement section of a mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementMapping {
    /// Revenue.
    pub revenue: LineRule,
    /// Cost of sales.
    pub cost: LineRule,
    /// Operating and other expenses.
    pub expense: LineRule,
    /// Additional display lines.
    #[serde(default)]
    pub lines: BTreeMap<String, LineRule>,
}

/// Cash-flow section of a mapping (indirect method).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowMapping {
    /// Non-cash and working-capital adjustments added to net income.
    pub operating_adjustments: LineRule,
    /// Investing movements.
    pub investing: LineRule,
    /// Financing movements.
    pub financing: LineRule,
    /// The cash accounts the statement must reconcile to.
    pub cash_accounts: LineRule,
}

/// A complete statement mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMapping {
    /// Balance-sheet rules.
    pub balance_sheet: BalanceSheetMapping,
    /// Income-statement rules.
    pub income_statement: IncomeStatementMapping,
    /// Cash-flow rules.
    pub cash_flow: CashFlowMapping,
}

/// Identity validation attached to every report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportValidation {
    /// `assets = liabilities + equity` held within tolerance.
    pub is_balanced: bool,
    /// Assets minus liabilities and equity.
    pub balance_diff: Decimal,
    /// Cash-flow sections sum to the cash delta within tolerance.
    pub cash_reconciled: bool,
    /// Net cash flow minus the cash delta.
    pub cash_diff: Decimal,
}

/// The three statements for one period.
#[derive(Debug, Clone, Serialize)]
pub struct StatementReport {
    /// The reported period.
    pub period: Period,
    /// Balance-sheet lines.
    pub balance_sheet: BTreeMap<String, Decimal>,
    /// Income-statement lines.
    pub income_statement: BTreeMap<String, Decimal>,
    /// Cash-flow lines.
    pub cash_flow_statement: BTreeMap<String, Decimal>,
    /// Identity validation.
    pub validation: ReportValidation,
}
