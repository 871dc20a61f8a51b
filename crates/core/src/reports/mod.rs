//! Ledger-mode statement derivation.

pub mod mapping;
pub mod service;
pub mod types;

pub use mapping::default_mapping;
pub use service::ReportService;
pub use types::{
    BalanceSheetMapping, CashFlowMapping, DimensionFilter, IncomeStatementMapping, LineRule,
    ReportMapping, ReportValidation, SourceField, StatementReport,
};
