//! Default statement mapping for the seeded chart.

use std::collections::BTreeMap;

use tessera_shared::LedgerConfig;

use crate::chart::{AccountType, Direction};
use crate::reports::types::{
    BalanceSheetMapping, CashFlowMapping, IncomeStatementMapping, LineRule, ReportMapping,
    SourceField,
};

/// Builds the default mapping over the seeded one-level chart.
///
/// Every non-cash balance-sheet account belongs to exactly one cash-flow
/// section, which is what makes the indirect method reconcile to the cash
/// delta by construction.
#[must_use]
pub fn default_mapping(config: &LedgerConfig) -> ReportMapping {
    let cash_prefixes: Vec<&str> = config
        .accounts
        .cash_prefixes
        .iter()
        .map(String::as_str)
        .collect();

    let mut balance_sheet_lines = BTreeMap::new();
    balance_sheet_lines.insert(
        "cash_and_equivalents".to_string(),
        LineRule::by_prefixes(&cash_prefixes, SourceField::ClosingBalance, Direction::Debit),
    );
    balance_sheet_lines.insert(
        "receivables_net".to_string(),
        LineRule::by_prefixes(&["1122", "1231"], SourceField::ClosingBalance, Direction::Debit),
    );
    balance_sheet_lines.insert(
        "inventory".to_string(),
        LineRule::by_prefixes(&["1403"], SourceField::ClosingBalance, Direction::Debit),
    );
    balance_sheet_lines.insert(
        "fixed_assets_net".to_string(),
        LineRule::by_prefixes(
            &["1601", "1602", "1603", "1604"],
            SourceField::ClosingBalance,
            Direction::Debit,
        ),
    );
    balance_sheet_lines.insert(
        "short_term_borrowings".to_string(),
        LineRule::by_prefixes(&["2001"], SourceField::ClosingBalance, Direction::Credit),
    );
    balance_sheet_lines.insert(
        "accounts_payable".to_string(),
        LineRule::by_prefixes(&["2202"], SourceField::ClosingBalance, Direction::Credit),
    );
    balance_sheet_lines.insert(
        "taxes_payable".to_string(),
        LineRule::by_prefixes(&["2221"], SourceField::ClosingBalance, Direction::Credit),
    );
    balance_sheet_lines.insert(
        "paid_in_capital".to_string(),
        LineRule::by_prefixes(&["4001"], SourceField::ClosingBalance, Direction::Credit),
    );
    balance_sheet_lines.insert(
        "retained_earnings".to_string(),
        LineRule::by_prefixes(
            &["4101", "4103", "4104"],
            SourceField::ClosingBalance,
            Direction::Credit,
        ),
    );

    let mut income_lines = BTreeMap::new();
    income_lines.insert(
        "operating_expenses".to_string(),
        LineRule::by_prefixes(&["66"], SourceField::NetChange, Direction::Debit),
    );
    income_lines.insert(
        "impairment_loss".to_string(),
        LineRule::by_prefixes(&["6701"], SourceField::NetChange, Direction::Debit),
    );
    income_lines.insert(
        "income_tax".to_string(),
        LineRule::by_prefixes(&["6801"], SourceField::NetChange, Direction::Debit),
    );

    ReportMapping {
        balance_sheet: BalanceSheetMapping {
            assets: LineRule::by_types(
                &[AccountType::Asset],
                SourceField::ClosingBalance,
                Direction::Debit,
            ),
            liabilities: LineRule::by_types(
                &[AccountType::Liability],
                SourceField::ClosingBalance,
                Direction::Credit,
            ),
            equity: LineRule::by_types(
                &[AccountType::Equity],
                SourceField::ClosingBalance,
                Direction::Credit,
            ),
            lines: balance_sheet_lines,
        },
        income_statement: IncomeStatementMapping {
            revenue: LineRule::by_types(
                &[AccountType::Revenue],
                SourceField::NetChange,
                Direction::Credit,
            ),
            cost: LineRule::by_prefixes(&["64"], SourceField::NetChange, Direction::Debit),
            expense: LineRule::by_prefixes(&["66", "67", "68"], SourceField::NetChange, Direction::Debit),
            lines: income_lines,
        },
        cash_flow: CashFlowMapping {
            operating_adjustments: LineRule::by_prefixes(
                &["1122", "1231", "1403", "1602", "1603", "2202", "2221"],
                SourceField::NetChange,
                Direction::Credit,
            ),
            investing: LineRule::by_prefixes(
                &["1601", "1604"],
                SourceField::NetChange,
                Direction::Credit,
            ),
            financing: LineRule::by_prefixes(
                &["2001", "4001", "4101", "4103", "4104"],
                SourceField::NetChange,
                Direction::Credit,
            ),
            cash_accounts: LineRule::by_prefixes(
                &cash_prefixes,
                SourceField::NetChange,
                Direction::Debit,
            ),
        },
    }
}
