//! Standard chart seeding.
//!
//! Boot-time chart of one-level accounts following the Chinese Ministry of
//! Finance numbering. The engine itself is chart-agnostic; any account set
//! can be loaded as long as codes are unique and parents precede children.

use chrono::Utc;
use once_cell::sync::Lazy;

use super::types::{Account, AccountType, CashFlowCategory, Direction};

/// Seed rows: code, name, type, direction, cash-flow category.
static STANDARD_CHART: Lazy<Vec<(&str, &str, AccountType, Direction, CashFlowCategory)>> =
    Lazy::new(|| {
        use AccountType::{Asset, Equity, Expense, Liability, Revenue};
        use CashFlowCategory::{Financing, Investing, None as NoCf, Operating};
        use Direction::{Credit, Debit};

        vec![
            ("1001", "Cash on hand", Asset, Debit, NoCf),
            ("1002", "Bank deposits", Asset, Debit, NoCf),
            ("1122", "Accounts receivable", Asset, Debit, Operating),
            ("1231", "Bad debt provision", Asset, Credit, Operating),
            ("1403", "Inventory", Asset, Debit, Operating),
            ("1601", "Fixed assets", Asset, Debit, Investing),
            ("1602", "Accumulated depreciation", Asset, Credit, Operating),
            ("1603", "Fixed asset impairment provision", Asset, Credit, Operating),
            ("1604", "Construction in progress", Asset, Debit, Investing),
            ("2001", "Short-term borrowings", Liability, Credit, Financing),
            ("2202", "Accounts payable", Liability, Credit, Operating),
            ("2221", "Taxes payable", Liability, Credit, Operating),
            ("4001", "Paid-in capital", Equity, Credit, Financing),
            ("4101", "Surplus reserve", Equity, Credit, NoCf),
            ("4103", "Current year profit", Equity, Credit, NoCf),
            ("4104", "Retained earnings", Equity, Credit, Financing),
            ("6001", "Operating revenue", Revenue, Credit, NoCf),
            ("6051", "Other income", Revenue, Credit, NoCf),
            ("6061", "Exchange gain or loss", Revenue, Credit, NoCf),
            ("6401", "Cost of sales", Expense, Debit, NoCf),
            ("6601", "Selling expense", Expense, Debit, NoCf),
            ("6602", "Administrative expense", Expense, Debit, NoCf),
            ("6603", "Finance expense", Expense, Debit, NoCf),
            ("6701", "Asset impairment loss", Expense, Debit, NoCf),
            ("6801", "Income tax expense", Expense, Debit, NoCf),
        ]
    });

/// Builds the seeded standard chart.
#[must_use]
pub fn standard_accounts() -> Vec<Account> {
    let now = Utc::now();
    STANDARD_CHART
        .iter()
        .map(|(code, name, account_type, direction, cash_flow)| Account {
            code: (*code).to_string(),
            name: (*name).to_string(),
            level: 1,
            parent_code: None,
            account_type: *account_type,
            direction: *direction,
            cash_flow: *cash_flow,
            is_enabled: true,
            is_system: true,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_chart_codes_unique() {
        let accounts = standard_accounts();
        let mut codes: Vec<&str> = accounts.iter().map(|a| a.code.as_str()).collect();
        codes.sort_unstable();
        let before = codes.len();
        codes.dedup();
        assert_eq!(before, codes.len());
    }

    #[test]
    fn test_standard_chart_directions_match_type() {
        for account in standard_accounts() {
            // Contra accounts run against their type's normal side.
            let contra = matches!(account.code.as_str(), "1231" | "1602" | "1603");
            if contra {
                assert_ne!(account.direction, account.account_type.normal_side());
            }
        }
    }

    #[test]
    fn test_standard_chart_is_system_seeded() {
        assert!(standard_accounts().iter().all(|a| a.is_system && a.is_enabled));
    }
}
