//! Account types and posting direction rules.
//!
//! In double-entry bookkeeping:
//! - Debits increase asset/expense accounts, decrease liability/equity/revenue accounts
//! - Credits decrease asset/expense accounts, increase liability/equity/revenue accounts

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owner claims.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// The side on which accounts of this type naturally accumulate.
    #[must_use]
    pub fn normal_side(&self) -> Direction {
        match self {
            Self::Asset | Self::Expense => Direction::Debit,
            Self::Liability | Self::Equity | Self::Revenue => Direction::Credit,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        };
        f.write_str(s)
    }
}

/// The normal side of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Debit-normal.
    Debit,
    /// Credit-normal.
    Credit,
}

impl Direction {
    /// Signed balance change for period activity on an account of this
    /// direction.
    ///
    /// Debit-normal: `debit - credit`; credit-normal: `credit - debit`.
    #[must_use]
    pub fn balance_change(&self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debit => f.write_str("debit"),
            Self::Credit => f.write_str("credit"),
        }
    }
}

/// Cash-flow statement section an account's movement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashFlowCategory {
    /// Working-capital and operating movements.
    Operating,
    /// Capital expenditure and disposals.
    Investing,
    /// Debt and equity movements.
    Financing,
    /// Not a cash-flow driver (cash itself, P&L accounts).
    #[default]
    None,
}

/// An account in the chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable hierarchical code, e.g. `1001`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Depth in the account tree (1 for top-level accounts).
    pub level: i32,
    /// Parent account code, if any.
    pub parent_code: Option<String>,
    /// Classification.
    pub account_type: AccountType,
    /// Normal side.
    pub direction: Direction,
    /// Cash-flow section for statement mapping.
    #[serde(default)]
    pub cash_flow: CashFlowCategory,
    /// Disabled accounts reject new postings but keep history.
    pub is_enabled: bool,
    /// Seeded accounts cannot be deleted.
    pub is_system: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Signed balance change this account experiences for the given
    /// period activity.
    #[must_use]
    pub fn balance_change(&self, debit: Decimal, credit: Decimal) -> Decimal {
        self.direction.balance_change(debit, credit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normal_side() {
        assert_eq!(AccountType::Asset.normal_side(), Direction::Debit);
        assert_eq!(AccountType::Expense.normal_side(), Direction::Debit);
        assert_eq!(AccountType::Liability.normal_side(), Direction::Credit);
        assert_eq!(AccountType::Equity.normal_side(), Direction::Credit);
        assert_eq!(AccountType::Revenue.normal_side(), Direction::Credit);
    }

    #[test]
    fn test_debit_normal_balance_change() {
        let direction = Direction::Debit;
        assert_eq!(direction.balance_change(dec!(100), dec!(0)), dec!(100));
        assert_eq!(direction.balance_change(dec!(0), dec!(50)), dec!(-50));
        assert_eq!(direction.balance_change(dec!(100), dec!(30)), dec!(70));
    }

    #[test]
    fn test_credit_normal_balance_change() {
        let direction = Direction::Credit;
        assert_eq!(direction.balance_change(dec!(0), dec!(100)), dec!(100));
        assert_eq!(direction.balance_change(dec!(50), dec!(0)), dec!(-50));
        assert_eq!(direction.balance_change(dec!(30), dec!(100)), dec!(70));
    }
}
