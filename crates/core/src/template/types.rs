//! Template definitions.
//!
//! Closing templates flatten selected accounts into a target account at
//! period close. Voucher templates pair an event schema with entry shapes
//! whose amounts are expressions over the event's fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::AccountType;

/// Selects source accounts by code prefix and/or type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSelector {
    /// Account-code prefixes to match.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Account types to match.
    #[serde(default)]
    pub account_types: Vec<AccountType>,
}

impl SourceSelector {
    /// Returns true if an account matches the selector.
    #[must_use]
    pub fn matches(&self, code: &str, account_type: AccountType) -> bool {
        let by_prefix = self.prefixes.iter().any(|p| code.starts_with(p.as_str()));
        let by_type = self.account_types.contains(&account_type);
        by_prefix || by_type
    }

    /// Returns true if the selector selects nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.account_types.is_empty()
    }
}

/// The declarative rule of a closing template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingRule {
    /// Accounts whose closing balances are flattened.
    pub sources: Vec<SourceSelector>,
    /// Account receiving the net amount.
    pub target_account: String,
    /// Description for the produced voucher; `{period}` is substituted.
    pub description: String,
}

/// A period-close template. Idempotent per period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingTemplate {
    /// Stable code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// The closing rule.
    pub rule: ClosingRule,
    /// Disabled templates are skipped at close and rejected when invoked.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One declared event field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventField {
    /// Field name referenced by entry expressions.
    pub name: String,
    /// Required fields must be present in the event payload.
    #[serde(default)]
    pub required: bool,
}

/// One entry shape of a voucher template.
///
/// `debit` and `credit` are expressions over event fields; a line with
/// neither produces nothing. Dimension slots name the event field whose
/// value is the dimension code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Account posted to.
    pub account: String,
    /// Line memo; `{period}` and `{date}` are substituted.
    #[serde(default)]
    pub description: Option<String>,
    /// Debit amount expression.
    #[serde(default)]
    pub debit: Option<String>,
    /// Credit amount expression.
    #[serde(default)]
    pub credit: Option<String>,
    /// Event field holding the department code.
    #[serde(default)]
    pub department_field: Option<String>,
    /// Event field holding the project code.
    #[serde(default)]
    pub project_field: Option<String>,
    /// Event field holding the customer code.
    #[serde(default)]
    pub customer_field: Option<String>,
    /// Event field holding the supplier code.
    #[serde(default)]
    pub supplier_field: Option<String>,
    /// Event field holding the employee code.
    #[serde(default)]
    pub employee_field: Option<String>,
}

/// The rule of a voucher template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherTemplateRule {
    /// Declared event fields.
    pub fields: Vec<EventField>,
    /// Entry shapes evaluated per event.
    pub entries: Vec<TemplateEntry>,
    /// Header description; `{period}` and `{date}` are substituted.
    #[serde(default)]
    pub description: Option<String>,
}

/// A template turning business events into balanced vouchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherTemplate {
    /// Stable code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// The rule.
    pub rule: VoucherTemplateRule,
    /// Disabled templates reject generation.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Link from a processed event to the voucher it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherEvent {
    /// The event's idempotency key.
    pub event_id: String,
    /// The template that processed it, when template-generated.
    pub template_code: Option<String>,
    /// The produced voucher.
    pub voucher_id: i64,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_by_prefix() {
        let selector = SourceSelector {
            prefixes: vec!["60".into()],
            account_types: vec![],
        };
        assert!(selector.matches("6001", AccountType::Revenue));
        assert!(!selector.matches("1001", AccountType::Asset));
    }

    #[test]
    fn test_selector_by_type() {
        let selector = SourceSelector {
            prefixes: vec![],
            account_types: vec![AccountType::Revenue, AccountType::Expense],
        };
        assert!(selector.matches("6001", AccountType::Revenue));
        assert!(selector.matches("6401", AccountType::Expense));
        assert!(!selector.matches("1001", AccountType::Asset));
    }

    #[test]
    fn test_selector_prefix_or_type() {
        let selector = SourceSelector {
            prefixes: vec!["1403".into()],
            account_types: vec![AccountType::Expense],
        };
        assert!(selector.matches("1403", AccountType::Asset));
        assert!(selector.matches("6602", AccountType::Expense));
        assert!(!selector.matches("1001", AccountType::Asset));
    }
}
