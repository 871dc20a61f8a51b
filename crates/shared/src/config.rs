//! Ledger runtime configuration.
//!
//! Account-code mappings, aging bucket rates, sub-ledger policies, and the
//! revaluation account set. Loaded from layered config files plus
//! `TESSERA__`-prefixed environment variables; every field has a default
//! matching the seeded chart, so a bare `LedgerConfig::default()` works for
//! tests and fresh ledgers.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Top-level ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Account codes used by sub-ledger and closing postings.
    #[serde(default)]
    pub accounts: AccountCodes,
    /// Receivable aging and bad-debt provisioning.
    #[serde(default)]
    pub aging: AgingConfig,
    /// Inventory costing policies.
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// Multi-currency revaluation.
    #[serde(default)]
    pub fx: FxConfig,
}

impl LedgerConfig {
    /// Loads configuration from `tessera.*` config files and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config source is present but malformed.
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name("tessera").required(false))
            .add_source(config::Environment::with_prefix("TESSERA").separator("__"))
            .build()?;
        cfg.try_deserialize()
    }
}

/// Account codes the engine posts against.
///
/// Defaults follow the seeded one-level chart; deployments with a custom
/// chart override these.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountCodes {
    /// Cash on hand.
    #[serde(default = "default_cash")]
    pub cash: String,
    /// Bank deposits.
    #[serde(default = "default_bank")]
    pub bank: String,
    /// Prefixes that count as cash and equivalents in reporting.
    #[serde(default = "default_cash_prefixes")]
    pub cash_prefixes: Vec<String>,
    /// Accounts receivable control account.
    #[serde(default = "default_receivable")]
    pub receivable: String,
    /// Bad-debt provision (contra-asset).
    #[serde(default = "default_bad_debt_provision")]
    pub bad_debt_provision: String,
    /// Inventory control account.
    #[serde(default = "default_inventory")]
    pub inventory: String,
    /// Fixed assets at original cost.
    #[serde(default = "default_fixed_asset")]
    pub fixed_asset: String,
    /// Accumulated depreciation (contra-asset).
    #[serde(default = "default_accumulated_depreciation")]
    pub accumulated_depreciation: String,
    /// Fixed-asset impairment provision (contra-asset).
    #[serde(default = "default_impairment_provision")]
    pub impairment_provision: String,
    /// Construction in progress.
    #[serde(default = "default_construction_in_progress")]
    pub construction_in_progress: String,
    /// Short-term borrowings.
    #[serde(default = "default_short_term_debt")]
    pub short_term_debt: String,
    /// Accounts payable control account.
    #[serde(default = "default_payable")]
    pub payable: String,
    /// Paid-in capital.
    #[serde(default = "default_capital")]
    pub capital: String,
    /// Current-year profit (closing target).
    #[serde(default = "default_current_year_profit")]
    pub current_year_profit: String,
    /// Retained earnings.
    #[serde(default = "default_retained_earnings")]
    pub retained_earnings: String,
    /// Operating revenue.
    #[serde(default = "default_revenue")]
    pub revenue: String,
    /// Exchange gain/loss.
    #[serde(default = "default_fx_gain_loss")]
    pub fx_gain_loss: String,
    /// Cost of sales.
    #[serde(default = "default_cost_of_sales")]
    pub cost_of_sales: String,
    /// Administrative expense.
    #[serde(default = "default_admin_expense")]
    pub admin_expense: String,
    /// Finance expense.
    #[serde(default = "default_finance_expense")]
    pub finance_expense: String,
    /// Asset impairment loss.
    #[serde(default = "default_impairment_loss")]
    pub impairment_loss: String,
    /// Gain or loss on asset disposal.
    #[serde(default = "default_disposal_gain_loss")]
    pub disposal_gain_loss: String,
}

impl Default for AccountCodes {
    fn default() -> Self {
        Self {
            cash: default_cash(),
            bank: default_bank(),
            cash_prefixes: default_cash_prefixes(),
            receivable: default_receivable(),
            bad_debt_provision: default_bad_debt_provision(),
            inventory: default_inventory(),
            fixed_asset: default_fixed_asset(),
            accumulated_depreciation: default_accumulated_depreciation(),
            impairment_provision: default_impairment_provision(),
            construction_in_progress: default_construction_in_progress(),
            short_term_debt: default_short_term_debt(),
            payable: default_payable(),
            capital: default_capital(),
            current_year_profit: default_current_year_profit(),
            retained_earnings: default_retained_earnings(),
            revenue: default_revenue(),
            fx_gain_loss: default_fx_gain_loss(),
            cost_of_sales: default_cost_of_sales(),
            admin_expense: default_admin_expense(),
            finance_expense: default_finance_expense(),
            impairment_loss: default_impairment_loss(),
            disposal_gain_loss: default_disposal_gain_loss(),
        }
    }
}

fn default_cash() -> String {
    "1001".to_string()
}
fn default_bank() -> String {
    "1002".to_string()
}
fn default_cash_prefixes() -> Vec<String> {
    vec!["1001".to_string(), "1002".to_string()]
}
fn default_receivable() -> String {
    "1122".to_string()
}
fn default_bad_debt_provision() -> String {
    "1231".to_string()
}
fn default_inventory() -> String {
    "1403".to_string()
}
fn default_fixed_asset() -> String {
    "1601".to_string()
}
fn default_accumulated_depreciation() -> String {
    "1602".to_string()
}
fn default_impairment_provision() -> String {
    "1603".to_string()
}
fn default_construction_in_progress() -> String {
    "1604".to_string()
}
fn default_short_term_debt() -> String {
    "2001".to_string()
}
fn default_payable() -> String {
    "2202".to_string()
}
fn default_capital() -> String {
    "4001".to_string()
}
fn default_current_year_profit() -> String {
    "4103".to_string()
}
fn default_retained_earnings() -> String {
    "4104".to_string()
}
fn default_revenue() -> String {
    "6001".to_string()
}
fn default_fx_gain_loss() -> String {
    "6061".to_string()
}
fn default_cost_of_sales() -> String {
    "6401".to_string()
}
fn default_admin_expense() -> String {
    "6602".to_string()
}
fn default_finance_expense() -> String {
    "6603".to_string()
}
fn default_impairment_loss() -> String {
    "6701".to_string()
}
fn default_disposal_gain_loss() -> String {
    "6051".to_string()
}

/// Receivable aging buckets and per-bucket provision rates.
///
/// Buckets are fixed at 0-30, 31-60, 61-90, and over 90 days past the
/// invoice date; the rates apply to outstanding balances per bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct AgingConfig {
    /// Provision rate per bucket, oldest last.
    #[serde(default = "default_bucket_rates")]
    pub bucket_rates: [Decimal; 4],
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            bucket_rates: default_bucket_rates(),
        }
    }
}

fn default_bucket_rates() -> [Decimal; 4] {
    [
        Decimal::new(5, 2),
        Decimal::new(10, 2),
        Decimal::new(30, 2),
        Decimal::new(50, 2),
    ]
}

/// What happens when an issue would drive inventory negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeInventoryPolicy {
    /// Reject the issue.
    #[default]
    Reject,
    /// Issue at last known cost and correct on the next receipt.
    Allow,
}

/// Inventory costing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    /// Negative-inventory policy.
    #[serde(default)]
    pub negative_policy: NegativeInventoryPolicy,
    /// Account receiving the actual-vs-standard variance under standard
    /// costing.
    #[serde(default = "default_variance_account")]
    pub variance_account: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            negative_policy: NegativeInventoryPolicy::default(),
            variance_account: default_variance_account(),
        }
    }
}

fn default_variance_account() -> String {
    "6602".to_string()
}

/// Period-end revaluation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FxConfig {
    /// Accounts subject to period-end revaluation.
    #[serde(default = "default_revaluable_accounts")]
    pub revaluable_accounts: Vec<String>,
    /// Account receiving revaluation gains and losses.
    #[serde(default = "default_fx_gain_loss")]
    pub gain_loss_account: String,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            revaluable_accounts: default_revaluable_accounts(),
            gain_loss_account: default_fx_gain_loss(),
        }
    }
}

fn default_revaluable_accounts() -> Vec<String> {
    vec!["1002".to_string(), "1122".to_string(), "2202".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_account_codes() {
        let config = LedgerConfig::default();
        assert_eq!(config.accounts.cash, "1001");
        assert_eq!(config.accounts.receivable, "1122");
        assert_eq!(config.accounts.retained_earnings, "4104");
        assert_eq!(config.accounts.cash_prefixes, vec!["1001", "1002"]);
    }

    #[test]
    fn test_default_aging_rates() {
        let config = LedgerConfig::default();
        assert_eq!(config.aging.bucket_rates[0], dec!(0.05));
        assert_eq!(config.aging.bucket_rates[3], dec!(0.50));
    }

    #[test]
    fn test_default_policies() {
        let config = LedgerConfig::default();
        assert_eq!(
            config.inventory.negative_policy,
            NegativeInventoryPolicy::Reject
        );
        assert_eq!(config.fx.gain_loss_account, "6061");
        assert!(config.fx.revaluable_accounts.contains(&"1122".to_string()));
    }
}
