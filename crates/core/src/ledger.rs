//! The ledger facade.
//!
//! One `Ledger` owns the state for a ledger file's lifetime. Every
//! mutating operation runs against a working copy and replaces the live
//! state only on success, so each top-level operation either commits all
//! of its effects or leaves the ledger unchanged, including multi-voucher
//! operations like close, reopen, and revaluation.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use tessera_shared::{LedgerConfig, Period};

use crate::balance::BalanceEngine;
use crate::chart::{Account, AccountType, CashFlowCategory, Direction};
use crate::dimension::{Dimension, DimensionType};
use crate::error::{LedgerError, LedgerResult};
use crate::fx::{FxService, RateType, RevaluationResult};
use crate::model::{
    diagnose::DiagnoseReport, explain::Explanation, scenario::ScenarioReport, CalcOptions,
    CheckReport, DriverRecord, ModelEngine, ModelOutput,
};
use crate::period::{
    closing::{CloseOutcome, ReopenOutcome},
    PeriodEngine, PeriodStatus,
};
use crate::reports::{ReportMapping, ReportService, StatementReport};
use crate::state::LedgerState;
use crate::subledger::{
    fixed_asset::DepreciationOutcome, inventory::MoveOutcome, receivable::ItemOutcome,
    AgingReport, AssetService, CostingMethod, DepreciationMethod, DisposalOutcome,
    InventoryCount, InventoryService, OpenItemSide, ReceivableService, ReconcileReport,
};
use crate::template::types::{ClosingRule, ClosingTemplate, VoucherTemplateRule};
use crate::template::TemplateEngine;
use crate::voucher::{
    store::{SubmitOutcome, VoidOutcome},
    Voucher, VoucherDraft, VoucherFilter, VoucherStore,
};

/// A ledger: state plus configuration, with atomic operations.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: LedgerState,
    config: LedgerConfig,
}

impl Ledger {
    /// A fresh ledger with the standard chart seeded.
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            state: LedgerState::seeded(),
            config,
        }
    }

    /// Wraps existing state (as loaded from a ledger file).
    #[must_use]
    pub fn from_state(state: LedgerState, config: LedgerConfig) -> Self {
        Self { state, config }
    }

    /// Read access to the state.
    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Consumes the ledger, yielding its state for persistence.
    #[must_use]
    pub fn into_state(self) -> LedgerState {
        self.state
    }

    /// Runs a mutation against a working copy, committing on success.
    fn stage<T>(
        &mut self,
        op: impl FnOnce(&mut LedgerState, &LedgerConfig) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut work = self.state.clone();
        let out = op(&mut work, &self.config)?;
        self.state = work;
        Ok(out)
    }

    // ========== Chart & dimensions ==========

    /// Adds an account. The parent, when given, must exist and share the
    /// type.
    ///
    /// # Errors
    ///
    /// `ACCOUNT_EXISTS`, `ACCOUNT_PARENT_INVALID`.
    pub fn add_account(
        &mut self,
        code: &str,
        name: &str,
        account_type: AccountType,
        direction: Direction,
        cash_flow: CashFlowCategory,
        parent_code: Option<&str>,
    ) -> LedgerResult<()> {
        self.stage(|state, _| {
            if state.accounts.contains_key(code) {
                return Err(LedgerError::AccountExists(code.to_string()));
            }
            let level = match parent_code {
                Some(parent) => {
                    let parent_account = state
                        .accounts
                        .get(parent)
                        .ok_or_else(|| LedgerError::AccountParentInvalid {
                            code: code.to_string(),
                            parent: parent.to_string(),
                        })?;
                    if parent_account.account_type != account_type {
                        return Err(LedgerError::AccountParentInvalid {
                            code: code.to_string(),
                            parent: parent.to_string(),
                        });
                    }
                    parent_account.level + 1
                }
                None => 1,
            };
            state.accounts.insert(
                code.to_string(),
                Account {
                    code: code.to_string(),
                    name: name.to_string(),
                    level,
                    parent_code: parent_code.map(ToString::to_string),
                    account_type,
                    direction,
                    cash_flow,
                    is_enabled: true,
                    is_system: false,
                    created_at: Utc::now(),
                },
            );
            Ok(())
        })
    }

    /// Disables an account. Accounts are never deleted.
    ///
    /// # Errors
    ///
    /// `ACCOUNT_NOT_FOUND`.
    pub fn disable_account(&mut self, code: &str) -> LedgerResult<()> {
        self.stage(|state, _| {
            let account = state
                .accounts
                .get_mut(code)
                .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))?;
            account.is_enabled = false;
            Ok(())
        })
    }

    /// Adds a dimension value.
    ///
    /// # Errors
    ///
    /// `DIMENSION_EXISTS` for duplicate codes within a type.
    pub fn add_dimension(
        &mut self,
        dim_type: DimensionType,
        code: &str,
        name: &str,
    ) -> LedgerResult<i64> {
        self.stage(|state, _| {
            let duplicate = state
                .dimensions
                .values()
                .any(|d| d.dim_type == dim_type && d.code == code);
            if duplicate {
                return Err(LedgerError::DimensionExists {
                    dim_type,
                    code: code.to_string(),
                });
            }
            let id = state.counters.next_dimension();
            state.dimensions.insert(
                id,
                Dimension {
                    id,
                    dim_type,
                    code: code.to_string(),
                    name: name.to_string(),
                    parent_id: None,
                    extra: None,
                    is_enabled: true,
                    created_at: Utc::now(),
                },
            );
            Ok(id)
        })
    }

    // ========== Vouchers ==========

    /// Submits a voucher; `auto` confirms it immediately.
    ///
    /// # Errors
    ///
    /// See [`VoucherStore::submit`].
    pub fn submit(&mut self, draft: &VoucherDraft, auto: bool) -> LedgerResult<SubmitOutcome> {
        self.stage(|state, _| VoucherStore::submit(state, draft, auto))
    }

    /// Reviews a draft voucher.
    ///
    /// # Errors
    ///
    /// See [`VoucherStore::review`].
    pub fn review(&mut self, id: i64) -> LedgerResult<()> {
        self.stage(|state, _| VoucherStore::review(state, id))
    }

    /// Sends a reviewed voucher back to draft.
    ///
    /// # Errors
    ///
    /// See [`VoucherStore::unreview`].
    pub fn unreview(&mut self, id: i64) -> LedgerResult<()> {
        self.stage(|state, _| VoucherStore::unreview(state, id))
    }

    /// Confirms a reviewed voucher and applies balances.
    ///
    /// # Errors
    ///
    /// See [`VoucherStore::confirm`].
    pub fn confirm(&mut self, id: i64) -> LedgerResult<SubmitOutcome> {
        self.stage(|state, _| VoucherStore::confirm(state, id))
    }

    /// Voids a confirmed voucher with a red-letter reversal.
    ///
    /// # Errors
    ///
    /// See [`VoucherStore::void`].
    pub fn void(&mut self, id: i64, reason: &str) -> LedgerResult<VoidOutcome> {
        self.stage(|state, _| VoucherStore::void(state, id, reason, None))
    }

    /// Deletes a draft voucher.
    ///
    /// # Errors
    ///
    /// See [`VoucherStore::delete`].
    pub fn delete(&mut self, id: i64) -> LedgerResult<()> {
        self.stage(|state, _| VoucherStore::delete(state, id))
    }

    /// Looks up vouchers.
    #[must_use]
    pub fn lookup(&self, filter: &VoucherFilter) -> Vec<&Voucher> {
        VoucherStore::lookup(&self.state, filter)
    }

    /// Verifies that replaying all posted vouchers reproduces the balance
    /// index.
    ///
    /// # Errors
    ///
    /// `REBUILD_MISMATCH` on divergence.
    pub fn verify_balances(&self) -> LedgerResult<()> {
        BalanceEngine::verify(&self.state)
    }

    // ========== Periods ==========

    /// Moves a period between open and adjustment.
    ///
    /// # Errors
    ///
    /// See [`PeriodEngine::set_status`].
    pub fn set_period_status(&mut self, period: Period, status: PeriodStatus) -> LedgerResult<()> {
        self.stage(|state, _| PeriodEngine::set_status(state, period, status))
    }

    /// Closes a period: sanity checks, closing templates, rollover.
    ///
    /// # Errors
    ///
    /// See [`PeriodEngine::close`].
    pub fn close_period(&mut self, period: Period) -> LedgerResult<CloseOutcome> {
        self.stage(|state, config| PeriodEngine::close(state, config, period))
    }

    /// Reopens a closed period, reversing its closing vouchers.
    ///
    /// # Errors
    ///
    /// See [`PeriodEngine::reopen`].
    pub fn reopen_period(&mut self, period: Period) -> LedgerResult<ReopenOutcome> {
        self.stage(|state, config| PeriodEngine::reopen(state, config, period))
    }

    // ========== Templates ==========

    /// Registers a closing template.
    ///
    /// # Errors
    ///
    /// `TEMPLATE_EXISTS`, `ACCOUNT_NOT_FOUND` for the target.
    pub fn add_closing_template(
        &mut self,
        code: &str,
        name: &str,
        rule: ClosingRule,
    ) -> LedgerResult<()> {
        self.stage(|state, _| {
            if state.closing_templates.contains_key(code) {
                return Err(LedgerError::TemplateExists(code.to_string()));
            }
            state.account(&rule.target_account)?;
            state.closing_templates.insert(
                code.to_string(),
                ClosingTemplate {
                    code: code.to_string(),
                    name: name.to_string(),
                    rule,
                    is_active: true,
                    created_at: Utc::now(),
                },
            );
            Ok(())
        })
    }

    /// Disables a closing template.
    ///
    /// # Errors
    ///
    /// `TEMPLATE_NOT_FOUND`.
    pub fn disable_closing_template(&mut self, code: &str) -> LedgerResult<()> {
        self.stage(|state, _| {
            state
                .closing_templates
                .get_mut(code)
                .ok_or_else(|| LedgerError::TemplateNotFound(code.to_string()))?
                .is_active = false;
            Ok(())
        })
    }

    /// Registers a voucher template.
    ///
    /// # Errors
    ///
    /// See [`TemplateEngine::add_voucher_template`].
    pub fn add_voucher_template(
        &mut self,
        code: &str,
        name: &str,
        rule: VoucherTemplateRule,
    ) -> LedgerResult<()> {
        self.stage(|state, _| TemplateEngine::add_voucher_template(state, code, name, rule))
    }

    /// Disables a voucher template.
    ///
    /// # Errors
    ///
    /// See [`TemplateEngine::disable_voucher_template`].
    pub fn disable_voucher_template(&mut self, code: &str) -> LedgerResult<()> {
        self.stage(|state, _| TemplateEngine::disable_voucher_template(state, code))
    }

    /// Generates a voucher from a template and an event payload.
    ///
    /// # Errors
    ///
    /// See [`TemplateEngine::generate`].
    pub fn generate_from_template(
        &mut self,
        template_code: &str,
        event: &serde_json::Map<String, serde_json::Value>,
        date: NaiveDate,
    ) -> LedgerResult<SubmitOutcome> {
        self.stage(|state, _| TemplateEngine::generate(state, template_code, event, date))
    }

    // ========== Receivables & payables ==========

    /// Books a receivable or payable item.
    ///
    /// # Errors
    ///
    /// See [`ReceivableService::add_item`].
    pub fn add_open_item(
        &mut self,
        side: OpenItemSide,
        party_code: &str,
        amount: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<ItemOutcome> {
        self.stage(|state, config| {
            ReceivableService::add_item(state, config, side, party_code, amount, date, description)
        })
    }

    /// Settles an open item.
    ///
    /// # Errors
    ///
    /// See [`ReceivableService::settle_item`].
    pub fn settle_open_item(
        &mut self,
        item_id: i64,
        amount: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<ItemOutcome> {
        self.stage(|state, config| {
            ReceivableService::settle_item(state, config, item_id, amount, date, description)
        })
    }

    /// Ages outstanding balances.
    #[must_use]
    pub fn aging(
        &self,
        side: OpenItemSide,
        as_of: NaiveDate,
        party_code: Option<&str>,
    ) -> AgingReport {
        ReceivableService::aging(&self.state, side, as_of, party_code)
    }

    /// Provisions bad debt from aging buckets and configured rates.
    ///
    /// # Errors
    ///
    /// See [`ReceivableService::provision_auto`].
    pub fn provision_bad_debt_auto(
        &mut self,
        period: Period,
        customer_code: Option<&str>,
    ) -> LedgerResult<Option<ItemOutcome>> {
        self.stage(|state, config| {
            ReceivableService::provision_auto(state, config, period, customer_code)
        })
    }

    /// Provisions an explicit bad-debt amount.
    ///
    /// # Errors
    ///
    /// See [`ReceivableService::provision`].
    pub fn provision_bad_debt(
        &mut self,
        period: Period,
        customer_code: Option<&str>,
        amount: Decimal,
    ) -> LedgerResult<ItemOutcome> {
        self.stage(|state, config| {
            ReceivableService::provision(state, config, period, customer_code, amount)
        })
    }

    /// Reverses provisioned bad debt.
    ///
    /// # Errors
    ///
    /// See [`ReceivableService::reverse_provision`].
    pub fn reverse_bad_debt(
        &mut self,
        period: Period,
        customer_code: Option<&str>,
        amount: Decimal,
    ) -> LedgerResult<ItemOutcome> {
        self.stage(|state, config| {
            ReceivableService::reverse_provision(state, config, period, customer_code, amount)
        })
    }

    /// Reconciles a control account against its open items.
    #[must_use]
    pub fn reconcile_open_items(&self, period: Period, side: OpenItemSide) -> ReconcileReport {
        ReceivableService::reconcile(&self.state, &self.config, period, side)
    }

    // ========== Inventory ==========

    /// Registers an inventory item.
    pub fn add_inventory_item(
        &mut self,
        sku: &str,
        name: &str,
        unit: &str,
        method: CostingMethod,
        standard_cost: Option<Decimal>,
    ) {
        InventoryService::add_item(&mut self.state, sku, name, unit, method, standard_cost);
    }

    /// Receives stock.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::receive`].
    pub fn receive_inventory(
        &mut self,
        sku: &str,
        qty: Decimal,
        unit_cost: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<MoveOutcome> {
        self.stage(|state, config| {
            InventoryService::receive(state, config, sku, qty, unit_cost, date, description, None)
        })
    }

    /// Issues stock.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::issue`].
    pub fn issue_inventory(
        &mut self,
        sku: &str,
        qty: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<MoveOutcome> {
        self.stage(|state, config| {
            InventoryService::issue(state, config, sku, qty, date, description)
        })
    }

    /// Registers serial numbers against a receipt movement.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::register_serials`].
    pub fn register_serials(&mut self, move_id: i64, serial_nos: &[String]) -> LedgerResult<usize> {
        self.stage(|state, _| InventoryService::register_serials(state, move_id, serial_nos))
    }

    /// Marks serial numbers issued against an issue movement.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::issue_serials`].
    pub fn issue_serials(&mut self, move_id: i64, serial_nos: &[String]) -> LedgerResult<usize> {
        self.stage(|state, _| InventoryService::issue_serials(state, move_id, serial_nos))
    }

    /// Records a physical count.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::count`].
    pub fn count_inventory(
        &mut self,
        sku: &str,
        counted_qty: Decimal,
        date: NaiveDate,
    ) -> LedgerResult<InventoryCount> {
        self.stage(|state, config| InventoryService::count(state, config, sku, counted_qty, date))
    }

    /// Reconciles the inventory control account.
    #[must_use]
    pub fn reconcile_inventory(&self, period: Period) -> ReconcileReport {
        InventoryService::reconcile(&self.state, &self.config, period)
    }

    // ========== Fixed assets ==========

    /// Registers a fixed asset and posts its acquisition.
    ///
    /// # Errors
    ///
    /// See [`AssetService::add_asset`].
    #[allow(clippy::too_many_arguments)]
    pub fn add_fixed_asset(
        &mut self,
        name: &str,
        cost: Decimal,
        salvage: Decimal,
        life_years: u32,
        method: DepreciationMethod,
        acquired_at: NaiveDate,
    ) -> LedgerResult<i64> {
        self.stage(|state, config| {
            AssetService::add_asset(state, config, name, cost, salvage, life_years, method, acquired_at)
        })
    }

    /// Runs monthly depreciation for a period.
    ///
    /// # Errors
    ///
    /// See [`AssetService::depreciate`].
    pub fn depreciate(&mut self, period: Period) -> LedgerResult<DepreciationOutcome> {
        self.stage(|state, config| AssetService::depreciate(state, config, period))
    }

    /// Recognizes an impairment loss.
    ///
    /// # Errors
    ///
    /// See [`AssetService::impair`].
    pub fn impair_asset(
        &mut self,
        asset_id: i64,
        period: Period,
        amount: Decimal,
    ) -> LedgerResult<i64> {
        self.stage(|state, config| AssetService::impair(state, config, asset_id, period, amount))
    }

    /// Reverses an impairment.
    ///
    /// # Errors
    ///
    /// See [`AssetService::reverse_impairment`].
    pub fn reverse_asset_impairment(
        &mut self,
        asset_id: i64,
        period: Period,
        amount: Decimal,
    ) -> LedgerResult<i64> {
        self.stage(|state, config| {
            AssetService::reverse_impairment(state, config, asset_id, period, amount)
        })
    }

    /// Disposes of a fixed asset.
    ///
    /// # Errors
    ///
    /// See [`AssetService::dispose`].
    pub fn dispose_asset(
        &mut self,
        asset_id: i64,
        date: NaiveDate,
        proceeds: Decimal,
        description: Option<String>,
    ) -> LedgerResult<DisposalOutcome> {
        self.stage(|state, config| {
            AssetService::dispose(state, config, asset_id, date, proceeds, description)
        })
    }

    /// Opens a construction project.
    pub fn add_cip_project(&mut self, name: &str) -> i64 {
        AssetService::add_cip_project(&mut self.state, name)
    }

    /// Accumulates construction cost.
    ///
    /// # Errors
    ///
    /// See [`AssetService::cip_spend`].
    pub fn cip_spend(
        &mut self,
        project_id: i64,
        amount: Decimal,
        date: NaiveDate,
    ) -> LedgerResult<i64> {
        self.stage(|state, config| AssetService::cip_spend(state, config, project_id, amount, date))
    }

    /// Transfers construction cost to a fixed asset.
    ///
    /// # Errors
    ///
    /// See [`AssetService::cip_transfer`].
    pub fn cip_transfer(
        &mut self,
        project_id: i64,
        asset_id: Option<i64>,
        amount: Decimal,
        date: NaiveDate,
        new_asset: Option<(String, Decimal, u32, DepreciationMethod)>,
    ) -> LedgerResult<crate::subledger::CipTransfer> {
        self.stage(|state, config| {
            AssetService::cip_transfer(state, config, project_id, asset_id, amount, date, new_asset)
        })
    }

    // ========== FX ==========

    /// Registers a currency.
    pub fn add_currency(
        &mut self,
        code: &str,
        name: &str,
        symbol: Option<String>,
        precision: u32,
    ) {
        FxService::add_currency(&mut self.state, code, name, symbol, precision);
    }

    /// Records an exchange rate.
    ///
    /// # Errors
    ///
    /// See [`FxService::add_rate`].
    pub fn add_exchange_rate(
        &mut self,
        currency: &str,
        date: NaiveDate,
        rate: Decimal,
        rate_type: RateType,
        source: Option<String>,
    ) -> LedgerResult<()> {
        self.stage(|state, _| FxService::add_rate(state, currency, date, rate, rate_type, source))
    }

    /// Period-end revaluation of the configured accounts; the batch
    /// commits atomically.
    ///
    /// # Errors
    ///
    /// See [`FxService::revalue`].
    pub fn revalue(&mut self, period: Period, rate_type: RateType) -> LedgerResult<RevaluationResult> {
        self.stage(|state, config| FxService::revalue(state, config, period, rate_type))
    }

    // ========== Statements ==========

    /// Generates the three statements for a period (ledger mode).
    ///
    /// # Errors
    ///
    /// See [`ReportService::generate`].
    pub fn statements(
        &self,
        period: Period,
        mapping: Option<&ReportMapping>,
    ) -> LedgerResult<StatementReport> {
        ReportService::generate(&self.state, &self.config, period, mapping)
    }

    /// Derives a model-mode driver record from a period's balances.
    ///
    /// # Errors
    ///
    /// See [`ReportService::build_driver`].
    pub fn driver_from_period(&self, period: Period) -> LedgerResult<DriverRecord> {
        ReportService::build_driver(&self.state, &self.config, period)
    }

    // ========== Model mode ==========

    /// Runs the five-step balancing calculation.
    #[must_use]
    pub fn model_calc(driver: &DriverRecord, options: &CalcOptions) -> ModelOutput {
        ModelEngine::calc(driver, options)
    }

    /// Validates driver plausibility.
    #[must_use]
    pub fn model_check(driver: &DriverRecord) -> CheckReport {
        ModelEngine::check(driver)
    }

    /// Diagnoses a computed output with the delta method.
    #[must_use]
    pub fn model_diagnose(output: &ModelOutput) -> DiagnoseReport {
        crate::model::diagnose(output)
    }

    /// Sweeps one driver field over a list of values.
    ///
    /// # Errors
    ///
    /// See [`crate::model::sweep`].
    pub fn model_scenario(
        driver: &DriverRecord,
        field: &str,
        values: &[Decimal],
        options: &CalcOptions,
    ) -> Result<ScenarioReport, crate::model::ModelError> {
        crate::model::sweep(driver, field, values, options)
    }

    /// Explains a computed field.
    ///
    /// # Errors
    ///
    /// See [`crate::model::explain`].
    pub fn model_explain(
        output: &ModelOutput,
        field: &str,
    ) -> Result<Explanation, crate::model::ModelError> {
        crate::model::explain(output, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voucher::EntryDraft;
    use rust_decimal_macros::dec;

    fn balanced_draft(date: &str) -> VoucherDraft {
        VoucherDraft {
            date: date.parse().unwrap(),
            description: None,
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: "1001".into(),
                    debit: dec!(100),
                    ..Default::default()
                },
                EntryDraft {
                    account: "6001".into(),
                    credit: dec!(100),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_failed_operation_leaves_state_unchanged() {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger.submit(&balanced_draft("2025-01-10"), true).unwrap();
        let vouchers_before = ledger.state().vouchers.len();
        let balances_before = ledger.state().balances.clone();

        // An unbalanced draft is rejected wholesale.
        let mut bad = balanced_draft("2025-01-11");
        bad.entries[0].debit = dec!(999);
        assert!(ledger.submit(&bad, true).is_err());

        assert_eq!(ledger.state().vouchers.len(), vouchers_before);
        assert_eq!(ledger.state().balances.len(), balances_before.len());
    }

    #[test]
    fn test_add_account_with_parent() {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger
            .add_account(
                "100201",
                "Bank - operating",
                AccountType::Asset,
                Direction::Debit,
                CashFlowCategory::None,
                Some("1002"),
            )
            .unwrap();
        assert_eq!(ledger.state().accounts["100201"].level, 2);

        // A parent of a different type is rejected.
        assert!(matches!(
            ledger.add_account(
                "600101",
                "Sub-revenue",
                AccountType::Revenue,
                Direction::Credit,
                CashFlowCategory::None,
                Some("1001"),
            ),
            Err(LedgerError::AccountParentInvalid { .. })
        ));
    }

    #[test]
    fn test_disable_account_rejects_new_postings() {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger.disable_account("6001").unwrap();
        assert!(matches!(
            ledger.submit(&balanced_draft("2025-01-10"), true),
            Err(LedgerError::AccountDisabled(_))
        ));
    }

    #[test]
    fn test_dimension_duplicate_rejected() {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger
            .add_dimension(DimensionType::Department, "D01", "Sales")
            .unwrap();
        assert!(matches!(
            ledger.add_dimension(DimensionType::Department, "D01", "Sales again"),
            Err(LedgerError::DimensionExists { .. })
        ));
        // The same code under another type is fine.
        assert!(ledger
            .add_dimension(DimensionType::Project, "D01", "Project D01")
            .is_ok());
    }

    #[test]
    fn test_verify_balances_clean_ledger() {
        let mut ledger = Ledger::new(LedgerConfig::default());
        ledger.submit(&balanced_draft("2025-01-10"), true).unwrap();
        ledger.submit(&balanced_draft("2025-02-10"), true).unwrap();
        ledger.verify_balances().unwrap();
    }
}
