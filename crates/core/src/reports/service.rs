//! Statement generation from the balance index.
//!
//! Aggregates balance rows through a declarative mapping into the three
//! statements, then asserts the accounting identity and the cash
//! reconciliation; a breach beyond tolerance fails the report.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{error, info};

use tessera_shared::{money, LedgerConfig, Period};

use crate::balance::{Balance, BalanceEngine};
use crate::error::{LedgerError, LedgerResult};
use crate::model::types::DriverRecord;
use crate::reports::mapping::default_mapping;
use crate::reports::types::{
    LineRule, ReportMapping, ReportValidation, SourceField, StatementReport,
};
use crate::state::LedgerState;

/// Stateless statement engine.
pub struct ReportService;

impl ReportService {
    /// Generates the three statements for a period.
    ///
    /// Uses the default mapping when none is supplied.
    ///
    /// # Errors
    ///
    /// `IDENTITY_VIOLATION` when assets diverge from liabilities plus
    /// equity beyond tolerance; `CASH_NOT_RECONCILED` when the cash-flow
    /// sections do not sum to the cash delta; `REPORT_MAPPING_INVALID` for
    /// malformed rules.
    pub fn generate(
        state: &LedgerState,
        config: &LedgerConfig,
        period: Period,
        mapping: Option<&ReportMapping>,
    ) -> LedgerResult<StatementReport> {
        let default;
        let mapping = match mapping {
            Some(mapping) => mapping,
            None => {
                default = default_mapping(config);
                &default
            }
        };
        let rows = BalanceEngine::effective_rows(state, period);

        let sum = |rule: &LineRule| Self::sum_rule(state, &rows, rule);

        // Balance sheet.
        let total_assets = sum(&mapping.balance_sheet.assets)?;
        let total_liabilities = sum(&mapping.balance_sheet.liabilities)?;
        let equity_base = sum(&mapping.balance_sheet.equity)?;

        // Income statement.
        let revenue = sum(&mapping.income_statement.revenue)?;
        let cost = sum(&mapping.income_statement.cost)?;
        let expense = sum(&mapping.income_statement.expense)?;
        let gross_profit = revenue - cost;
        let net_income = gross_profit - expense;

        // Earnings sit in the P&L accounts until a close flattens them
        // into equity, so equity carries their closing balances: the
        // current period's income plus anything earlier periods never
        // closed out.
        let as_closing = |rule: &LineRule| LineRule {
            source: SourceField::ClosingBalance,
            ..rule.clone()
        };
        let unclosed_earnings = Self::sum_rule(
            state,
            &rows,
            &as_closing(&mapping.income_statement.revenue),
        )? - Self::sum_rule(state, &rows, &as_closing(&mapping.income_statement.cost))?
            - Self::sum_rule(state, &rows, &as_closing(&mapping.income_statement.expense))?;
        let total_equity = equity_base + unclosed_earnings;

        // Cash flow, indirect method.
        let operating_adjustments = sum(&mapping.cash_flow.operating_adjustments)?;
        let investing_cf = sum(&mapping.cash_flow.investing)?;
        let financing_cf = sum(&mapping.cash_flow.financing)?;
        let operating_cf = net_income + operating_adjustments;
        let net_change = operating_cf + investing_cf + financing_cf;

        let cash_delta = sum(&mapping.cash_flow.cash_accounts)?;
        let opening_cash = Self::sum_rule(
            state,
            &rows,
            &LineRule {
                source: SourceField::OpeningBalance,
                ..mapping.cash_flow.cash_accounts.clone()
            },
        )?;
        let closing_cash = opening_cash + cash_delta;

        // Identities; both must hold before the report is released.
        let balance_diff = total_assets - total_liabilities - total_equity;
        if balance_diff.abs() > money::tolerance() {
            error!(
                period = %period,
                %total_assets,
                liabilities_equity = %(total_liabilities + total_equity),
                "accounting identity violated"
            );
            return Err(LedgerError::IdentityViolation {
                period,
                assets: total_assets,
                liabilities_equity: total_liabilities + total_equity,
            });
        }
        let cash_diff = net_change - cash_delta;
        if cash_diff.abs() > money::tolerance() {
            error!(
                period = %period,
                %net_change,
                %cash_delta,
                "cash flow does not reconcile"
            );
            return Err(LedgerError::CashNotReconciled {
                period,
                net_change,
                cash_delta,
            });
        }

        let round = money::round_money;
        let mut balance_sheet = BTreeMap::new();
        for (name, rule) in &mapping.balance_sheet.lines {
            balance_sheet.insert(name.clone(), round(sum(rule)?));
        }
        balance_sheet.insert("total_assets".to_string(), round(total_assets));
        balance_sheet.insert("total_liabilities".to_string(), round(total_liabilities));
        balance_sheet.insert("total_equity".to_string(), round(total_equity));

        let mut income_statement = BTreeMap::new();
        for (name, rule) in &mapping.income_statement.lines {
            income_statement.insert(name.clone(), round(sum(rule)?));
        }
        income_statement.insert("revenue".to_string(), round(revenue));
        income_statement.insert("cost".to_string(), round(cost));
        income_statement.insert("gross_profit".to_string(), round(gross_profit));
        income_statement.insert("net_income".to_string(), round(net_income));

        let mut cash_flow_statement = BTreeMap::new();
        cash_flow_statement.insert("net_income".to_string(), round(net_income));
        cash_flow_statement.insert(
            "operating_adjustments".to_string(),
            round(operating_adjustments),
        );
        cash_flow_statement.insert("operating_cf".to_string(), round(operating_cf));
        cash_flow_statement.insert("investing_cf".to_string(), round(investing_cf));
        cash_flow_statement.insert("financing_cf".to_string(), round(financing_cf));
        cash_flow_statement.insert("net_change".to_string(), round(net_change));
        cash_flow_statement.insert("opening_cash".to_string(), round(opening_cash));
        cash_flow_statement.insert("closing_cash".to_string(), round(closing_cash));

        info!(period = %period, "statements generated");
        Ok(StatementReport {
            period,
            balance_sheet,
            income_statement,
            cash_flow_statement,
            validation: ReportValidation {
                is_balanced: true,
                balance_diff: round(balance_diff),
                cash_reconciled: true,
                cash_diff: round(cash_diff),
            },
        })
    }

    /// Aggregates matching rows for one rule, signing each row by its
    /// account's normal side relative to the rule's sign so contra
    /// accounts net.
    fn sum_rule(
        state: &LedgerState,
        rows: &[Balance],
        rule: &LineRule,
    ) -> LedgerResult<Decimal> {
        if rule.prefixes.is_empty() && rule.account_types.is_empty() {
            return Err(LedgerError::MappingInvalid(
                "line rule selects no accounts (empty prefixes and account_types)".to_string(),
            ));
        }
        let mut total = Decimal::ZERO;
        for row in rows {
            let account = state.account_any(&row.account_code)?;
            let matched = rule
                .prefixes
                .iter()
                .any(|p| row.account_code.starts_with(p.as_str()))
                || rule.account_types.contains(&account.account_type);
            if !matched {
                continue;
            }
            if let Some(filter) = &rule.dims {
                if !filter.matches(&row.dims) {
                    continue;
                }
            }
            let value = match rule.source {
                SourceField::OpeningBalance => row.opening,
                SourceField::ClosingBalance => row.closing,
                SourceField::DebitTotal => row.debit,
                SourceField::CreditTotal => row.credit,
                SourceField::NetChange => row.closing - row.opening,
            };
            total += if account.direction == rule.sign {
                value
            } else {
                -value
            };
        }
        Ok(total)
    }

    /// Derives a model-mode driver record from a period's balances,
    /// bridging ledger mode into the five-step engine.
    ///
    /// # Errors
    ///
    /// Returns an error if a balance row references an unknown account.
    pub fn build_driver(
        state: &LedgerState,
        config: &LedgerConfig,
        period: Period,
    ) -> LedgerResult<DriverRecord> {
        let rows = BalanceEngine::effective_rows(state, period);
        let accounts = &config.accounts;

        let mut revenue = Decimal::ZERO;
        let mut cost = Decimal::ZERO;
        let mut opening_cash = Decimal::ZERO;
        let mut opening_debt = Decimal::ZERO;
        let mut opening_equity = Decimal::ZERO;
        let mut opening_receivable = Decimal::ZERO;
        let mut opening_payable = Decimal::ZERO;
        let mut opening_inventory = Decimal::ZERO;
        let mut closing_receivable = Decimal::ZERO;
        let mut closing_payable = Decimal::ZERO;
        let mut closing_inventory = Decimal::ZERO;
        let mut closing_fixed_net = Decimal::ZERO;

        for row in &rows {
            let account = state.account_any(&row.account_code)?;
            let code = row.account_code.as_str();
            match account.account_type {
                crate::chart::AccountType::Revenue => revenue += row.credit - row.debit,
                crate::chart::AccountType::Expense => cost += row.debit - row.credit,
                crate::chart::AccountType::Liability => opening_debt += row.opening,
                crate::chart::AccountType::Equity => opening_equity += row.opening,
                crate::chart::AccountType::Asset => {}
            }
            if accounts.cash_prefixes.iter().any(|p| code.starts_with(p.as_str())) {
                opening_cash += row.opening;
            }
            if code.starts_with(accounts.receivable.as_str()) {
                opening_receivable += row.opening;
                closing_receivable += row.closing;
            }
            if code.starts_with(accounts.payable.as_str()) {
                opening_payable += row.opening;
                closing_payable += row.closing;
            }
            if code.starts_with(accounts.inventory.as_str()) {
                opening_inventory += row.opening;
                closing_inventory += row.closing;
            }
            if code.starts_with(accounts.fixed_asset.as_str()) {
                closing_fixed_net += row.closing;
            }
        }

        Ok(DriverRecord {
            revenue: money::round_money(revenue),
            cost: money::round_money(cost),
            opening_cash: money::round_money(opening_cash),
            opening_debt: money::round_money(opening_debt),
            opening_equity: money::round_money(opening_equity),
            opening_receivable: money::round_money(opening_receivable),
            opening_payable: money::round_money(opening_payable),
            opening_inventory: money::round_money(opening_inventory),
            delta_receivable: money::round_money(closing_receivable - opening_receivable),
            delta_payable: money::round_money(closing_payable - opening_payable),
            closing_receivable: Some(money::round_money(closing_receivable)),
            closing_payable: Some(money::round_money(closing_payable)),
            closing_inventory: Some(money::round_money(closing_inventory)),
            fixed_asset_cost: money::round_money(closing_fixed_net),
            ..DriverRecord::default()
        })
    }
}
