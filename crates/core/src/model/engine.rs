//! The five-step balancing calculation.
//!
//! Financing, depreciation, profit and loss, equity, reconcile. The
//! circular dependency between debt, interest, net income, and cash is a
//! fixed-point iteration: interest runs against opening debt on the first
//! pass and against average debt afterwards, and the loop stops when both
//! interest and new borrowing move less than the tolerance.

use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use tessera_shared::money;

use crate::model::types::{CheckReport, DriverRecord, ModelOutput};

/// Options for a calculation run.
#[derive(Debug, Clone)]
pub struct CalcOptions {
    /// Maximum iterations of the five steps.
    pub iterations: u32,
    /// Convergence tolerance on interest and new borrowing.
    pub tolerance: Decimal,
}

impl Default for CalcOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            tolerance: money::tolerance(),
        }
    }
}

impl CalcOptions {
    /// Options running up to `iterations` passes.
    #[must_use]
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
            ..Self::default()
        }
    }
}

/// Stateless model engine.
pub struct ModelEngine;

impl ModelEngine {
    /// Runs the five-step calculation.
    #[must_use]
    pub fn calc(driver: &DriverRecord, options: &CalcOptions) -> ModelOutput {
        let round = money::round_money;
        let two = Decimal::TWO;

        // Step 2 is independent of the cycle, so depreciation is computed
        // up front and reused by the first-pass tax estimate.
        let depreciation = if driver.fixed_asset_life > Decimal::ZERO {
            round((driver.fixed_asset_cost - driver.fixed_asset_salvage) / driver.fixed_asset_life)
        } else {
            Decimal::ZERO
        };
        let closing_accum_depreciation = round(driver.accum_depreciation + depreciation);
        let closing_fixed_asset_net =
            round(driver.fixed_asset_cost + driver.capex - closing_accum_depreciation);

        let mut interest = round(driver.opening_debt * driver.interest_rate);
        let mut tax_for_cash = round(
            (driver.revenue
                - driver.cost
                - driver.other_expense
                - interest
                - depreciation)
                .max(Decimal::ZERO)
                * driver.tax_rate,
        );

        let mut prev_interest: Option<Decimal> = None;
        let mut prev_borrowing: Option<Decimal> = None;
        let mut prev_closing_debt = driver.opening_debt;
        let mut converged = false;
        let mut iterations_run = 0;

        let mut new_borrowing = Decimal::ZERO;
        let mut closing_debt = driver.opening_debt;
        let mut closing_cash = driver.opening_cash;
        let mut gross_profit = Decimal::ZERO;
        let mut ebit = Decimal::ZERO;
        let mut ebt = Decimal::ZERO;
        let mut tax = Decimal::ZERO;
        let mut net_income = Decimal::ZERO;
        let mut tax_used = tax_for_cash;

        for pass in 1..=options.iterations.max(1) {
            iterations_run = pass;
            if pass > 1 {
                // Average of opening and the previous iterate's closing debt.
                interest = round((driver.opening_debt + prev_closing_debt) / two
                    * driver.interest_rate);
            }
            tax_used = tax_for_cash;

            // Step 1: financing. Cash receipts less cash payments, then a
            // draw up to the minimum-cash floor.
            let cash_before_financing = driver.opening_cash
                + (driver.revenue - driver.delta_receivable)
                - (driver.cost
                    + driver.other_expense
                    + interest
                    + tax_used
                    + driver.capex
                    - driver.delta_payable
                    + driver.repayment);
            new_borrowing = round((driver.min_cash - cash_before_financing).max(Decimal::ZERO));
            closing_debt = round(driver.opening_debt + new_borrowing - driver.repayment);
            closing_cash = round(cash_before_financing + new_borrowing);

            // Step 3: profit and loss.
            gross_profit = round(driver.revenue - driver.cost);
            ebit = round(gross_profit - driver.other_expense - depreciation);
            ebt = round(ebit - interest);
            tax = round(ebt.max(Decimal::ZERO) * driver.tax_rate);
            net_income = round(ebt - tax);

            if let (Some(pi), Some(pb)) = (prev_interest, prev_borrowing) {
                if (interest - pi).abs() < options.tolerance
                    && (new_borrowing - pb).abs() < options.tolerance
                {
                    converged = true;
                    break;
                }
            }
            prev_interest = Some(interest);
            prev_borrowing = Some(new_borrowing);
            prev_closing_debt = closing_debt;
            tax_for_cash = tax;
        }

        // Step 4: equity.
        let retained_earnings_change = round(net_income - driver.dividend);
        let closing_retained = round(driver.opening_retained + retained_earnings_change);
        let closing_equity_capital = round(driver.opening_equity + driver.new_equity);
        let closing_total_equity = round(closing_equity_capital + closing_retained);

        // Cash-flow sections, with the tax that actually left cash.
        let operating_cashflow = round(
            driver.revenue - driver.cost - driver.other_expense - tax_used
                - driver.delta_receivable
                + driver.delta_payable,
        );
        let investing_cashflow = round(-driver.capex);
        let financing_cashflow =
            round(new_borrowing - driver.repayment - interest);

        // Step 5: reconcile.
        let mut closing_receivable = driver
            .closing_receivable
            .unwrap_or(driver.opening_receivable + driver.delta_receivable);
        let mut closing_payable = driver
            .closing_payable
            .unwrap_or(driver.opening_payable + driver.delta_payable);
        let closing_inventory = driver.closing_inventory.unwrap_or(driver.opening_inventory);

        let assets = |receivable: Decimal| {
            closing_cash + receivable + closing_inventory + closing_fixed_asset_net
        };
        let mut total_assets = assets(closing_receivable);
        let mut total_liabilities = closing_debt + closing_payable;
        let total_equity = closing_total_equity;

        let mut balance_diff = round(total_assets - total_liabilities - total_equity);
        let mut auto_adjustment = None;
        if balance_diff.abs() >= money::tolerance() {
            // One reconciliation entry: surplus assets raise payables,
            // missing assets raise receivables.
            let adjustment = round(balance_diff.abs());
            if balance_diff > Decimal::ZERO {
                closing_payable = round(closing_payable + adjustment);
            } else {
                closing_receivable = round(closing_receivable + adjustment);
            }
            auto_adjustment = Some(adjustment);
            total_assets = assets(closing_receivable);
            total_liabilities = closing_debt + closing_payable;
            balance_diff = round(total_assets - total_liabilities - total_equity);
        }
        let is_balanced = balance_diff.abs() < money::tolerance();

        let cash_flow_check = round(
            driver.opening_cash + operating_cashflow + investing_cashflow + financing_cashflow,
        );
        let cash_balanced = (cash_flow_check - closing_cash).abs() < money::tolerance();

        let mut warnings = Vec::new();
        let iterated = options.iterations > 1;
        if iterated && !converged {
            warn!(
                iterations = iterations_run,
                interest = %interest,
                new_borrowing = %new_borrowing,
                "iteration budget exhausted without convergence"
            );
            warnings.push(format!(
                "ITERATION_DIVERGED: no fixed point after {iterations_run} iterations \
                 (interest {interest}, new borrowing {new_borrowing})"
            ));
        }

        ModelOutput {
            driver: driver.clone(),
            run_id: Uuid::new_v4(),
            interest,
            new_borrowing,
            closing_debt,
            closing_cash,
            operating_cashflow,
            investing_cashflow,
            financing_cashflow,
            depreciation,
            closing_accum_depreciation,
            closing_fixed_asset_net,
            gross_profit,
            ebit,
            ebt,
            tax,
            net_income,
            retained_earnings_change,
            closing_retained,
            closing_equity_capital,
            closing_total_equity,
            closing_receivable: round(closing_receivable),
            closing_payable: round(closing_payable),
            closing_inventory: round(closing_inventory),
            total_assets: round(total_assets),
            total_liabilities: round(total_liabilities),
            total_equity: round(total_equity),
            balance_diff,
            is_balanced,
            auto_adjustment,
            cash_flow_check,
            cash_balanced,
            iterations: iterated.then_some(iterations_run),
            iteration_converged: iterated.then_some(converged),
            warnings,
        }
    }

    /// Validates driver plausibility without computing.
    #[must_use]
    pub fn check(driver: &DriverRecord) -> CheckReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if driver.interest_rate < Decimal::ZERO {
            errors.push(format!(
                "interest_rate ({}) cannot be negative",
                driver.interest_rate
            ));
        }
        if driver.tax_rate < Decimal::ZERO {
            errors.push(format!("tax_rate ({}) cannot be negative", driver.tax_rate));
        }
        if driver.fixed_asset_life < Decimal::ZERO {
            errors.push(format!(
                "fixed_asset_life ({}) cannot be negative",
                driver.fixed_asset_life
            ));
        }

        if driver.cost > driver.revenue * Decimal::new(15, 1) {
            warnings.push(format!(
                "cost ({}) far exceeds revenue ({}); please verify",
                driver.cost, driver.revenue
            ));
        }
        if driver.interest_rate > Decimal::new(3, 1) {
            warnings.push(format!(
                "interest_rate ({}) is unusually high; typical rates run 3%-15%",
                driver.interest_rate
            ));
        }
        if driver.tax_rate > Decimal::new(5, 1) {
            warnings.push(format!("tax_rate ({}) is unusually high", driver.tax_rate));
        }
        if driver.opening_cash < Decimal::ZERO {
            warnings.push(format!(
                "opening_cash ({}) is negative; please verify",
                driver.opening_cash
            ));
        }
        let total_equity = driver.opening_equity + driver.opening_retained;
        if total_equity > Decimal::ZERO {
            let leverage = driver.opening_debt / (driver.opening_debt + total_equity);
            if leverage > Decimal::new(8, 1) {
                warnings.push(format!(
                    "debt ratio ({:.1}%) exceeds 80%",
                    leverage * Decimal::ONE_HUNDRED
                ));
            }
        }

        let status = if !errors.is_empty() {
            "error"
        } else if !warnings.is_empty() {
            "warning"
        } else {
            "ok"
        };
        CheckReport {
            status,
            errors,
            warnings,
            checked_fields: crate::model::types::DRIVER_FIELDS.len(),
        }
    }
}
