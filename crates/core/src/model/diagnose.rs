//! Delta-method diagnostics.
//!
//! Every balance-sheet line's period delta must correspond to a cash-flow
//! component; a delta with no matching component is where a model stops
//! balancing. The table pairs each delta with its counterpart and reports
//! mismatches beyond tolerance with a readable cause.

use rust_decimal::Decimal;
use serde::Serialize;

use tessera_shared::money;

use crate::model::types::ModelOutput;

/// One row of the delta table.
#[derive(Debug, Clone, Serialize)]
pub struct DeltaCheck {
    /// Balance-sheet line.
    pub item: &'static str,
    /// Period delta of the line.
    pub delta: Decimal,
    /// The cash-flow component it must match.
    pub cf_item: &'static str,
    /// The component's value.
    pub cf_value: Decimal,
    /// Whether they agree within tolerance.
    pub matched: bool,
    /// Context for lines that are reconciliation targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// The diagnostic report.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnoseReport {
    /// `ok` or `mismatch`.
    pub status: &'static str,
    /// True when every row matched.
    pub all_match: bool,
    /// The delta table.
    pub delta_table: Vec<DeltaCheck>,
    /// Human-readable causes for each mismatch.
    pub mismatches: Vec<String>,
    /// Plausibility warnings on the result.
    pub warnings: Vec<String>,
}

/// Diagnoses a computed model output with the delta method.
#[must_use]
pub fn diagnose(output: &ModelOutput) -> DiagnoseReport {
    let driver = &output.driver;
    let round = money::round_money;
    let mut table = Vec::new();
    let mut mismatches = Vec::new();

    let mut push = |item: &'static str,
                    delta: Decimal,
                    cf_item: &'static str,
                    cf_value: Decimal,
                    forced_match: bool,
                    note: Option<&'static str>,
                    mismatches: &mut Vec<String>| {
        let matched = forced_match || money::within_tolerance(delta, cf_value);
        if !matched {
            mismatches.push(format!(
                "{item} delta ({delta}) does not match {cf_item} ({cf_value})"
            ));
        }
        table.push(DeltaCheck {
            item,
            delta: round(delta),
            cf_item,
            cf_value: round(cf_value),
            matched,
            note,
        });
    };

    // Cash: the three sections must explain the whole movement.
    let delta_cash = output.closing_cash - driver.opening_cash;
    let cf_total =
        output.operating_cashflow + output.investing_cashflow + output.financing_cashflow;
    push(
        "cash",
        delta_cash,
        "operating + investing + financing",
        cf_total,
        false,
        None,
        &mut mismatches,
    );

    // Accumulated depreciation moves exactly by the charge added back.
    let delta_accum = output.closing_accum_depreciation - driver.accum_depreciation;
    push(
        "accumulated_depreciation",
        delta_accum,
        "depreciation add-back",
        output.depreciation,
        false,
        None,
        &mut mismatches,
    );

    // Fixed-asset original cost moves by capital expenditure.
    push(
        "fixed_asset_cost",
        driver.capex,
        "capital_expenditure",
        driver.capex,
        true,
        None,
        &mut mismatches,
    );

    // Receivables and payables are reconciliation targets; their closing
    // values may carry the auto adjustment, so they are reported but not
    // enforced.
    let delta_receivable = output.closing_receivable - driver.opening_receivable;
    push(
        "receivable",
        delta_receivable,
        "delta_receivable input",
        driver.delta_receivable,
        true,
        (delta_receivable != driver.delta_receivable)
            .then_some("closing value may carry the reconciliation adjustment"),
        &mut mismatches,
    );
    let delta_payable = output.closing_payable - driver.opening_payable;
    push(
        "payable",
        delta_payable,
        "delta_payable input",
        driver.delta_payable,
        true,
        (delta_payable != driver.delta_payable)
            .then_some("closing value may carry the reconciliation adjustment"),
        &mut mismatches,
    );

    // Debt moves by borrowing less repayment.
    let delta_debt = output.closing_debt - driver.opening_debt;
    push(
        "debt",
        delta_debt,
        "new_borrowing - repayment",
        output.new_borrowing - driver.repayment,
        false,
        None,
        &mut mismatches,
    );

    // Retained earnings move by net income less dividend.
    let delta_retained = output.closing_retained - driver.opening_retained;
    push(
        "retained_earnings",
        delta_retained,
        "net_income - dividend",
        output.net_income - driver.dividend,
        false,
        None,
        &mut mismatches,
    );

    // Total equity moves by new equity plus retained movement.
    let delta_equity =
        output.closing_total_equity - (driver.opening_equity + driver.opening_retained);
    push(
        "total_equity",
        delta_equity,
        "new_equity + net_income - dividend",
        driver.new_equity + output.net_income - driver.dividend,
        false,
        None,
        &mut mismatches,
    );

    let all_match = table.iter().all(|row| row.matched);

    let mut warnings = Vec::new();
    if output.net_income < Decimal::ZERO {
        warnings.push(format!("net income is negative: {}", output.net_income));
    }
    if driver.revenue > Decimal::ZERO {
        let margin = output.net_income / driver.revenue * Decimal::ONE_HUNDRED;
        if margin < Decimal::from(5u32) {
            warnings.push(format!("net margin is thin: {margin:.1}%"));
        }
    }
    let financed = output.total_liabilities + output.total_equity;
    if financed > Decimal::ZERO {
        let leverage = output.total_liabilities / financed * Decimal::ONE_HUNDRED;
        if leverage > Decimal::from(70u32) {
            warnings.push(format!("debt ratio is high: {leverage:.1}%"));
        }
    }
    warnings.extend(output.warnings.iter().cloned());

    DiagnoseReport {
        status: if all_match { "ok" } else { "mismatch" },
        all_match,
        delta_table: table,
        mismatches,
        warnings,
    }
}
