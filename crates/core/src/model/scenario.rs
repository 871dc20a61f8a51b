//! Scenario sweeps.
//!
//! Re-runs the calculation for each value of a swept driver field. The
//! runs are independent pure computations over cloned drivers, so they
//! fan out across threads.

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::engine::{CalcOptions, ModelEngine};
use crate::model::error::ModelError;
use crate::model::types::DriverRecord;

/// One swept run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRow {
    /// The swept value.
    pub value: Decimal,
    /// Net income at this value.
    pub net_income: Decimal,
    /// Closing cash at this value.
    pub closing_cash: Decimal,
    /// Closing debt at this value.
    pub closing_debt: Decimal,
    /// New borrowing at this value.
    pub new_borrowing: Decimal,
    /// Whether the balance sheet tied out.
    pub is_balanced: bool,
}

/// The sweep result.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// The swept field.
    pub vary_field: String,
    /// One row per value, in input order.
    pub scenarios: Vec<ScenarioRow>,
}

/// Sweeps one driver field over a list of values.
///
/// # Errors
///
/// `UNKNOWN_FIELD` when the field is not a driver field.
pub fn sweep(
    driver: &DriverRecord,
    field: &str,
    values: &[Decimal],
    options: &CalcOptions,
) -> Result<ScenarioReport, ModelError> {
    // Validate the field once before fanning out.
    driver.clone().set(field, values.first().copied().unwrap_or_default())?;

    let scenarios: Vec<ScenarioRow> = values
        .par_iter()
        .map(|value| {
            let mut scenario_driver = driver.clone();
            scenario_driver
                .set(field, *value)
                .expect("field validated before the sweep");
            let output = ModelEngine::calc(&scenario_driver, options);
            ScenarioRow {
                value: *value,
                net_income: output.net_income,
                closing_cash: output.closing_cash,
                closing_debt: output.closing_debt,
                new_borrowing: output.new_borrowing,
                is_balanced: output.is_balanced,
            }
        })
        .collect();

    Ok(ScenarioReport {
        vary_field: field.to_string(),
        scenarios,
    })
}
