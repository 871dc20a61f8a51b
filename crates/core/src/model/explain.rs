//! Computation tracing.
//!
//! Explains how a named output field was computed: its formula, the input
//! values that fed it, and recursive explanations of each input that is
//! itself computed.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::error::ModelError;
use crate::model::types::ModelOutput;

/// A recursive computation trace for one field.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    /// The explained field.
    pub field: String,
    /// Its value in the output.
    pub value: Decimal,
    /// The formula, in field names.
    pub formula: String,
    /// The formula with values substituted.
    pub calc: String,
    /// Direct input values.
    pub components: BTreeMap<String, Decimal>,
    /// Recursive traces of computed inputs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Explanation>,
}

/// Formula registry: (field, formula, inputs).
const FORMULAS: &[(&str, &str, &[&str])] = &[
    (
        "net_income",
        "net_income = ebt - tax",
        &["ebt", "tax"],
    ),
    (
        "ebt",
        "ebt = ebit - interest",
        &["ebit", "interest"],
    ),
    (
        "ebit",
        "ebit = gross_profit - other_expense - depreciation",
        &["gross_profit", "other_expense", "depreciation"],
    ),
    (
        "gross_profit",
        "gross_profit = revenue - cost",
        &["revenue", "cost"],
    ),
    (
        "tax",
        "tax = max(ebt, 0) * tax_rate",
        &["ebt", "tax_rate"],
    ),
    (
        "interest",
        "interest = interest-bearing debt * interest_rate",
        &["opening_debt", "interest_rate"],
    ),
    (
        "depreciation",
        "depreciation = (fixed_asset_cost - fixed_asset_salvage) / fixed_asset_life",
        &["fixed_asset_cost", "fixed_asset_salvage", "fixed_asset_life"],
    ),
    (
        "closing_cash",
        "closing_cash = opening_cash + operating_cashflow + investing_cashflow + financing_cashflow",
        &[
            "opening_cash",
            "operating_cashflow",
            "investing_cashflow",
            "financing_cashflow",
        ],
    ),
    (
        "closing_debt",
        "closing_debt = opening_debt + new_borrowing - repayment",
        &["opening_debt", "new_borrowing", "repayment"],
    ),
    (
        "closing_retained",
        "closing_retained = opening_retained + net_income - dividend",
        &["opening_retained", "net_income", "dividend"],
    ),
    (
        "closing_total_equity",
        "closing_total_equity = opening_equity + new_equity + closing_retained",
        &["opening_equity", "new_equity", "closing_retained"],
    ),
    (
        "total_assets",
        "total_assets = closing_cash + closing_receivable + closing_inventory + closing_fixed_asset_net",
        &[
            "closing_cash",
            "closing_receivable",
            "closing_inventory",
            "closing_fixed_asset_net",
        ],
    ),
];

fn formula_for(field: &str) -> Option<(&'static str, &'static [&'static str])> {
    FORMULAS
        .iter()
        .find(|(name, _, _)| *name == field)
        .map(|(_, formula, inputs)| (*formula, *inputs))
}

/// Explains a named field of a computed output.
///
/// # Errors
///
/// `UNKNOWN_FIELD` when the field has no registered formula, listing the
/// supported names.
pub fn explain(output: &ModelOutput, field: &str) -> Result<Explanation, ModelError> {
    explain_depth(output, field, 0)
}

fn explain_depth(
    output: &ModelOutput,
    field: &str,
    depth: usize,
) -> Result<Explanation, ModelError> {
    let (formula, input_names) = formula_for(field).ok_or_else(|| ModelError::UnknownField {
        field: field.to_string(),
        supported: FORMULAS
            .iter()
            .map(|(name, _, _)| *name)
            .collect::<Vec<_>>()
            .join(", "),
    })?;
    let value = output.value(field).unwrap_or_default();

    let mut components = BTreeMap::new();
    let mut calc = formula.to_string();
    for name in input_names {
        let input_value = output.value(name).unwrap_or_default();
        components.insert((*name).to_string(), input_value);
        calc = calc.replace(name, &input_value.to_string());
    }
    let calc = format!("{field} = {}", calc.split_once(" = ").map_or("", |(_, rhs)| rhs));

    // The registry is a DAG; the depth guard is a backstop against a
    // future cycle slipping in.
    let mut inputs = Vec::new();
    if depth < 8 {
        for name in input_names {
            if formula_for(name).is_some() && *name != field {
                inputs.push(explain_depth(output, name, depth + 1)?);
            }
        }
    }

    Ok(Explanation {
        field: field.to_string(),
        value,
        formula: formula.to_string(),
        calc,
        components,
        inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::engine::{CalcOptions, ModelEngine};
    use crate::model::types::DriverRecord;
    use rust_decimal_macros::dec;

    fn output() -> ModelOutput {
        let driver = DriverRecord {
            revenue: dec!(20000),
            cost: dec!(12000),
            other_expense: dec!(2000),
            opening_cash: dec!(5000),
            opening_debt: dec!(4000),
            opening_equity: dec!(6000),
            opening_retained: dec!(1000),
            fixed_asset_cost: dec!(10000),
            fixed_asset_life: dec!(5),
            interest_rate: dec!(0.05),
            tax_rate: dec!(0.25),
            ..DriverRecord::default()
        };
        ModelEngine::calc(&driver, &CalcOptions::default())
    }

    #[test]
    fn test_explain_net_income_recurses() {
        let explanation = explain(&output(), "net_income").unwrap();
        assert_eq!(explanation.value, dec!(2850.00));
        assert_eq!(explanation.components["ebt"], dec!(3800));
        assert_eq!(explanation.components["tax"], dec!(950.00));

        // ebt and tax both expand further.
        let ebt = explanation
            .inputs
            .iter()
            .find(|e| e.field == "ebt")
            .unwrap();
        assert!(ebt.inputs.iter().any(|e| e.field == "ebit"));
        let ebit = ebt.inputs.iter().find(|e| e.field == "ebit").unwrap();
        assert!(ebit.inputs.iter().any(|e| e.field == "gross_profit"));
    }

    #[test]
    fn test_explain_substitutes_values() {
        let explanation = explain(&output(), "gross_profit").unwrap();
        assert_eq!(explanation.calc, "gross_profit = 20000 - 12000");
        assert!(explanation.inputs.is_empty());
    }

    #[test]
    fn test_explain_unknown_field_lists_supported() {
        let err = explain(&output(), "ebitda").unwrap_err();
        match err {
            ModelError::UnknownField { field, supported } => {
                assert_eq!(field, "ebitda");
                assert!(supported.contains("net_income"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
