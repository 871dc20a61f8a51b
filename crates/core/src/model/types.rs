//! Driver record and model output.
//!
//! The driver record is the typed contract for model mode: three required
//! fields, the rest defaulting to zero. Unrecognized fields are retained
//! in an extension map and echoed back unchanged so adapters can
//! round-trip their own annotations.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::model::error::ModelError;

/// Driver assumptions for the five-step model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverRecord {
    /// Period revenue.
    #[serde(default)]
    pub revenue: Decimal,
    /// Period cost of sales.
    #[serde(default)]
    pub cost: Decimal,
    /// Cash at the start of the period.
    #[serde(default)]
    pub opening_cash: Decimal,
    /// Other operating expense.
    #[serde(default)]
    pub other_expense: Decimal,
    /// Interest-bearing debt at the start of the period.
    #[serde(default)]
    pub opening_debt: Decimal,
    /// Paid-in capital at the start of the period.
    #[serde(default)]
    pub opening_equity: Decimal,
    /// Retained earnings at the start of the period.
    #[serde(default)]
    pub opening_retained: Decimal,
    /// Receivables at the start of the period.
    #[serde(default)]
    pub opening_receivable: Decimal,
    /// Payables at the start of the period.
    #[serde(default)]
    pub opening_payable: Decimal,
    /// Inventory at the start of the period.
    #[serde(default)]
    pub opening_inventory: Decimal,
    /// Fixed assets at original cost.
    #[serde(default)]
    pub fixed_asset_cost: Decimal,
    /// Depreciation accumulated before the period.
    #[serde(default)]
    pub accum_depreciation: Decimal,
    /// Useful life in years; zero disables depreciation.
    #[serde(default)]
    pub fixed_asset_life: Decimal,
    /// Salvage value.
    #[serde(default)]
    pub fixed_asset_salvage: Decimal,
    /// Annual interest rate on debt.
    #[serde(default)]
    pub interest_rate: Decimal,
    /// Income tax rate.
    #[serde(default)]
    pub tax_rate: Decimal,
    /// Dividend paid.
    #[serde(default)]
    pub dividend: Decimal,
    /// Capital expenditure.
    #[serde(default)]
    pub capex: Decimal,
    /// Minimum cash floor that triggers new borrowing.
    #[serde(default)]
    pub min_cash: Decimal,
    /// New equity raised.
    #[serde(default)]
    pub new_equity: Decimal,
    /// Debt repayment.
    #[serde(default)]
    pub repayment: Decimal,
    /// Increase in receivables over the period.
    #[serde(default)]
    pub delta_receivable: Decimal,
    /// Increase in payables over the period.
    #[serde(default)]
    pub delta_payable: Decimal,
    /// Closing receivables override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_receivable: Option<Decimal>,
    /// Closing payables override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_payable: Option<Decimal>,
    /// Closing inventory override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_inventory: Option<Decimal>,
    /// Unrecognized fields, retained for round-tripping.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fields the driver record requires.
pub const REQUIRED_FIELDS: [&str; 3] = ["revenue", "cost", "opening_cash"];

/// Numeric driver fields addressable by name (scenario sweeps, explain).
pub const DRIVER_FIELDS: [&str; 23] = [
    "revenue",
    "cost",
    "opening_cash",
    "other_expense",
    "opening_debt",
    "opening_equity",
    "opening_retained",
    "opening_receivable",
    "opening_payable",
    "opening_inventory",
    "fixed_asset_cost",
    "accum_depreciation",
    "fixed_asset_life",
    "fixed_asset_salvage",
    "interest_rate",
    "tax_rate",
    "dividend",
    "capex",
    "min_cash",
    "new_equity",
    "repayment",
    "delta_receivable",
    "delta_payable",
];

impl DriverRecord {
    /// Parses a driver record from a JSON object, reporting missing
    /// required fields and non-numeric values as structured errors.
    ///
    /// # Errors
    ///
    /// `INVALID_JSON`, `MISSING_FIELD`, `INVALID_FIELD`.
    pub fn from_json(value: &Value) -> Result<Self, ModelError> {
        let object = value.as_object().ok_or(ModelError::NotAnObject)?;
        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(ModelError::MissingField(field.to_string()));
            }
        }
        for field in DRIVER_FIELDS {
            if let Some(raw) = object.get(field) {
                if parse_decimal(raw).is_none() {
                    return Err(ModelError::InvalidField {
                        field: field.to_string(),
                        message: "must be a number".to_string(),
                    });
                }
            }
        }
        serde_json::from_value(value.clone()).map_err(|e| ModelError::InvalidField {
            field: "input".to_string(),
            message: e.to_string(),
        })
    }

    /// Reads a named driver field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Decimal> {
        match field {
            "revenue" => Some(self.revenue),
            "cost" => Some(self.cost),
            "opening_cash" => Some(self.opening_cash),
            "other_expense" => Some(self.other_expense),
            "opening_debt" => Some(self.opening_debt),
            "opening_equity" => Some(self.opening_equity),
            "opening_retained" => Some(self.opening_retained),
            "opening_receivable" => Some(self.opening_receivable),
            "opening_payable" => Some(self.opening_payable),
            "opening_inventory" => Some(self.opening_inventory),
            "fixed_asset_cost" => Some(self.fixed_asset_cost),
            "accum_depreciation" => Some(self.accum_depreciation),
            "fixed_asset_life" => Some(self.fixed_asset_life),
            "fixed_asset_salvage" => Some(self.fixed_asset_salvage),
            "interest_rate" => Some(self.interest_rate),
            "tax_rate" => Some(self.tax_rate),
            "dividend" => Some(self.dividend),
            "capex" => Some(self.capex),
            "min_cash" => Some(self.min_cash),
            "new_equity" => Some(self.new_equity),
            "repayment" => Some(self.repayment),
            "delta_receivable" => Some(self.delta_receivable),
            "delta_payable" => Some(self.delta_payable),
            _ => None,
        }
    }

    /// Writes a named driver field.
    ///
    /// # Errors
    ///
    /// `UNKNOWN_FIELD` when the name is not a driver field.
    pub fn set(&mut self, field: &str, value: Decimal) -> Result<(), ModelError> {
        let slot = match field {
            "revenue" => &mut self.revenue,
            "cost" => &mut self.cost,
            "opening_cash" => &mut self.opening_cash,
            "other_expense" => &mut self.other_expense,
            "opening_debt" => &mut self.opening_debt,
            "opening_equity" => &mut self.opening_equity,
            "opening_retained" => &mut self.opening_retained,
            "opening_receivable" => &mut self.opening_receivable,
            "opening_payable" => &mut self.opening_payable,
            "opening_inventory" => &mut self.opening_inventory,
            "fixed_asset_cost" => &mut self.fixed_asset_cost,
            "accum_depreciation" => &mut self.accum_depreciation,
            "fixed_asset_life" => &mut self.fixed_asset_life,
            "fixed_asset_salvage" => &mut self.fixed_asset_salvage,
            "interest_rate" => &mut self.interest_rate,
            "tax_rate" => &mut self.tax_rate,
            "dividend" => &mut self.dividend,
            "capex" => &mut self.capex,
            "min_cash" => &mut self.min_cash,
            "new_equity" => &mut self.new_equity,
            "repayment" => &mut self.repayment,
            "delta_receivable" => &mut self.delta_receivable,
            "delta_payable" => &mut self.delta_payable,
            _ => {
                return Err(ModelError::UnknownField {
                    field: field.to_string(),
                    supported: DRIVER_FIELDS.join(", "),
                })
            }
        };
        *slot = value;
        Ok(())
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Everything the model computes, echoing the driver for round-tripping.
#[derive(Debug, Clone, Serialize)]
pub struct ModelOutput {
    /// The driver assumptions, echoed (extension fields included).
    #[serde(flatten)]
    pub driver: DriverRecord,
    /// Identifier of this calculation run.
    pub run_id: Uuid,
    /// Interest charged.
    pub interest: Decimal,
    /// Borrowing drawn to hold the cash floor.
    pub new_borrowing: Decimal,
    /// Debt at period end.
    pub closing_debt: Decimal,
    /// Cash at period end.
    pub closing_cash: Decimal,
    /// Operating cash flow.
    pub operating_cashflow: Decimal,
    /// Investing cash flow.
    pub investing_cashflow: Decimal,
    /// Financing cash flow.
    pub financing_cashflow: Decimal,
    /// Depreciation charged.
    pub depreciation: Decimal,
    /// Accumulated depreciation at period end.
    pub closing_accum_depreciation: Decimal,
    /// Net fixed assets at period end.
    pub closing_fixed_asset_net: Decimal,
    /// Revenue minus cost.
    pub gross_profit: Decimal,
    /// Earnings before interest and tax.
    pub ebit: Decimal,
    /// Earnings before tax.
    pub ebt: Decimal,
    /// Income tax.
    pub tax: Decimal,
    /// Net income.
    pub net_income: Decimal,
    /// Net income minus dividend.
    pub retained_earnings_change: Decimal,
    /// Retained earnings at period end.
    pub closing_retained: Decimal,
    /// Paid-in capital at period end.
    pub closing_equity_capital: Decimal,
    /// Total equity at period end.
    pub closing_total_equity: Decimal,
    /// Receivables at period end (after reconciliation adjustment).
    pub closing_receivable: Decimal,
    /// Payables at period end (after reconciliation adjustment).
    pub closing_payable: Decimal,
    /// Inventory at period end.
    pub closing_inventory: Decimal,
    /// Total assets.
    pub total_assets: Decimal,
    /// Total liabilities.
    pub total_liabilities: Decimal,
    /// Total equity.
    pub total_equity: Decimal,
    /// Assets minus liabilities and equity after adjustment.
    pub balance_diff: Decimal,
    /// Whether the balance sheet ties out within tolerance.
    pub is_balanced: bool,
    /// The single reconciliation adjustment applied, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_adjustment: Option<Decimal>,
    /// Opening cash plus the three cash-flow sections.
    pub cash_flow_check: Decimal,
    /// Whether the cash check matches closing cash within tolerance.
    pub cash_balanced: bool,
    /// Iterations actually run (absent for a single pass).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Whether the iteration converged (absent for a single pass).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_converged: Option<bool>,
    /// Non-fatal diagnostics, e.g. divergence warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ModelOutput {
    /// Reads a named computed or driver field.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<Decimal> {
        match field {
            "interest" => Some(self.interest),
            "new_borrowing" => Some(self.new_borrowing),
            "closing_debt" => Some(self.closing_debt),
            "closing_cash" => Some(self.closing_cash),
            "operating_cashflow" => Some(self.operating_cashflow),
            "investing_cashflow" => Some(self.investing_cashflow),
            "financing_cashflow" => Some(self.financing_cashflow),
            "depreciation" => Some(self.depreciation),
            "closing_accum_depreciation" => Some(self.closing_accum_depreciation),
            "closing_fixed_asset_net" => Some(self.closing_fixed_asset_net),
            "gross_profit" => Some(self.gross_profit),
            "ebit" => Some(self.ebit),
            "ebt" => Some(self.ebt),
            "tax" => Some(self.tax),
            "net_income" => Some(self.net_income),
            "retained_earnings_change" => Some(self.retained_earnings_change),
            "closing_retained" => Some(self.closing_retained),
            "closing_equity_capital" => Some(self.closing_equity_capital),
            "closing_total_equity" => Some(self.closing_total_equity),
            "closing_receivable" => Some(self.closing_receivable),
            "closing_payable" => Some(self.closing_payable),
            "closing_inventory" => Some(self.closing_inventory),
            "total_assets" => Some(self.total_assets),
            "total_liabilities" => Some(self.total_liabilities),
            "total_equity" => Some(self.total_equity),
            "balance_diff" => Some(self.balance_diff),
            "cash_flow_check" => Some(self.cash_flow_check),
            _ => self.driver.get(field),
        }
    }
}

/// Input sanity check result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// `ok`, `warning`, or `error`.
    pub status: &'static str,
    /// Blocking problems.
    pub errors: Vec<String>,
    /// Plausibility warnings.
    pub warnings: Vec<String>,
    /// Number of fields inspected.
    pub checked_fields: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_from_json_requires_fields() {
        let err = DriverRecord::from_json(&json!({"revenue": 100, "cost": 50})).unwrap_err();
        assert_eq!(err, ModelError::MissingField("opening_cash".into()));
    }

    #[test]
    fn test_from_json_rejects_non_numeric() {
        let err = DriverRecord::from_json(&json!({
            "revenue": "lots",
            "cost": 50,
            "opening_cash": 10,
        }))
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidField { .. }));
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let driver = DriverRecord::from_json(&json!({
            "revenue": 100,
            "cost": 50,
            "opening_cash": 10,
            "scenario_label": "base case",
        }))
        .unwrap();
        assert_eq!(
            driver.extra.get("scenario_label"),
            Some(&json!("base case"))
        );
        let echoed = serde_json::to_value(&driver).unwrap();
        assert_eq!(echoed["scenario_label"], json!("base case"));
    }

    #[test]
    fn test_get_set_by_name() {
        let mut driver = DriverRecord::default();
        driver.set("interest_rate", dec!(0.05)).unwrap();
        assert_eq!(driver.get("interest_rate"), Some(dec!(0.05)));
        assert!(driver.set("nonsense", dec!(1)).is_err());
        assert!(driver.get("nonsense").is_none());
    }
}
