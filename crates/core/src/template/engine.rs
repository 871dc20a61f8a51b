//! Voucher template engine.
//!
//! Turns a business event (a flat map of fields) into a balanced voucher by
//! evaluating the template's entry expressions over the event. Processed
//! events are recorded by id; replaying an event returns the original
//! voucher.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use tessera_shared::{money, Period};

use crate::dimension::DimensionType;
use crate::error::{LedgerError, LedgerResult};
use crate::state::LedgerState;
use crate::template::expr::Expr;
use crate::template::types::{VoucherEvent, VoucherTemplate, VoucherTemplateRule};
use crate::voucher::{EntryDraft, SubmitOutcome, VoucherDraft, VoucherStore};

/// Stateless template engine.
pub struct TemplateEngine;

impl TemplateEngine {
    /// Registers a voucher template.
    ///
    /// # Errors
    ///
    /// `TEMPLATE_EXISTS` for duplicate codes; expression errors when an
    /// entry amount fails to parse.
    pub fn add_voucher_template(
        state: &mut LedgerState,
        code: &str,
        name: &str,
        rule: VoucherTemplateRule,
    ) -> LedgerResult<()> {
        if state.voucher_templates.contains_key(code) {
            return Err(LedgerError::TemplateExists(code.to_string()));
        }
        // Expressions are validated up front so a bad template is rejected
        // before it can ever fire.
        for entry in &rule.entries {
            if let Some(debit) = &entry.debit {
                Expr::parse(debit)?;
            }
            if let Some(credit) = &entry.credit {
                Expr::parse(credit)?;
            }
        }
        state.voucher_templates.insert(
            code.to_string(),
            VoucherTemplate {
                code: code.to_string(),
                name: name.to_string(),
                rule,
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Disables a voucher template.
    ///
    /// # Errors
    ///
    /// `TEMPLATE_NOT_FOUND` when absent.
    pub fn disable_voucher_template(state: &mut LedgerState, code: &str) -> LedgerResult<()> {
        let template = state
            .voucher_templates
            .get_mut(code)
            .ok_or_else(|| LedgerError::TemplateNotFound(code.to_string()))?;
        template.is_active = false;
        Ok(())
    }

    /// Generates and confirms a voucher from a template and an event.
    ///
    /// The event is a flat JSON object; numeric fields feed the expression
    /// environment, string fields can carry dimension codes, and an
    /// optional `event_id` makes generation idempotent.
    ///
    /// # Errors
    ///
    /// `TEMPLATE_NOT_FOUND`, `TEMPLATE_DISABLED`, `EVENT_FIELD_MISSING`,
    /// `TEMPLATE_UNBALANCED`, expression errors, and voucher admission
    /// errors.
    pub fn generate(
        state: &mut LedgerState,
        template_code: &str,
        event: &serde_json::Map<String, Value>,
        date: NaiveDate,
    ) -> LedgerResult<SubmitOutcome> {
        let template = state
            .voucher_templates
            .get(template_code)
            .ok_or_else(|| LedgerError::TemplateNotFound(template_code.to_string()))?
            .clone();
        if !template.is_active {
            return Err(LedgerError::TemplateDisabled(template_code.to_string()));
        }

        let event_id = event
            .get("event_id")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        // Replayed events return the voucher they already produced.
        if let Some(event_id) = &event_id {
            if let Some(seen) = state.voucher_events.get(event_id) {
                let voucher = state.voucher(seen.voucher_id)?;
                return Ok(SubmitOutcome {
                    voucher_id: voucher.id,
                    voucher_no: voucher.voucher_no.clone(),
                    status: voucher.status,
                    totals: voucher.totals(),
                    balances_updated: 0,
                    existing: true,
                });
            }
        }

        let env = Self::event_env(&template.rule, event)?;
        let period = Period::from_date(date);
        let substitute = |text: &str| {
            text.replace("{period}", &period.to_string())
                .replace("{date}", &date.to_string())
        };

        let mut entries = Vec::new();
        for shape in &template.rule.entries {
            let debit = match &shape.debit {
                Some(expression) => money::round_money(Expr::parse(expression)?.eval(&env)?),
                None => Decimal::ZERO,
            };
            let credit = match &shape.credit {
                Some(expression) => money::round_money(Expr::parse(expression)?.eval(&env)?),
                None => Decimal::ZERO,
            };
            if debit.is_zero() && credit.is_zero() {
                continue;
            }

            let dimension_code = |field: &Option<String>| -> Option<String> {
                field
                    .as_ref()
                    .and_then(|name| event.get(name))
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
            };

            entries.push(EntryDraft {
                account: shape.account.clone(),
                description: shape.description.as_deref().map(substitute),
                debit,
                credit,
                department: dimension_code(&shape.department_field),
                project: dimension_code(&shape.project_field),
                customer: dimension_code(&shape.customer_field),
                supplier: dimension_code(&shape.supplier_field),
                employee: dimension_code(&shape.employee_field),
                ..Default::default()
            });
        }

        let debit_total: Decimal = entries.iter().map(|e| e.debit).sum();
        let credit_total: Decimal = entries.iter().map(|e| e.credit).sum();
        if !money::within_tolerance(debit_total, credit_total) {
            return Err(LedgerError::TemplateUnbalanced {
                code: template_code.to_string(),
                debit: debit_total,
                credit: credit_total,
            });
        }

        let draft = VoucherDraft {
            date,
            description: template
                .rule
                .description
                .as_deref()
                .map(substitute)
                .or_else(|| Some(template.name.clone())),
            entry_type: Default::default(),
            source_event_id: event_id.clone(),
            entries,
        };
        let outcome = VoucherStore::submit(state, &draft, true)?;
        state.voucher_mut(outcome.voucher_id)?.source_template = Some(template_code.to_string());
        if let Some(event_id) = &event_id {
            if let Some(link) = state.voucher_events.get_mut(event_id) {
                link.template_code = Some(template_code.to_string());
            } else {
                state.voucher_events.insert(
                    event_id.clone(),
                    VoucherEvent {
                        event_id: event_id.clone(),
                        template_code: Some(template_code.to_string()),
                        voucher_id: outcome.voucher_id,
                        created_at: Utc::now(),
                    },
                );
            }
        }

        info!(
            template = template_code,
            voucher_id = outcome.voucher_id,
            "voucher generated from template"
        );
        Ok(outcome)
    }

    /// Builds the expression environment from the event's numeric fields,
    /// checking declared required fields.
    fn event_env(
        rule: &VoucherTemplateRule,
        event: &serde_json::Map<String, Value>,
    ) -> LedgerResult<BTreeMap<String, Decimal>> {
        for field in &rule.fields {
            if field.required && !event.contains_key(&field.name) {
                return Err(LedgerError::EventFieldMissing(field.name.clone()));
            }
        }
        let mut env = BTreeMap::new();
        for (key, value) in event {
            let number = match value {
                Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
                Value::String(s) => s.parse::<Decimal>().ok(),
                Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
                _ => None,
            };
            if let Some(number) = number {
                env.insert(key.clone(), number);
            }
        }
        Ok(env)
    }

    /// Lists dimension codes referenced by a template entry; used by
    /// callers that validate templates against the dimension registry.
    #[must_use]
    pub fn dimension_fields(rule: &VoucherTemplateRule) -> Vec<(DimensionType, String)> {
        let mut out = Vec::new();
        for entry in &rule.entries {
            let slots = [
                (DimensionType::Department, &entry.department_field),
                (DimensionType::Project, &entry.project_field),
                (DimensionType::Customer, &entry.customer_field),
                (DimensionType::Supplier, &entry.supplier_field),
                (DimensionType::Employee, &entry.employee_field),
            ];
            for (dim_type, field) in slots {
                if let Some(field) = field {
                    out.push((dim_type, field.clone()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::{EventField, TemplateEntry};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sales_rule() -> VoucherTemplateRule {
        VoucherTemplateRule {
            fields: vec![
                EventField {
                    name: "amount".into(),
                    required: true,
                },
                EventField {
                    name: "tax_rate".into(),
                    required: false,
                },
            ],
            entries: vec![
                TemplateEntry {
                    account: "1122".into(),
                    description: Some("Invoice {date}".into()),
                    debit: Some("round(amount * (1 + tax_rate), 2)".into()),
                    ..Default::default()
                },
                TemplateEntry {
                    account: "6001".into(),
                    credit: Some("amount".into()),
                    ..Default::default()
                },
                TemplateEntry {
                    account: "2221".into(),
                    credit: Some("round(amount * tax_rate, 2)".into()),
                    ..Default::default()
                },
            ],
            description: Some("Sales {period}".into()),
        }
    }

    fn event(amount: f64, tax_rate: f64, event_id: &str) -> serde_json::Map<String, Value> {
        json!({
            "amount": amount,
            "tax_rate": tax_rate,
            "event_id": event_id,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_generate_balanced_voucher() {
        let mut state = LedgerState::seeded();
        TemplateEngine::add_voucher_template(&mut state, "sales", "Sales", sales_rule()).unwrap();

        let date = "2025-01-15".parse().unwrap();
        let outcome =
            TemplateEngine::generate(&mut state, "sales", &event(1000.0, 0.13, "e1"), date)
                .unwrap();

        let voucher = state.voucher(outcome.voucher_id).unwrap();
        assert_eq!(voucher.source_template.as_deref(), Some("sales"));
        assert_eq!(voucher.entries.len(), 3);
        assert_eq!(voucher.entries[0].debit, dec!(1130.00));
        assert_eq!(voucher.entries[1].credit, dec!(1000));
        assert_eq!(voucher.entries[2].credit, dec!(130.00));
        assert_eq!(voucher.description.as_deref(), Some("Sales 2025-01"));
    }

    #[test]
    fn test_generate_is_idempotent_per_event() {
        let mut state = LedgerState::seeded();
        TemplateEngine::add_voucher_template(&mut state, "sales", "Sales", sales_rule()).unwrap();
        let date = "2025-01-15".parse().unwrap();

        let first =
            TemplateEngine::generate(&mut state, "sales", &event(1000.0, 0.0, "e1"), date).unwrap();
        let second =
            TemplateEngine::generate(&mut state, "sales", &event(1000.0, 0.0, "e1"), date).unwrap();

        assert_eq!(first.voucher_id, second.voucher_id);
        assert!(second.existing);
        // Balances were not touched twice.
        let key = crate::balance::BalanceKey {
            account_code: "6001".into(),
            period: "2025-01".parse().unwrap(),
            dims: crate::dimension::DimensionRefs::NONE,
        };
        assert_eq!(state.balance(&key).unwrap().credit, dec!(1000));
    }

    #[test]
    fn test_generate_rejects_disabled() {
        let mut state = LedgerState::seeded();
        TemplateEngine::add_voucher_template(&mut state, "sales", "Sales", sales_rule()).unwrap();
        TemplateEngine::disable_voucher_template(&mut state, "sales").unwrap();

        let date = "2025-01-15".parse().unwrap();
        assert!(matches!(
            TemplateEngine::generate(&mut state, "sales", &event(1.0, 0.0, "e1"), date),
            Err(LedgerError::TemplateDisabled(_))
        ));
    }

    #[test]
    fn test_generate_missing_required_field() {
        let mut state = LedgerState::seeded();
        TemplateEngine::add_voucher_template(&mut state, "sales", "Sales", sales_rule()).unwrap();

        let date = "2025-01-15".parse().unwrap();
        let mut payload = serde_json::Map::new();
        payload.insert("tax_rate".into(), json!(0.13));
        assert!(matches!(
            TemplateEngine::generate(&mut state, "sales", &payload, date),
            Err(LedgerError::EventFieldMissing(_))
        ));
    }

    #[test]
    fn test_generate_unbalanced_template() {
        let mut state = LedgerState::seeded();
        let rule = VoucherTemplateRule {
            fields: vec![EventField {
                name: "amount".into(),
                required: true,
            }],
            entries: vec![
                TemplateEntry {
                    account: "1001".into(),
                    debit: Some("amount".into()),
                    ..Default::default()
                },
                TemplateEntry {
                    account: "6001".into(),
                    credit: Some("amount / 2".into()),
                    ..Default::default()
                },
            ],
            description: None,
        };
        TemplateEngine::add_voucher_template(&mut state, "bad", "Bad", rule).unwrap();

        let date = "2025-01-15".parse().unwrap();
        let err =
            TemplateEngine::generate(&mut state, "bad", &event(100.0, 0.0, "e1"), date)
                .unwrap_err();
        assert!(matches!(err, LedgerError::TemplateUnbalanced { .. }));
        // Rejection precedes any state mutation.
        assert!(state.vouchers.is_empty());
        assert!(state.voucher_events.is_empty());
    }

    #[test]
    fn test_add_rejects_bad_expressions() {
        let mut state = LedgerState::seeded();
        let rule = VoucherTemplateRule {
            fields: vec![],
            entries: vec![TemplateEntry {
                account: "1001".into(),
                debit: Some("exec(amount)".into()),
                ..Default::default()
            }],
            description: None,
        };
        assert!(matches!(
            TemplateEngine::add_voucher_template(&mut state, "evil", "Evil", rule),
            Err(LedgerError::TemplateExpr(_))
        ));
    }

    #[test]
    fn test_tax_rate_missing_defaults_via_expression_error() {
        let mut state = LedgerState::seeded();
        TemplateEngine::add_voucher_template(&mut state, "sales", "Sales", sales_rule()).unwrap();

        let date = "2025-01-15".parse().unwrap();
        let mut payload = serde_json::Map::new();
        payload.insert("amount".into(), json!(100.0));
        // tax_rate is optional in the schema but referenced by the
        // expressions, so evaluation reports the unknown field.
        let err = TemplateEngine::generate(&mut state, "sales", &payload, date).unwrap_err();
        assert!(matches!(err, LedgerError::TemplateExpr(_)));
    }
}
