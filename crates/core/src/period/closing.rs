//! Period close and reopen.
//!
//! Closing a period verifies every posted voucher, runs the active closing
//! templates, rolls balances into the next period, and marks the period
//! closed. Reopening reverses the closing vouchers: into the period itself
//! when the next period has seen no activity (rolled rows are dropped), or
//! as adjustment-carry vouchers in the next period when it has.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use tessera_shared::{money, LedgerConfig, Period};

use crate::balance::BalanceEngine;
use crate::error::{LedgerError, LedgerResult};
use crate::period::types::PeriodStatus;
use crate::state::LedgerState;
use crate::template::types::ClosingTemplate;
use crate::voucher::{EntryDraft, VoucherDraft, VoucherStatus, VoucherStore};

/// Result of closing a period.
#[derive(Debug, Clone, Serialize)]
pub struct CloseOutcome {
    /// The closed period.
    pub period: Period,
    /// Closing vouchers emitted, as (template code, voucher id).
    pub closing_vouchers: Vec<(String, i64)>,
    /// Balance rows rolled into the next period.
    pub rolled: usize,
}

/// Result of reopening a period.
#[derive(Debug, Clone, Serialize)]
pub struct ReopenOutcome {
    /// The reopened period.
    pub period: Period,
    /// Reversal vouchers posted, as (original closing voucher, reversal).
    pub reversals: Vec<(i64, i64)>,
    /// Pure-rollover rows dropped from the next period.
    pub unrolled: usize,
    /// True when reversals were carried into the next period because it
    /// already had activity.
    pub carried_forward: bool,
}

/// Stateless period engine.
pub struct PeriodEngine;

impl PeriodEngine {
    /// Manually moves a period between open and adjustment.
    ///
    /// Closing happens through [`Self::close`], reopening through
    /// [`Self::reopen`]; every other transition is rejected.
    ///
    /// # Errors
    ///
    /// `PERIOD_TRANSITION_INVALID` for illegal transitions.
    pub fn set_status(
        state: &mut LedgerState,
        period: Period,
        status: PeriodStatus,
    ) -> LedgerResult<()> {
        let current = state.period_status(period);
        let legal = matches!(
            (current, status),
            (PeriodStatus::Open, PeriodStatus::Adjustment)
                | (PeriodStatus::Adjustment, PeriodStatus::Open)
        );
        if !legal {
            return Err(LedgerError::PeriodTransitionInvalid {
                period,
                from: current,
                to: status,
            });
        }
        state.ensure_period(period).status = status;
        info!(period = %period, status = %status, "period status changed");
        Ok(())
    }

    /// Closes a period.
    ///
    /// 1. Verifies every posted voucher in the period balances.
    /// 2. Evaluates each active closing template not yet applied, posting
    ///    its closing voucher.
    /// 3. Rolls balances into the next period.
    /// 4. Marks the period closed.
    ///
    /// # Errors
    ///
    /// `PERIOD_CLOSED` when already closed; `NOT_BALANCED` when a posted
    /// voucher fails the sanity check; template errors abort the close.
    pub fn close(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
    ) -> LedgerResult<CloseOutcome> {
        if state.period_status(period) == PeriodStatus::Closed {
            return Err(LedgerError::PeriodClosed(period));
        }

        // Sanity: every posted voucher must balance.
        for voucher in state.vouchers.values() {
            if voucher.period == period && voucher.status.is_posted() {
                let totals = voucher.totals();
                if !totals.is_balanced {
                    return Err(LedgerError::NotBalanced {
                        debit: totals.debit_total,
                        credit: totals.credit_total,
                    });
                }
            }
        }

        let templates: Vec<ClosingTemplate> = state
            .closing_templates
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect();

        let mut closing_vouchers = Vec::new();
        for template in templates {
            let already_applied = state
                .periods
                .get(&period)
                .is_some_and(|p| p.has_closing_for(&template.code));
            if already_applied {
                continue;
            }
            if let Some(voucher_id) = Self::apply_closing_template(state, config, period, &template)? {
                closing_vouchers.push((template.code.clone(), voucher_id));
            }
        }

        let rolled = BalanceEngine::rollover(state, period)?;
        state.ensure_period(period.next());

        let record = state.ensure_period(period);
        record.status = PeriodStatus::Closed;
        record.closed_at = Some(Utc::now());
        record.closing_vouchers.extend(closing_vouchers.clone());

        info!(
            period = %period,
            templates = closing_vouchers.len(),
            rolled,
            "period closed"
        );
        Ok(CloseOutcome {
            period,
            closing_vouchers,
            rolled,
        })
    }

    /// Evaluates one closing template for a period.
    ///
    /// Flattens the closing balance of every matching account into the
    /// target account. Returns `None` when nothing matched.
    fn apply_closing_template(
        state: &mut LedgerState,
        _config: &LedgerConfig,
        period: Period,
        template: &ClosingTemplate,
    ) -> LedgerResult<Option<i64>> {
        if !template.is_active {
            return Err(LedgerError::TemplateDisabled(template.code.clone()));
        }
        // The target must exist before any entries are built.
        state.account(&template.rule.target_account)?;

        // Net closing balance per matching account, aggregated across
        // dimension rows.
        let mut flattened: Vec<(String, Decimal)> = Vec::new();
        for row in state.balances_for_period(period) {
            let account = state.account_any(&row.account_code)?;
            let matches = template
                .rule
                .sources
                .iter()
                .any(|s| s.matches(&account.code, account.account_type));
            if !matches || row.closing.is_zero() {
                continue;
            }
            match flattened.iter_mut().find(|(code, _)| code == &row.account_code) {
                Some((_, total)) => *total += row.closing,
                None => flattened.push((row.account_code.clone(), row.closing)),
            }
        }
        flattened.retain(|(_, total)| !total.is_zero());
        if flattened.is_empty() {
            return Ok(None);
        }

        // Zero each source account against its normal side; the target
        // takes the net. Balanced by construction.
        let mut entries = Vec::new();
        let mut net = Decimal::ZERO; // positive = credit to target
        for (code, closing) in &flattened {
            let account = state.account_any(code)?;
            let closing = money::round_money(*closing);
            let (debit, credit) = match account.direction {
                // A credit-natured closing balance is zeroed by a debit.
                crate::chart::Direction::Credit => {
                    if closing >= Decimal::ZERO {
                        (closing, Decimal::ZERO)
                    } else {
                        (Decimal::ZERO, -closing)
                    }
                }
                crate::chart::Direction::Debit => {
                    if closing >= Decimal::ZERO {
                        (Decimal::ZERO, closing)
                    } else {
                        (-closing, Decimal::ZERO)
                    }
                }
            };
            net += debit - credit;
            entries.push(EntryDraft {
                account: code.clone(),
                description: Some(template.name.clone()),
                debit,
                credit,
                ..Default::default()
            });
        }

        let net = money::round_money(net);
        if !net.is_zero() {
            entries.push(EntryDraft {
                account: template.rule.target_account.clone(),
                description: Some(template.name.clone()),
                debit: if net < Decimal::ZERO { -net } else { Decimal::ZERO },
                credit: if net > Decimal::ZERO { net } else { Decimal::ZERO },
                ..Default::default()
            });
        }

        let debit_total: Decimal = entries.iter().map(|e| e.debit).sum();
        let credit_total: Decimal = entries.iter().map(|e| e.credit).sum();
        if !money::within_tolerance(debit_total, credit_total) {
            return Err(LedgerError::TemplateUnbalanced {
                code: template.code.clone(),
                debit: debit_total,
                credit: credit_total,
            });
        }

        let description = template
            .rule
            .description
            .replace("{period}", &period.to_string());
        let draft = VoucherDraft {
            date: period.last_day(),
            description: Some(description),
            entry_type: Default::default(),
            source_event_id: None,
            entries,
        };
        let outcome = VoucherStore::submit(state, &draft, true)?;
        state
            .voucher_mut(outcome.voucher_id)?
            .source_template = Some(template.code.clone());
        Ok(Some(outcome.voucher_id))
    }

    /// Reopens a closed period.
    ///
    /// Closing vouchers are reversed by void. When the next period has no
    /// posted activity, the reversals post into the reopened period itself
    /// and the rolled-over rows are dropped; when it has, the reversals
    /// post into the next period as adjustment carries, leaving its rolled
    /// openings valid.
    ///
    /// # Errors
    ///
    /// `PERIOD_NOT_CLOSED` when the period is not closed.
    pub fn reopen(
        state: &mut LedgerState,
        _config: &LedgerConfig,
        period: Period,
    ) -> LedgerResult<ReopenOutcome> {
        if state.period_status(period) != PeriodStatus::Closed {
            return Err(LedgerError::PeriodNotClosed(period));
        }
        let next = period.next();
        let next_has_activity = state
            .vouchers
            .values()
            .any(|v| v.period == next && v.status.is_posted());

        let closing_vouchers: Vec<(String, i64)> = state
            .periods
            .get(&period)
            .map(|p| p.closing_vouchers.clone())
            .unwrap_or_default();

        // Reopen first so the reversals are admitted.
        {
            let record = state.ensure_period(period);
            record.status = PeriodStatus::Open;
            record.closed_at = None;
            record.closing_vouchers.clear();
        }

        let mut reversals = Vec::new();
        for (_template, voucher_id) in &closing_vouchers {
            if state.voucher(*voucher_id)?.status != VoucherStatus::Confirmed {
                continue;
            }
            let override_date = if next_has_activity {
                Some(next.first_day())
            } else {
                None
            };
            let outcome = VoucherStore::void(
                state,
                *voucher_id,
                &format!("Reopen {period}"),
                override_date,
            )?;
            reversals.push((*voucher_id, outcome.void_voucher_id));
        }

        // Un-roll: drop next-period rows that exist only through the
        // reversed close's rollover. Rows with activity keep their
        // openings, which still equal the prior period's closings.
        let before = state.balances.len();
        state
            .balances
            .retain(|b| !(b.period == next && b.is_pure_rollover()));
        let unrolled = before - state.balances.len();

        info!(
            period = %period,
            reversals = reversals.len(),
            unrolled,
            carried_forward = next_has_activity,
            "period reopened"
        );
        Ok(ReopenOutcome {
            period,
            reversals,
            unrolled,
            carried_forward: next_has_activity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::{ClosingRule, SourceSelector};
    use crate::voucher::EntryKind;
    use rust_decimal_macros::dec;

    fn seed_pl_template(state: &mut LedgerState) {
        state.closing_templates.insert(
            "pl_close".into(),
            ClosingTemplate {
                code: "pl_close".into(),
                name: "Close profit and loss".into(),
                rule: ClosingRule {
                    sources: vec![SourceSelector {
                        prefixes: vec![],
                        account_types: vec![
                            crate::chart::AccountType::Revenue,
                            crate::chart::AccountType::Expense,
                        ],
                    }],
                    target_account: "4103".into(),
                    description: "Period close {period}".into(),
                },
                is_active: true,
                created_at: Utc::now(),
            },
        );
    }

    fn post(state: &mut LedgerState, date: &str, debit_acct: &str, credit_acct: &str, amount: Decimal) {
        let draft = VoucherDraft {
            date: date.parse().unwrap(),
            description: None,
            entry_type: EntryKind::Normal,
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: debit_acct.into(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: credit_acct.into(),
                    credit: amount,
                    ..Default::default()
                },
            ],
        };
        VoucherStore::submit(state, &draft, true).unwrap();
    }

    #[test]
    fn test_manual_transitions() {
        let mut state = LedgerState::seeded();
        let period: Period = "2025-01".parse().unwrap();

        PeriodEngine::set_status(&mut state, period, PeriodStatus::Adjustment).unwrap();
        assert_eq!(state.period_status(period), PeriodStatus::Adjustment);

        PeriodEngine::set_status(&mut state, period, PeriodStatus::Open).unwrap();
        assert_eq!(state.period_status(period), PeriodStatus::Open);

        assert!(matches!(
            PeriodEngine::set_status(&mut state, period, PeriodStatus::Closed),
            Err(LedgerError::PeriodTransitionInvalid { .. })
        ));
    }

    #[test]
    fn test_close_flattens_profit_to_target() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        seed_pl_template(&mut state);
        let period: Period = "2025-01".parse().unwrap();

        // Revenue 50000, cost 30000.
        post(&mut state, "2025-01-10", "1001", "6001", dec!(50000));
        post(&mut state, "2025-01-20", "6401", "1001", dec!(30000));

        let outcome = PeriodEngine::close(&mut state, &config, period).unwrap();
        assert_eq!(outcome.closing_vouchers.len(), 1);
        assert_eq!(state.period_status(period), PeriodStatus::Closed);

        let closing = state
            .voucher(outcome.closing_vouchers[0].1)
            .unwrap()
            .clone();
        // Revenue zeroed with a 50000 debit, cost with a 30000 credit,
        // profit 20000 credited to the target.
        let revenue_line = closing
            .entries
            .iter()
            .find(|e| e.account_code == "6001")
            .unwrap();
        assert_eq!(revenue_line.debit, dec!(50000));
        let cost_line = closing
            .entries
            .iter()
            .find(|e| e.account_code == "6401")
            .unwrap();
        assert_eq!(cost_line.credit, dec!(30000));
        let target_line = closing
            .entries
            .iter()
            .find(|e| e.account_code == "4103")
            .unwrap();
        assert_eq!(target_line.credit, dec!(20000));

        // Next period opens with the rolled profit.
        let next_key = crate::balance::BalanceKey {
            account_code: "4103".into(),
            period: period.next(),
            dims: crate::dimension::DimensionRefs::NONE,
        };
        assert_eq!(state.balance(&next_key).unwrap().opening, dec!(20000));
    }

    #[test]
    fn test_close_is_idempotent_per_template() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        seed_pl_template(&mut state);
        let period: Period = "2025-01".parse().unwrap();
        post(&mut state, "2025-01-10", "1001", "6001", dec!(1000));

        PeriodEngine::close(&mut state, &config, period).unwrap();
        // Reopen and close again without new activity in the next period:
        // the template was reversed on reopen, so it applies again, but
        // only once per close.
        PeriodEngine::reopen(&mut state, &config, period).unwrap();
        let outcome = PeriodEngine::close(&mut state, &config, period).unwrap();
        assert_eq!(outcome.closing_vouchers.len(), 1);
    }

    #[test]
    fn test_close_rejects_closed_period() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let period: Period = "2025-01".parse().unwrap();
        post(&mut state, "2025-01-10", "1001", "6001", dec!(100));

        PeriodEngine::close(&mut state, &config, period).unwrap();
        assert!(matches!(
            PeriodEngine::close(&mut state, &config, period),
            Err(LedgerError::PeriodClosed(_))
        ));
    }

    #[test]
    fn test_closed_period_rejects_postings() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        let period: Period = "2025-01".parse().unwrap();
        post(&mut state, "2025-01-10", "1001", "6001", dec!(100));
        PeriodEngine::close(&mut state, &config, period).unwrap();

        let draft = VoucherDraft {
            date: "2025-01-15".parse().unwrap(),
            description: None,
            entry_type: EntryKind::Normal,
            source_event_id: None,
            entries: vec![],
        };
        assert!(matches!(
            VoucherStore::submit(&mut state, &draft, false),
            Err(LedgerError::PeriodClosed(_))
        ));
    }

    #[test]
    fn test_adjustment_period_admission() {
        let mut state = LedgerState::seeded();
        let period: Period = "2025-01".parse().unwrap();
        PeriodEngine::set_status(&mut state, period, PeriodStatus::Adjustment).unwrap();

        let normal = VoucherDraft {
            date: "2025-01-15".parse().unwrap(),
            description: None,
            entry_type: EntryKind::Normal,
            source_event_id: None,
            entries: vec![],
        };
        assert!(matches!(
            VoucherStore::submit(&mut state, &normal, false),
            Err(LedgerError::PeriodAdjustmentOnly(_))
        ));

        let adjustment = VoucherDraft {
            entry_type: EntryKind::Adjustment,
            ..normal
        };
        assert!(VoucherStore::submit(&mut state, &adjustment, false).is_ok());
    }

    #[test]
    fn test_reopen_without_next_activity_unrolls() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        seed_pl_template(&mut state);
        let period: Period = "2025-01".parse().unwrap();
        post(&mut state, "2025-01-10", "1001", "6001", dec!(1000));

        PeriodEngine::close(&mut state, &config, period).unwrap();
        let next: Period = "2025-02".parse().unwrap();
        assert!(state.balances_for_period(next).count() > 0);

        let outcome = PeriodEngine::reopen(&mut state, &config, period).unwrap();
        assert!(!outcome.carried_forward);
        assert_eq!(outcome.reversals.len(), 1);
        assert!(outcome.unrolled > 0);
        assert_eq!(state.balances_for_period(next).count(), 0);
        assert_eq!(state.period_status(period), PeriodStatus::Open);

        // The reversal landed in the reopened period and restored the
        // revenue balance.
        let key = crate::balance::BalanceKey {
            account_code: "6001".into(),
            period,
            dims: crate::dimension::DimensionRefs::NONE,
        };
        assert_eq!(state.balance(&key).unwrap().closing, dec!(1000));
    }

    #[test]
    fn test_reopen_with_next_activity_carries_forward() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        seed_pl_template(&mut state);
        let period: Period = "2025-01".parse().unwrap();
        post(&mut state, "2025-01-10", "1001", "6001", dec!(1000));
        PeriodEngine::close(&mut state, &config, period).unwrap();

        // Activity in February before the reopen.
        post(&mut state, "2025-02-05", "1001", "6001", dec!(500));

        let outcome = PeriodEngine::reopen(&mut state, &config, period).unwrap();
        assert!(outcome.carried_forward);

        // The carry voucher posted into February.
        let (_, reversal_id) = outcome.reversals[0];
        let reversal = state.voucher(reversal_id).unwrap();
        assert_eq!(reversal.period, "2025-02".parse().unwrap());

        // Replay still reproduces the index after the carry.
        crate::balance::BalanceEngine::verify(&state).unwrap();
    }

    #[test]
    fn test_reopen_requires_closed() {
        let mut state = LedgerState::seeded();
        let config = LedgerConfig::default();
        assert!(matches!(
            PeriodEngine::reopen(&mut state, &config, "2025-01".parse().unwrap()),
            Err(LedgerError::PeriodNotClosed(_))
        ));
    }
}
