//! Voucher store: admission, lifecycle transitions, and red-letter voiding.
//!
//! Admission happens entirely before any mutation, so a rejected request
//! leaves the ledger unchanged. Voucher numbers are assigned at the first
//! transition to confirmed and are never reused, even after void or delete.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use tessera_shared::{money, Period};

use crate::balance::BalanceEngine;
use crate::dimension::{DimensionRefs, DimensionType};
use crate::error::{LedgerError, LedgerResult};
use crate::fx::{FxService, RateType};
use crate::state::LedgerState;
use crate::template::types::VoucherEvent;
use crate::voucher::types::{
    EntryDraft, EntryKind, VoidLink, Voucher, VoucherDraft, VoucherEntry, VoucherFilter,
    VoucherStatus, VoucherTotals,
};

/// Result of a submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    /// The voucher id.
    pub voucher_id: i64,
    /// The assigned number, present once confirmed.
    pub voucher_no: Option<String>,
    /// Status after the operation.
    pub status: VoucherStatus,
    /// Debit/credit totals.
    pub totals: VoucherTotals,
    /// Balance rows touched (zero unless confirmed).
    pub balances_updated: usize,
    /// True when an idempotent resubmission returned the prior voucher.
    pub existing: bool,
}

/// Result of a void.
#[derive(Debug, Clone, Serialize)]
pub struct VoidOutcome {
    /// The voided voucher.
    pub original_voucher_id: i64,
    /// The reversal voucher.
    pub void_voucher_id: i64,
    /// The reversal voucher's number.
    pub void_voucher_no: String,
}

/// Stateless voucher store service.
pub struct VoucherStore;

impl VoucherStore {
    /// Submits a voucher request.
    ///
    /// With `auto` the voucher is confirmed immediately and balances are
    /// updated; otherwise it lands as a draft. A request whose
    /// `source_event_id` has been seen returns the prior voucher unchanged.
    ///
    /// # Errors
    ///
    /// `NOT_BALANCED`, `ACCOUNT_NOT_FOUND`, `ACCOUNT_DISABLED`,
    /// `DIMENSION_NOT_FOUND`, `PERIOD_CLOSED`, `PERIOD_ADJUSTMENT_ONLY`,
    /// `RATE_NOT_FOUND`, `NEGATIVE_AMOUNT`.
    pub fn submit(
        state: &mut LedgerState,
        draft: &VoucherDraft,
        auto: bool,
    ) -> LedgerResult<SubmitOutcome> {
        // Idempotency: a replayed event returns the original voucher.
        if let Some(event_id) = &draft.source_event_id {
            if let Some(event) = state.voucher_events.get(event_id) {
                let voucher = state.voucher(event.voucher_id)?;
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

        let period = Period::from_date(draft.date);
        Self::check_admission(state, period, draft.entry_type)?;

        let entries = Self::build_entries(state, draft)?;
        let totals = Self::totals_of(&entries);
        if !totals.is_balanced {
            return Err(LedgerError::NotBalanced {
                debit: totals.debit_total,
                credit: totals.credit_total,
            });
        }

        let id = state.counters.next_voucher();
        let mut voucher = Voucher {
            id,
            voucher_no: None,
            date: draft.date,
            period,
            description: draft.description.clone(),
            status: VoucherStatus::Draft,
            entry_type: draft.entry_type,
            source_template: None,
            source_event_id: draft.source_event_id.clone(),
            void_reason: None,
            void_of: None,
            created_at: Utc::now(),
            reviewed_at: None,
            confirmed_at: None,
            voided_at: None,
            entries,
        };

        state.ensure_period(period);

        let mut balances_updated = 0;
        if auto {
            voucher.voucher_no = Some(state.next_voucher_no(draft.date));
            voucher.status = VoucherStatus::Confirmed;
            voucher.reviewed_at = Some(Utc::now());
            voucher.confirmed_at = Some(Utc::now());
            state.vouchers.insert(id, voucher);
            balances_updated = BalanceEngine::apply_voucher(state, id)?;
        } else {
            state.vouchers.insert(id, voucher);
        }

        if let Some(event_id) = &draft.source_event_id {
            state.voucher_events.insert(
                event_id.clone(),
                VoucherEvent {
                    event_id: event_id.clone(),
                    template_code: None,
                    voucher_id: id,
                    created_at: Utc::now(),
                },
            );
        }

        let voucher = state.voucher(id)?;
        info!(
            voucher_id = id,
            status = %voucher.status,
            period = %period,
            "voucher submitted"
        );
        Ok(SubmitOutcome {
            voucher_id: id,
            voucher_no: voucher.voucher_no.clone(),
            status: voucher.status,
            totals,
            balances_updated,
            existing: false,
        })
    }

    /// Marks a draft voucher reviewed.
    ///
    /// # Errors
    ///
    /// `VOUCHER_NOT_FOUND`; status errors for non-drafts.
    pub fn review(state: &mut LedgerState, id: i64) -> LedgerResult<()> {
        let voucher = state.voucher_mut(id)?;
        if voucher.status != VoucherStatus::Draft {
            return Err(LedgerError::VoucherNotDraft {
                id,
                status: voucher.status,
            });
        }
        voucher.status = VoucherStatus::Reviewed;
        voucher.reviewed_at = Some(Utc::now());
        Ok(())
    }

    /// Sends a reviewed voucher back to draft.
    ///
    /// # Errors
    ///
    /// `VOUCHER_NOT_FOUND`; `VOUCHER_NOT_REVIEWED` for other statuses.
    pub fn unreview(state: &mut LedgerState, id: i64) -> LedgerResult<()> {
        let voucher = state.voucher_mut(id)?;
        if voucher.status != VoucherStatus::Reviewed {
            return Err(LedgerError::VoucherNotReviewed {
                id,
                status: voucher.status,
            });
        }
        voucher.status = VoucherStatus::Draft;
        voucher.reviewed_at = None;
        Ok(())
    }

    /// Confirms a reviewed voucher: re-checks balance and admission,
    /// assigns the voucher number, and applies balances.
    ///
    /// # Errors
    ///
    /// `VOUCHER_NOT_REVIEWED`, `NOT_BALANCED`, period admission errors.
    pub fn confirm(state: &mut LedgerState, id: i64) -> LedgerResult<SubmitOutcome> {
        let voucher = state.voucher(id)?;
        if voucher.status != VoucherStatus::Reviewed {
            return Err(LedgerError::VoucherNotReviewed {
                id,
                status: voucher.status,
            });
        }
        let totals = voucher.totals();
        if !totals.is_balanced {
            return Err(LedgerError::NotBalanced {
                debit: totals.debit_total,
                credit: totals.credit_total,
            });
        }
        let period = voucher.period;
        let date = voucher.date;
        let kind = voucher.entry_type;
        Self::check_admission(state, period, kind)?;

        let voucher_no = state.next_voucher_no(date);
        {
            let voucher = state.voucher_mut(id)?;
            if voucher.voucher_no.is_none() {
                voucher.voucher_no = Some(voucher_no);
            }
            voucher.status = VoucherStatus::Confirmed;
            voucher.confirmed_at = Some(Utc::now());
        }
        let balances_updated = BalanceEngine::apply_voucher(state, id)?;

        let voucher = state.voucher(id)?;
        info!(voucher_id = id, voucher_no = ?voucher.voucher_no, "voucher confirmed");
        Ok(SubmitOutcome {
            voucher_id: id,
            voucher_no: voucher.voucher_no.clone(),
            status: voucher.status,
            totals,
            balances_updated,
            existing: false,
        })
    }

    /// Voids a confirmed voucher by posting a red-letter reversal.
    ///
    /// The reversal swaps each entry's debit and credit (foreign amounts
    /// included), posts on the original date by default, and is confirmed
    /// immediately; the original is marked voided but retained.
    ///
    /// # Errors
    ///
    /// `VOID_CONFIRMED` when the voucher is not confirmed; `PERIOD_CLOSED`
    /// when the target period no longer admits the reversal.
    pub fn void(
        state: &mut LedgerState,
        id: i64,
        reason: &str,
        override_date: Option<NaiveDate>,
    ) -> LedgerResult<VoidOutcome> {
        let original = state.voucher(id)?.clone();
        if original.status != VoucherStatus::Confirmed {
            return Err(LedgerError::VoidRequiresConfirmed {
                id,
                status: original.status,
            });
        }

        let date = override_date.unwrap_or(original.date);
        let period = Period::from_date(date);
        let status = state.period_status(period);
        let kind = match status {
            crate::period::PeriodStatus::Closed => return Err(LedgerError::PeriodClosed(period)),
            crate::period::PeriodStatus::Adjustment => EntryKind::Adjustment,
            crate::period::PeriodStatus::Open => EntryKind::Normal,
        };

        let entries: Vec<VoucherEntry> = original
            .entries
            .iter()
            .map(|entry| VoucherEntry {
                line_no: entry.line_no,
                account_code: entry.account_code.clone(),
                account_name: entry.account_name.clone(),
                description: Some(format!(
                    "Reversal: {}",
                    entry.description.clone().unwrap_or_default()
                )),
                debit: entry.credit,
                credit: entry.debit,
                currency: entry.currency.clone(),
                fx_rate: entry.fx_rate,
                foreign_debit: entry.foreign_credit,
                foreign_credit: entry.foreign_debit,
                dims: entry.dims,
            })
            .collect();

        let void_id = state.counters.next_voucher();
        let voucher_no = state.next_voucher_no(date);
        let now = Utc::now();
        let reversal = Voucher {
            id: void_id,
            voucher_no: Some(voucher_no.clone()),
            date,
            period,
            description: Some(format!(
                "Reversal: {}",
                original.description.clone().unwrap_or_default()
            )),
            status: VoucherStatus::Confirmed,
            entry_type: kind,
            source_template: None,
            source_event_id: None,
            void_reason: None,
            void_of: Some(id),
            created_at: now,
            reviewed_at: Some(now),
            confirmed_at: Some(now),
            voided_at: None,
            entries,
        };
        state.ensure_period(period);
        state.vouchers.insert(void_id, reversal);
        BalanceEngine::apply_voucher(state, void_id)?;

        {
            let original = state.voucher_mut(id)?;
            original.status = VoucherStatus::Voided;
            original.void_reason = Some(reason.to_string());
            original.voided_at = Some(now);
        }
        state.void_links.push(VoidLink {
            original_voucher_id: id,
            void_voucher_id: void_id,
            reason: reason.to_string(),
            created_at: now,
        });

        info!(
            original = id,
            reversal = void_id,
            voucher_no = %voucher_no,
            "voucher voided"
        );
        Ok(VoidOutcome {
            original_voucher_id: id,
            void_voucher_id: void_id,
            void_voucher_no: voucher_no,
        })
    }

    /// Deletes a draft voucher. Confirmed vouchers can only be voided.
    ///
    /// # Errors
    ///
    /// `VOUCHER_NOT_FOUND`; status error for non-drafts.
    pub fn delete(state: &mut LedgerState, id: i64) -> LedgerResult<()> {
        let voucher = state.voucher(id)?;
        if voucher.status != VoucherStatus::Draft {
            return Err(LedgerError::VoucherNotDraft {
                id,
                status: voucher.status,
            });
        }
        state.vouchers.remove(&id);
        Ok(())
    }

    /// Lists vouchers matching a filter, ordered by id.
    #[must_use]
    pub fn lookup<'a>(state: &'a LedgerState, filter: &VoucherFilter) -> Vec<&'a Voucher> {
        state
            .vouchers
            .values()
            .filter(|v| filter.status.map_or(true, |s| v.status == s))
            .filter(|v| filter.entry_type.map_or(true, |k| v.entry_type == k))
            .filter(|v| filter.period.map_or(true, |p| v.period == p))
            .filter(|v| filter.date_from.map_or(true, |d| v.date >= d))
            .filter(|v| filter.date_to.map_or(true, |d| v.date <= d))
            .filter(|v| {
                filter.account.as_ref().map_or(true, |code| {
                    v.entries.iter().any(|e| &e.account_code == code)
                })
            })
            .collect()
    }

    /// Verifies period admission for a voucher kind.
    fn check_admission(state: &LedgerState, period: Period, kind: EntryKind) -> LedgerResult<()> {
        match state.period_status(period) {
            crate::period::PeriodStatus::Closed => Err(LedgerError::PeriodClosed(period)),
            crate::period::PeriodStatus::Adjustment if kind == EntryKind::Normal => {
                Err(LedgerError::PeriodAdjustmentOnly(period))
            }
            _ => Ok(()),
        }
    }

    /// Resolves entry drafts: accounts, dimensions, and currency amounts.
    fn build_entries(
        state: &LedgerState,
        draft: &VoucherDraft,
    ) -> LedgerResult<Vec<VoucherEntry>> {
        let mut entries = Vec::with_capacity(draft.entries.len());
        for (index, entry) in draft.entries.iter().enumerate() {
            let line_no = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let account = state.account(&entry.account)?;

            let mut dims = DimensionRefs::NONE;
            let slots = [
                (DimensionType::Department, &entry.department),
                (DimensionType::Project, &entry.project),
                (DimensionType::Customer, &entry.customer),
                (DimensionType::Supplier, &entry.supplier),
                (DimensionType::Employee, &entry.employee),
            ];
            for (dim_type, code) in slots {
                if let Some(code) = code {
                    dims.set(dim_type, state.dimension_id(dim_type, code)?);
                }
            }

            let (debit, credit, fx_rate, foreign_debit, foreign_credit) =
                match &entry.currency {
                    Some(currency) => {
                        let rate = match entry.fx_rate {
                            Some(rate) => money::round_rate(rate),
                            None => FxService::lookup_rate(
                                state,
                                currency,
                                draft.date,
                                RateType::Spot,
                            )?,
                        };
                        let foreign_debit = entry.foreign_debit.unwrap_or(Decimal::ZERO);
                        let foreign_credit = entry.foreign_credit.unwrap_or(Decimal::ZERO);
                        let debit = if entry.debit.is_zero() && !foreign_debit.is_zero() {
                            money::round_money(foreign_debit * rate)
                        } else {
                            entry.debit
                        };
                        let credit = if entry.credit.is_zero() && !foreign_credit.is_zero() {
                            money::round_money(foreign_credit * rate)
                        } else {
                            entry.credit
                        };
                        (debit, credit, rate, foreign_debit, foreign_credit)
                    }
                    None => (
                        entry.debit,
                        entry.credit,
                        Decimal::ONE,
                        Decimal::ZERO,
                        Decimal::ZERO,
                    ),
                };

            if debit < Decimal::ZERO
                || credit < Decimal::ZERO
                || foreign_debit < Decimal::ZERO
                || foreign_credit < Decimal::ZERO
            {
                return Err(LedgerError::NegativeAmount { line_no });
            }

            entries.push(VoucherEntry {
                line_no,
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                description: entry.description.clone(),
                debit,
                credit,
                currency: entry.currency.clone(),
                fx_rate,
                foreign_debit,
                foreign_credit,
                dims,
            });
        }
        Ok(entries)
    }

    fn totals_of(entries: &[VoucherEntry]) -> VoucherTotals {
        let debit_total: Decimal = entries.iter().map(|e| e.debit).sum();
        let credit_total: Decimal = entries.iter().map(|e| e.credit).sum();
        VoucherTotals::new(debit_total, credit_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(date: &str, entries: Vec<EntryDraft>) -> VoucherDraft {
        VoucherDraft {
            date: date.parse().unwrap(),
            description: Some("Test voucher".into()),
            entry_type: EntryKind::Normal,
            source_event_id: None,
            entries,
        }
    }

    fn entry(account: &str, debit: Decimal, credit: Decimal) -> EntryDraft {
        EntryDraft {
            account: account.into(),
            debit,
            credit,
            ..Default::default()
        }
    }

    #[test]
    fn test_submit_draft() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(1000), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(1000)),
                ],
            ),
            false,
        )
        .unwrap();

        assert_eq!(outcome.status, VoucherStatus::Draft);
        assert!(outcome.voucher_no.is_none());
        assert_eq!(outcome.balances_updated, 0);
        assert!(state.balances.is_empty());
    }

    #[test]
    fn test_submit_unbalanced_rejected() {
        let mut state = LedgerState::seeded();
        let err = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(1000), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(900)),
                ],
            ),
            false,
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::NotBalanced { .. }));
        assert!(state.vouchers.is_empty());
    }

    #[test]
    fn test_tolerance_accepts_penny_difference() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(1000.00), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(1000.01)),
                ],
            ),
            false,
        );
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_submit_unknown_account() {
        let mut state = LedgerState::seeded();
        let err = VoucherStore::submit(
            &mut state,
            &draft("2025-01-15", vec![entry("9999", dec!(1), Decimal::ZERO)]),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[test]
    fn test_auto_confirm_updates_balances() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(1000), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(1000)),
                ],
            ),
            true,
        )
        .unwrap();

        assert_eq!(outcome.status, VoucherStatus::Confirmed);
        assert_eq!(outcome.voucher_no.as_deref(), Some("V20250115001"));
        assert_eq!(outcome.balances_updated, 2);
        assert_eq!(state.balances.len(), 2);
    }

    #[test]
    fn test_lifecycle_review_confirm() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(500), Decimal::ZERO),
                    entry("6001", Decimal::ZERO, dec!(500)),
                ],
            ),
            false,
        )
        .unwrap();
        let id = outcome.voucher_id;

        // Confirm before review is rejected.
        assert!(matches!(
            VoucherStore::confirm(&mut state, id),
            Err(LedgerError::VoucherNotReviewed { .. })
        ));

        VoucherStore::review(&mut state, id).unwrap();
        assert_eq!(state.voucher(id).unwrap().status, VoucherStatus::Reviewed);

        // Unreview returns to draft; review again and confirm.
        VoucherStore::unreview(&mut state, id).unwrap();
        assert_eq!(state.voucher(id).unwrap().status, VoucherStatus::Draft);
        VoucherStore::review(&mut state, id).unwrap();

        let confirmed = VoucherStore::confirm(&mut state, id).unwrap();
        assert_eq!(confirmed.status, VoucherStatus::Confirmed);
        assert!(confirmed.voucher_no.is_some());
    }

    #[test]
    fn test_delete_only_from_draft() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(100), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(100)),
                ],
            ),
            true,
        )
        .unwrap();

        assert!(matches!(
            VoucherStore::delete(&mut state, outcome.voucher_id),
            Err(LedgerError::VoucherNotDraft { .. })
        ));
    }

    #[test]
    fn test_idempotent_resubmission() {
        let mut state = LedgerState::seeded();
        let mut request = draft(
            "2025-01-15",
            vec![
                entry("1001", dec!(100), Decimal::ZERO),
                entry("1002", Decimal::ZERO, dec!(100)),
            ],
        );
        request.source_event_id = Some("evt-001".into());

        let first = VoucherStore::submit(&mut state, &request, true).unwrap();
        let second = VoucherStore::submit(&mut state, &request, true).unwrap();

        assert_eq!(first.voucher_id, second.voucher_id);
        assert!(second.existing);
        assert_eq!(state.vouchers.len(), 1);
    }

    #[test]
    fn test_void_swaps_debit_credit() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(1000), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(1000)),
                ],
            ),
            true,
        )
        .unwrap();

        let void = VoucherStore::void(&mut state, outcome.voucher_id, "duplicate", None).unwrap();
        let reversal = state.voucher(void.void_voucher_id).unwrap();
        assert_eq!(reversal.entries[0].debit, Decimal::ZERO);
        assert_eq!(reversal.entries[0].credit, dec!(1000));
        assert_eq!(reversal.void_of, Some(outcome.voucher_id));

        let original = state.voucher(outcome.voucher_id).unwrap();
        assert_eq!(original.status, VoucherStatus::Voided);
        assert_eq!(original.void_reason.as_deref(), Some("duplicate"));
        assert_eq!(state.void_links.len(), 1);
    }

    #[test]
    fn test_void_requires_confirmed() {
        let mut state = LedgerState::seeded();
        let outcome = VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(100), Decimal::ZERO),
                    entry("1002", Decimal::ZERO, dec!(100)),
                ],
            ),
            false,
        )
        .unwrap();

        assert!(matches!(
            VoucherStore::void(&mut state, outcome.voucher_id, "nope", None),
            Err(LedgerError::VoidRequiresConfirmed { .. })
        ));
    }

    #[test]
    fn test_zero_entry_voucher_is_legal() {
        let mut state = LedgerState::seeded();
        let outcome =
            VoucherStore::submit(&mut state, &draft("2025-01-15", vec![]), false).unwrap();
        assert_eq!(outcome.totals.debit_total, Decimal::ZERO);
        assert!(outcome.totals.is_balanced);
    }

    #[test]
    fn test_lookup_filters() {
        let mut state = LedgerState::seeded();
        VoucherStore::submit(
            &mut state,
            &draft(
                "2025-01-15",
                vec![
                    entry("1001", dec!(100), Decimal::ZERO),
                    entry("6001", Decimal::ZERO, dec!(100)),
                ],
            ),
            true,
        )
        .unwrap();
        VoucherStore::submit(
            &mut state,
            &draft(
                "2025-02-10",
                vec![
                    entry("1002", dec!(50), Decimal::ZERO),
                    entry("6001", Decimal::ZERO, dec!(50)),
                ],
            ),
            false,
        )
        .unwrap();

        let confirmed = VoucherStore::lookup(
            &state,
            &VoucherFilter {
                status: Some(VoucherStatus::Confirmed),
                ..Default::default()
            },
        );
        assert_eq!(confirmed.len(), 1);

        let january = VoucherStore::lookup(
            &state,
            &VoucherFilter {
                period: Some("2025-01".parse().unwrap()),
                ..Default::default()
            },
        );
        assert_eq!(january.len(), 1);

        let touching_1002 = VoucherStore::lookup(
            &state,
            &VoucherFilter {
                account: Some("1002".into()),
                ..Default::default()
            },
        );
        assert_eq!(touching_1002.len(), 1);
    }
}
