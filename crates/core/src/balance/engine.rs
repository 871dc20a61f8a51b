//! Balance engine.
//!
//! Applies confirmed vouchers to the balance index, rolls balances between
//! periods, and rebuilds the index from scratch by replay. The engine is
//! symmetric: red-letter reversals go through the same path as ordinary
//! postings.
//!
//! Invariant: after every application, each row's closing equals its opening
//! plus signed activity, and the opening of a row equals the closing of the
//! same key in the previous period whenever that row exists. The chain is
//! refreshed forward on every touch, so the final index is a pure function
//! of the confirmed voucher set.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use tessera_shared::Period;

use crate::balance::types::{Balance, BalanceKey};
use crate::error::{LedgerError, LedgerResult};
use crate::state::LedgerState;
use crate::voucher::{VoucherEntry, VoucherStatus};

/// Stateless balance index engine.
pub struct BalanceEngine;

impl BalanceEngine {
    /// Applies all entries of a voucher to the balance index.
    ///
    /// Returns the number of distinct balance rows touched.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry references an unknown account.
    pub fn apply_voucher(state: &mut LedgerState, voucher_id: i64) -> LedgerResult<usize> {
        let voucher = state.voucher(voucher_id)?.clone();
        let mut touched: BTreeSet<BalanceKey> = BTreeSet::new();

        for entry in &voucher.entries {
            let key = Self::apply_entry(state, voucher.period, entry)?;
            touched.insert(key);
        }

        debug!(
            voucher_id,
            period = %voucher.period,
            rows = touched.len(),
            "applied voucher to balance index"
        );
        Ok(touched.len())
    }

    /// Applies one entry, creating the balance row if needed, and refreshes
    /// the forward chain of openings.
    fn apply_entry(
        state: &mut LedgerState,
        period: Period,
        entry: &VoucherEntry,
    ) -> LedgerResult<BalanceKey> {
        let direction = state.account_any(&entry.account_code)?.direction;
        let key = BalanceKey {
            account_code: entry.account_code.clone(),
            period,
            dims: entry.dims,
        };

        let position = match state.balance_position(&key) {
            Some(position) => position,
            None => {
                let (opening, foreign_opening, currency) = Self::opening_for(state, &key);
                let mut row = Balance::opening_row(key.clone(), opening, foreign_opening);
                row.currency = currency;
                state.balances.push(row);
                state.balances.len() - 1
            }
        };

        let row = &mut state.balances[position];
        row.debit += entry.debit;
        row.credit += entry.credit;
        if let Some(currency) = &entry.currency {
            row.currency = Some(currency.clone());
            row.foreign_debit += entry.foreign_debit;
            row.foreign_credit += entry.foreign_credit;
        }
        row.recompute_closing(direction);
        row.updated_at = Utc::now();

        Self::refresh_chain(state, &key)?;
        Ok(key)
    }

    /// Opening balances (and carried currency) for a new row: the closing
    /// of the same key in the previous period, or zero when no such row
    /// exists.
    fn opening_for(
        state: &LedgerState,
        key: &BalanceKey,
    ) -> (Decimal, Decimal, Option<String>) {
        let prev_key = key.in_period(key.period.prev());
        state
            .balance(&prev_key)
            .map_or((Decimal::ZERO, Decimal::ZERO, None), |row| {
                (row.closing, row.foreign_closing, row.currency.clone())
            })
    }

    /// Propagates a row's closing into the openings of the same key in
    /// following periods, for as long as such rows exist.
    fn refresh_chain(state: &mut LedgerState, key: &BalanceKey) -> LedgerResult<()> {
        let mut current = key.clone();
        loop {
            let closing = match state.balance(&current) {
                Some(row) => (row.closing, row.foreign_closing),
                None => break,
            };
            let next = current.in_period(current.period.next());
            let Some(position) = state.balance_position(&next) else {
                break;
            };
            let direction = state.account_any(&next.account_code)?.direction;
            let row = &mut state.balances[position];
            if row.opening == closing.0 && row.foreign_opening == closing.1 {
                break;
            }
            row.opening = closing.0;
            row.foreign_opening = closing.1;
            row.recompute_closing(direction);
            row.updated_at = Utc::now();
            current = next;
        }
        Ok(())
    }

    /// Rolls every balance row of `period` into the next period: missing
    /// rows are materialized with `opening = closing` and no activity;
    /// existing rows get their opening refreshed. Idempotent.
    ///
    /// Returns the number of rows materialized or refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if a row references an unknown account.
    pub fn rollover(state: &mut LedgerState, period: Period) -> LedgerResult<usize> {
        let keys: Vec<BalanceKey> = state
            .balances_for_period(period)
            .map(Balance::key)
            .collect();

        let next_period = period.next();
        let mut rolled = 0usize;
        for key in keys {
            let row = state
                .balance(&key)
                .expect("key was just collected from the index");
            let closing = row.closing;
            let foreign_closing = row.foreign_closing;
            let currency = row.currency.clone();
            let next_key = key.in_period(next_period);

            match state.balance_position(&next_key) {
                Some(position) => {
                    let direction = state.account_any(&next_key.account_code)?.direction;
                    let row = &mut state.balances[position];
                    if row.opening != closing || row.foreign_opening != foreign_closing {
                        row.opening = closing;
                        row.foreign_opening = foreign_closing;
                        row.recompute_closing(direction);
                        row.updated_at = Utc::now();
                        rolled += 1;
                    }
                }
                None => {
                    let mut row = Balance::opening_row(next_key.clone(), closing, foreign_closing);
                    row.currency = currency;
                    state.balances.push(row);
                    rolled += 1;
                }
            }
            Self::refresh_chain(state, &key.in_period(next_period))?;
        }

        debug!(period = %period, rolled, "rolled balances into next period");
        Ok(rolled)
    }

    /// The effective balance view of a period: its own rows plus, for
    /// every key whose latest row sits in an earlier period, a synthesized
    /// carry-forward row with `opening = closing` and no activity.
    ///
    /// Rollover materializes such rows physically at close; before a close
    /// the view supplies them on demand, so reports and revaluation see
    /// every account's standing balance, not only the accounts touched in
    /// the period.
    #[must_use]
    pub fn effective_rows(state: &LedgerState, period: Period) -> Vec<Balance> {
        let mut rows: Vec<Balance> = state
            .balances_for_period(period)
            .cloned()
            .collect();
        let mut seen: BTreeSet<(String, crate::dimension::DimensionRefs)> = rows
            .iter()
            .map(|b| (b.account_code.clone(), b.dims))
            .collect();

        // Latest prior row per key.
        let mut latest: BTreeMap<(String, crate::dimension::DimensionRefs), &Balance> =
            BTreeMap::new();
        for row in state.balances.iter().filter(|b| b.period < period) {
            let key = (row.account_code.clone(), row.dims);
            match latest.get(&key) {
                Some(existing) if existing.period >= row.period => {}
                _ => {
                    latest.insert(key, row);
                }
            }
        }

        for ((account_code, dims), prior) in latest {
            if seen.contains(&(account_code.clone(), dims)) {
                continue;
            }
            seen.insert((account_code.clone(), dims));
            let mut carried = Balance::opening_row(
                BalanceKey {
                    account_code,
                    period,
                    dims,
                },
                prior.closing,
                prior.foreign_closing,
            );
            carried.currency = prior.currency.clone();
            rows.push(carried);
        }
        rows
    }

    /// Rebuilds the balance index by replaying every posted voucher
    /// (confirmed and voided originals plus their reversals) grouped by
    /// period in voucher-number order, then re-running rollover for closed
    /// periods in chronological order.
    ///
    /// # Errors
    ///
    /// Returns an error if a replayed entry references an unknown account.
    pub fn rebuild(state: &LedgerState) -> LedgerResult<Vec<Balance>> {
        let mut scratch = state.clone();
        scratch.balances.clear();

        let mut posted: Vec<&crate::voucher::Voucher> = state
            .vouchers
            .values()
            .filter(|v| matches!(v.status, VoucherStatus::Confirmed | VoucherStatus::Voided))
            .collect();
        posted.sort_by(|a, b| {
            (a.period, a.voucher_no.as_deref()).cmp(&(b.period, b.voucher_no.as_deref()))
        });

        let ids: Vec<i64> = posted.iter().map(|v| v.id).collect();
        for id in ids {
            Self::apply_voucher(&mut scratch, id)?;
        }

        let closed: Vec<Period> = scratch
            .periods
            .values()
            .filter(|p| p.status == crate::period::PeriodStatus::Closed)
            .map(|p| p.period)
            .collect();
        for period in closed {
            Self::rollover(&mut scratch, period)?;
        }

        Ok(scratch.balances)
    }

    /// Verifies that the persisted index equals a fresh rebuild.
    ///
    /// # Errors
    ///
    /// `REBUILD_MISMATCH` describing the first divergence. A mismatch
    /// indicates corrupted state rather than bad input.
    pub fn verify(state: &LedgerState) -> LedgerResult<()> {
        let rebuilt = Self::rebuild(state)?;

        let mismatch = |details: String| LedgerError::RebuildMismatch { details };

        for row in &rebuilt {
            let key = row.key();
            match state.balance(&key) {
                None => {
                    return Err(mismatch(format!(
                        "row missing from persisted index: {} {} {:?}",
                        key.account_code, key.period, key.dims
                    )));
                }
                Some(persisted) => {
                    if persisted.opening != row.opening
                        || persisted.debit != row.debit
                        || persisted.credit != row.credit
                        || persisted.closing != row.closing
                        || persisted.foreign_opening != row.foreign_opening
                        || persisted.foreign_debit != row.foreign_debit
                        || persisted.foreign_credit != row.foreign_credit
                        || persisted.foreign_closing != row.foreign_closing
                    {
                        return Err(mismatch(format!(
                            "row diverges for {} {}: persisted closing {}, rebuilt closing {}",
                            key.account_code, key.period, persisted.closing, row.closing
                        )));
                    }
                }
            }
        }

        for row in &state.balances {
            let found = rebuilt.iter().any(|r| {
                r.account_code == row.account_code
                    && r.period == row.period
                    && r.dims == row.dims
            });
            if !found {
                return Err(mismatch(format!(
                    "persisted row has no replayed counterpart: {} {} {:?}",
                    row.account_code, row.period, row.dims
                )));
            }
        }

        Ok(())
    }
}
