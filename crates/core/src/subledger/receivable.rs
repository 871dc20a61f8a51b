//! Receivables and payables.
//!
//! Open items carry the party, amount, and invoice date; settlements
//! consume them partially or fully. Every operation posts a balanced
//! voucher through the store: the sub-ledger owns item lineage, the
//! ledger owns money. Aging buckets outstanding balances at 0-30, 31-60,
//! 61-90, and over 90 days past the invoice date; bad-debt provisioning
//! applies configured per-bucket rates.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_shared::{money, LedgerConfig, Period};

use crate::dimension::DimensionType;
use crate::error::{LedgerError, LedgerResult};
use crate::state::LedgerState;
use crate::voucher::{EntryDraft, VoucherDraft, VoucherStore};

/// Which side of the trade book an item lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenItemSide {
    /// Owed to us by a customer.
    Receivable,
    /// Owed by us to a supplier.
    Payable,
}

impl OpenItemSide {
    /// The dimension type identifying the counterparty.
    #[must_use]
    pub fn party_dimension(&self) -> DimensionType {
        match self {
            Self::Receivable => DimensionType::Customer,
            Self::Payable => DimensionType::Supplier,
        }
    }
}

/// Open-item settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenItemStatus {
    /// Outstanding balance remains.
    Open,
    /// Fully settled.
    Settled,
}

/// An invoice-level receivable or payable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenItem {
    /// Item id.
    pub id: i64,
    /// Receivable or payable.
    pub side: OpenItemSide,
    /// Customer or supplier dimension id.
    pub party_id: i64,
    /// The voucher that booked the item.
    pub voucher_id: i64,
    /// Original amount.
    pub amount: Decimal,
    /// Amount settled so far.
    pub settled: Decimal,
    /// Settlement status.
    pub status: OpenItemStatus,
    /// Invoice date (drives aging).
    pub date: NaiveDate,
    /// Memo.
    pub description: Option<String>,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

impl OpenItem {
    /// Outstanding balance right now.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.amount - self.settled
    }
}

/// One settlement against an open item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement id.
    pub id: i64,
    /// The consumed item.
    pub item_id: i64,
    /// Amount settled.
    pub amount: Decimal,
    /// The settlement voucher.
    pub voucher_id: i64,
    /// Settlement date.
    pub date: NaiveDate,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// A bad-debt provision record; negative amounts are reversals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadDebtProvision {
    /// Record id.
    pub id: i64,
    /// The period provisioned.
    pub period: Period,
    /// Customer scope (`0` = all customers).
    pub customer_id: i64,
    /// Signed provision amount.
    pub amount: Decimal,
    /// The provisioning voucher.
    pub voucher_id: i64,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// One aging bucket.
#[derive(Debug, Clone, Serialize)]
pub struct AgingBucket {
    /// Bucket label, e.g. `0-30`.
    pub label: &'static str,
    /// Outstanding total in the bucket.
    pub total: Decimal,
    /// Number of items in the bucket.
    pub items: usize,
}

/// Aging of outstanding balances as of a date.
#[derive(Debug, Clone, Serialize)]
pub struct AgingReport {
    /// The as-of date.
    pub as_of: NaiveDate,
    /// The four buckets, youngest first.
    pub buckets: [AgingBucket; 4],
    /// Outstanding total across buckets.
    pub total: Decimal,
}

/// Sub-ledger vs. control-account reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// The reconciled period.
    pub period: Period,
    /// Control-account closing balance.
    pub control_balance: Decimal,
    /// Sum of outstanding item balances.
    pub subledger_total: Decimal,
    /// Control minus sub-ledger.
    pub difference: Decimal,
    /// True when the difference is within tolerance.
    pub matched: bool,
}

/// Outcome of adding or settling an item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    /// The item id.
    pub item_id: i64,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Outstanding balance after the operation.
    pub outstanding: Decimal,
    /// Status after the operation.
    pub status: OpenItemStatus,
}

/// Stateless receivable/payable service.
pub struct ReceivableService;

impl ReceivableService {
    /// Books a new open item and its voucher.
    ///
    /// Receivables debit the control account against revenue; payables
    /// credit the control account against administrative expense.
    ///
    /// # Errors
    ///
    /// `DIMENSION_NOT_FOUND` for an unknown party; voucher admission
    /// errors propagate.
    pub fn add_item(
        state: &mut LedgerState,
        config: &LedgerConfig,
        side: OpenItemSide,
        party_code: &str,
        amount: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<ItemOutcome> {
        let party_id = state.dimension_id(side.party_dimension(), party_code)?;
        let amount = money::round_money(amount);

        let (control, offset) = Self::control_and_offset(config, side);
        let entries = match side {
            OpenItemSide::Receivable => vec![
                EntryDraft {
                    account: control.clone(),
                    description: description.clone(),
                    debit: amount,
                    customer: Some(party_code.to_string()),
                    ..Default::default()
                },
                EntryDraft {
                    account: offset,
                    description: description.clone(),
                    credit: amount,
                    ..Default::default()
                },
            ],
            OpenItemSide::Payable => vec![
                EntryDraft {
                    account: offset,
                    description: description.clone(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: control.clone(),
                    description: description.clone(),
                    credit: amount,
                    supplier: Some(party_code.to_string()),
                    ..Default::default()
                },
            ],
        };
        let draft = VoucherDraft {
            date,
            description: description.clone(),
            entry_type: Default::default(),
            source_event_id: None,
            entries,
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state.counters.open_item += 1;
        let item_id = state.counters.open_item;
        state.open_items.push(OpenItem {
            id: item_id,
            side,
            party_id,
            voucher_id: voucher.voucher_id,
            amount,
            settled: Decimal::ZERO,
            status: OpenItemStatus::Open,
            date,
            description,
            created_at: Utc::now(),
        });

        info!(item_id, ?side, %amount, "open item booked");
        Ok(ItemOutcome {
            item_id,
            voucher_id: voucher.voucher_id,
            outstanding: amount,
            status: OpenItemStatus::Open,
        })
    }

    /// Settles an item partially or fully.
    ///
    /// # Errors
    ///
    /// `ITEM_NOT_FOUND`, `SETTLE_EXCEEDS_OUTSTANDING`; voucher admission
    /// errors propagate.
    pub fn settle_item(
        state: &mut LedgerState,
        config: &LedgerConfig,
        item_id: i64,
        amount: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<ItemOutcome> {
        let amount = money::round_money(amount);
        let item = state
            .open_items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or(LedgerError::ItemNotFound(item_id))?;
        let outstanding = item.outstanding();
        if amount > outstanding {
            return Err(LedgerError::SettleExceedsOutstanding {
                item_id,
                amount,
                outstanding,
            });
        }

        let party_code = state
            .dimensions
            .get(&item.party_id)
            .map(|d| d.code.clone())
            .ok_or(LedgerError::DimensionNotFound {
                dim_type: item.side.party_dimension(),
                code: item.party_id.to_string(),
            })?;

        let (control, _) = Self::control_and_offset(config, item.side);
        let cash = config.accounts.bank.clone();
        let entries = match item.side {
            OpenItemSide::Receivable => vec![
                EntryDraft {
                    account: cash,
                    description: description.clone(),
                    debit: amount,
                    ..Default::default()
                },
                EntryDraft {
                    account: control,
                    description: description.clone(),
                    credit: amount,
                    customer: Some(party_code),
                    ..Default::default()
                },
            ],
            OpenItemSide::Payable => vec![
                EntryDraft {
                    account: control,
                    description: description.clone(),
                    debit: amount,
                    supplier: Some(party_code),
                    ..Default::default()
                },
                EntryDraft {
                    account: cash,
                    description: description.clone(),
                    credit: amount,
                    ..Default::default()
                },
            ],
        };
        let draft = VoucherDraft {
            date,
            description: description.or_else(|| Some(format!("Settlement of item {item_id}"))),
            entry_type: Default::default(),
            source_event_id: None,
            entries,
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state.counters.settlement += 1;
        let settlement_id = state.counters.settlement;
        state.settlements.push(Settlement {
            id: settlement_id,
            item_id,
            amount,
            voucher_id: voucher.voucher_id,
            date,
            created_at: Utc::now(),
        });

        let item = state
            .open_items
            .iter_mut()
            .find(|i| i.id == item_id)
            .expect("item existence checked above");
        item.settled += amount;
        if item.outstanding().is_zero() {
            item.status = OpenItemStatus::Settled;
        }
        let outcome = ItemOutcome {
            item_id,
            voucher_id: voucher.voucher_id,
            outstanding: item.outstanding(),
            status: item.status,
        };

        info!(item_id, %amount, outstanding = %outcome.outstanding, "item settled");
        Ok(outcome)
    }

    /// Outstanding balance of an item as of a date.
    #[must_use]
    pub fn outstanding_at(state: &LedgerState, item: &OpenItem, as_of: NaiveDate) -> Decimal {
        if item.date > as_of {
            return Decimal::ZERO;
        }
        let settled: Decimal = state
            .settlements
            .iter()
            .filter(|s| s.item_id == item.id && s.date <= as_of)
            .map(|s| s.amount)
            .sum();
        item.amount - settled
    }

    /// Ages outstanding balances into the four buckets.
    #[must_use]
    pub fn aging(
        state: &LedgerState,
        side: OpenItemSide,
        as_of: NaiveDate,
        party_code: Option<&str>,
    ) -> AgingReport {
        let party_id = party_code.and_then(|code| {
            state.dimension_id(side.party_dimension(), code).ok()
        });

        let mut buckets = [
            AgingBucket {
                label: "0-30",
                total: Decimal::ZERO,
                items: 0,
            },
            AgingBucket {
                label: "31-60",
                total: Decimal::ZERO,
                items: 0,
            },
            AgingBucket {
                label: "61-90",
                total: Decimal::ZERO,
                items: 0,
            },
            AgingBucket {
                label: ">90",
                total: Decimal::ZERO,
                items: 0,
            },
        ];

        for item in state.open_items.iter().filter(|i| i.side == side) {
            if let Some(party_id) = party_id {
                if item.party_id != party_id {
                    continue;
                }
            }
            let outstanding = Self::outstanding_at(state, item, as_of);
            if outstanding.is_zero() {
                continue;
            }
            let age = (as_of - item.date).num_days();
            let index = match age {
                0..=30 => 0,
                31..=60 => 1,
                61..=90 => 2,
                _ => 3,
            };
            buckets[index].total += outstanding;
            buckets[index].items += 1;
        }

        let total = buckets.iter().map(|b| b.total).sum();
        AgingReport {
            as_of,
            buckets,
            total,
        }
    }

    /// Provisions bad debt from aging buckets and the configured rates.
    ///
    /// The provision equals the sum of each bucket's outstanding balance
    /// times its rate, rounded; a zero provision posts nothing.
    ///
    /// # Errors
    ///
    /// Voucher admission errors propagate.
    pub fn provision_auto(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
        customer_code: Option<&str>,
    ) -> LedgerResult<Option<ItemOutcome>> {
        let as_of = period.last_day();
        let report = Self::aging(state, OpenItemSide::Receivable, as_of, customer_code);
        let amount: Decimal = report
            .buckets
            .iter()
            .zip(config.aging.bucket_rates.iter())
            .map(|(bucket, rate)| bucket.total * rate)
            .sum();
        let amount = money::round_money(amount);
        if amount.is_zero() {
            return Ok(None);
        }
        Self::provision(state, config, period, customer_code, amount).map(Some)
    }

    /// Provisions an explicit bad-debt amount.
    ///
    /// # Errors
    ///
    /// Voucher admission errors propagate.
    pub fn provision(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
        customer_code: Option<&str>,
        amount: Decimal,
    ) -> LedgerResult<ItemOutcome> {
        Self::post_provision(state, config, period, customer_code, money::round_money(amount))
    }

    /// Reverses previously provisioned bad debt.
    ///
    /// # Errors
    ///
    /// Voucher admission errors propagate.
    pub fn reverse_provision(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
        customer_code: Option<&str>,
        amount: Decimal,
    ) -> LedgerResult<ItemOutcome> {
        Self::post_provision(
            state,
            config,
            period,
            customer_code,
            -money::round_money(amount),
        )
    }

    fn post_provision(
        state: &mut LedgerState,
        config: &LedgerConfig,
        period: Period,
        customer_code: Option<&str>,
        amount: Decimal,
    ) -> LedgerResult<ItemOutcome> {
        let customer_id = match customer_code {
            Some(code) => state.dimension_id(DimensionType::Customer, code)?,
            None => 0,
        };
        let magnitude = amount.abs();
        let expense = config.accounts.impairment_loss.clone();
        let provision = config.accounts.bad_debt_provision.clone();
        let (description, entries) = if amount >= Decimal::ZERO {
            (
                format!("Bad debt provision {period}"),
                vec![
                    EntryDraft {
                        account: expense,
                        debit: magnitude,
                        ..Default::default()
                    },
                    EntryDraft {
                        account: provision,
                        credit: magnitude,
                        customer: customer_code.map(ToString::to_string),
                        ..Default::default()
                    },
                ],
            )
        } else {
            (
                format!("Bad debt provision reversal {period}"),
                vec![
                    EntryDraft {
                        account: provision,
                        debit: magnitude,
                        customer: customer_code.map(ToString::to_string),
                        ..Default::default()
                    },
                    EntryDraft {
                        account: expense,
                        credit: magnitude,
                        ..Default::default()
                    },
                ],
            )
        };

        let draft = VoucherDraft {
            date: period.last_day(),
            description: Some(description),
            entry_type: Default::default(),
            source_event_id: None,
            entries,
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state.counters.provision += 1;
        state.bad_debt_provisions.push(BadDebtProvision {
            id: state.counters.provision,
            period,
            customer_id,
            amount,
            voucher_id: voucher.voucher_id,
            created_at: Utc::now(),
        });

        info!(%period, %amount, "bad debt provision posted");
        Ok(ItemOutcome {
            item_id: state.counters.provision,
            voucher_id: voucher.voucher_id,
            outstanding: Decimal::ZERO,
            status: OpenItemStatus::Open,
        })
    }

    /// Reconciles the control account against outstanding items.
    #[must_use]
    pub fn reconcile(
        state: &LedgerState,
        config: &LedgerConfig,
        period: Period,
        side: OpenItemSide,
    ) -> ReconcileReport {
        let (control, _) = Self::control_and_offset(config, side);
        let control_balance: Decimal = crate::balance::BalanceEngine::effective_rows(state, period)
            .iter()
            .filter(|b| b.account_code == control)
            .map(|b| b.closing)
            .sum();

        let as_of = period.last_day();
        let subledger_total: Decimal = state
            .open_items
            .iter()
            .filter(|i| i.side == side)
            .map(|i| Self::outstanding_at(state, i, as_of))
            .sum();

        let difference = control_balance - subledger_total;
        ReconcileReport {
            period,
            control_balance,
            subledger_total,
            difference,
            matched: difference.abs() <= money::tolerance(),
        }
    }

    fn control_and_offset(config: &LedgerConfig, side: OpenItemSide) -> (String, String) {
        match side {
            OpenItemSide::Receivable => (
                config.accounts.receivable.clone(),
                config.accounts.revenue.clone(),
            ),
            OpenItemSide::Payable => (
                config.accounts.payable.clone(),
                config.accounts.admin_expense.clone(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;
    use rust_decimal_macros::dec;

    fn setup() -> (LedgerState, LedgerConfig) {
        let mut state = LedgerState::seeded();
        let id = state.counters.next_dimension();
        state.dimensions.insert(
            id,
            Dimension {
                id,
                dim_type: DimensionType::Customer,
                code: "C001".into(),
                name: "Acme".into(),
                parent_id: None,
                extra: None,
                is_enabled: true,
                created_at: Utc::now(),
            },
        );
        (state, LedgerConfig::default())
    }

    #[test]
    fn test_add_and_settle_receivable() {
        let (mut state, config) = setup();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let outcome = ReceivableService::add_item(
            &mut state,
            &config,
            OpenItemSide::Receivable,
            "C001",
            dec!(5000),
            date,
            Some("Invoice 1".into()),
        )
        .unwrap();
        assert_eq!(outcome.outstanding, dec!(5000));

        let settle_date = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        let partial = ReceivableService::settle_item(
            &mut state,
            &config,
            outcome.item_id,
            dec!(2000),
            settle_date,
            None,
        )
        .unwrap();
        assert_eq!(partial.outstanding, dec!(3000));
        assert_eq!(partial.status, OpenItemStatus::Open);

        let full = ReceivableService::settle_item(
            &mut state,
            &config,
            outcome.item_id,
            dec!(3000),
            settle_date,
            None,
        )
        .unwrap();
        assert_eq!(full.outstanding, Decimal::ZERO);
        assert_eq!(full.status, OpenItemStatus::Settled);

        // The control balance mirrors the sub-ledger.
        let report = ReceivableService::reconcile(
            &state,
            &config,
            "2025-01".parse().unwrap(),
            OpenItemSide::Receivable,
        );
        assert!(report.matched);
        assert_eq!(report.control_balance, Decimal::ZERO);
    }

    #[test]
    fn test_settle_exceeding_outstanding_rejected() {
        let (mut state, config) = setup();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let outcome = ReceivableService::add_item(
            &mut state,
            &config,
            OpenItemSide::Receivable,
            "C001",
            dec!(100),
            date,
            None,
        )
        .unwrap();

        assert!(matches!(
            ReceivableService::settle_item(
                &mut state,
                &config,
                outcome.item_id,
                dec!(200),
                date,
                None
            ),
            Err(LedgerError::SettleExceedsOutstanding { .. })
        ));
    }

    #[test]
    fn test_aging_buckets() {
        let (mut state, config) = setup();
        let as_of = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        // 10 days old, 45 days old, 75 days old, 120 days old.
        for (days_ago, amount) in [(10i64, 100), (45, 200), (75, 300), (120, 400)] {
            let date = as_of - chrono::Duration::days(days_ago);
            ReceivableService::add_item(
                &mut state,
                &config,
                OpenItemSide::Receivable,
                "C001",
                Decimal::from(amount),
                date,
                None,
            )
            .unwrap();
        }

        let report = ReceivableService::aging(&state, OpenItemSide::Receivable, as_of, None);
        assert_eq!(report.buckets[0].total, dec!(100));
        assert_eq!(report.buckets[1].total, dec!(200));
        assert_eq!(report.buckets[2].total, dec!(300));
        assert_eq!(report.buckets[3].total, dec!(400));
        assert_eq!(report.total, dec!(1000));
    }

    #[test]
    fn test_aging_sum_matches_control_balance() {
        let (mut state, config) = setup();
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        ReceivableService::add_item(
            &mut state,
            &config,
            OpenItemSide::Receivable,
            "C001",
            dec!(800),
            date,
            None,
        )
        .unwrap();
        ReceivableService::add_item(
            &mut state,
            &config,
            OpenItemSide::Receivable,
            "C001",
            dec!(200),
            date,
            None,
        )
        .unwrap();

        let period: Period = "2025-01".parse().unwrap();
        let report = ReceivableService::aging(
            &state,
            OpenItemSide::Receivable,
            period.last_day(),
            None,
        );
        let control: Decimal = state
            .balances_for_period(period)
            .filter(|b| b.account_code == config.accounts.receivable)
            .map(|b| b.closing)
            .sum();
        assert_eq!(report.total, control);
    }

    #[test]
    fn test_auto_provision_applies_bucket_rates() {
        let (mut state, config) = setup();
        let period: Period = "2025-01".parse().unwrap();
        // A single fresh invoice of 1000 lands in the first bucket (5%).
        ReceivableService::add_item(
            &mut state,
            &config,
            OpenItemSide::Receivable,
            "C001",
            dec!(1000),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            None,
        )
        .unwrap();

        let outcome = ReceivableService::provision_auto(&mut state, &config, period, None)
            .unwrap()
            .unwrap();
        let voucher = state.voucher(outcome.voucher_id).unwrap();
        let provision_line = voucher
            .entries
            .iter()
            .find(|e| e.account_code == config.accounts.bad_debt_provision)
            .unwrap();
        assert_eq!(provision_line.credit, dec!(50.00));
        assert_eq!(state.bad_debt_provisions.len(), 1);
    }

    #[test]
    fn test_provision_reversal_is_symmetric() {
        let (mut state, config) = setup();
        let period: Period = "2025-01".parse().unwrap();
        ReceivableService::provision(&mut state, &config, period, Some("C001"), dec!(80))
            .unwrap();
        ReceivableService::reverse_provision(&mut state, &config, period, Some("C001"), dec!(80))
            .unwrap();

        // Provision account nets to zero.
        let control: Decimal = state
            .balances_for_period(period)
            .filter(|b| b.account_code == config.accounts.bad_debt_provision)
            .map(|b| b.closing)
            .sum();
        assert_eq!(control, Decimal::ZERO);
        assert_eq!(state.bad_debt_provisions.len(), 2);
        assert_eq!(state.bad_debt_provisions[1].amount, dec!(-80));
    }

    #[test]
    fn test_add_payable() {
        let (mut state, config) = setup();
        let id = state.counters.next_dimension();
        state.dimensions.insert(
            id,
            Dimension {
                id,
                dim_type: DimensionType::Supplier,
                code: "S001".into(),
                name: "Supplies Inc".into(),
                parent_id: None,
                extra: None,
                is_enabled: true,
                created_at: Utc::now(),
            },
        );
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let outcome = ReceivableService::add_item(
            &mut state,
            &config,
            OpenItemSide::Payable,
            "S001",
            dec!(700),
            date,
            None,
        )
        .unwrap();

        let settle = ReceivableService::settle_item(
            &mut state,
            &config,
            outcome.item_id,
            dec!(700),
            date,
            None,
        )
        .unwrap();
        assert_eq!(settle.status, OpenItemStatus::Settled);

        let report = ReceivableService::reconcile(
            &state,
            &config,
            "2025-01".parse().unwrap(),
            OpenItemSide::Payable,
        );
        assert!(report.matched);
    }
}
