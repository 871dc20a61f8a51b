//! Inventory costing.
//!
//! Items carry a per-item costing method: moving average, FIFO over
//! receipt batches, or standard cost with an actual-vs-standard variance
//! posted on receipt. Issues that would drive stock negative are rejected
//! by default; the `allow` policy issues at last known cost, records the
//! deficit, and corrects cost on the next receipt.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use tessera_shared::{money, LedgerConfig, NegativeInventoryPolicy, Period};

use crate::error::{LedgerError, LedgerResult};
use crate::state::LedgerState;
use crate::voucher::{EntryDraft, VoucherDraft, VoucherStore};

/// Per-item costing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingMethod {
    /// Weighted average recomputed on every receipt.
    #[default]
    MovingAverage,
    /// Oldest receipt batches are consumed first.
    Fifo,
    /// Issues at standard cost; receipts post the variance.
    Standard,
}

/// An inventory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Stock-keeping unit.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Unit of measure.
    pub unit: String,
    /// Costing method.
    #[serde(default)]
    pub method: CostingMethod,
    /// Standard unit cost (standard costing only).
    pub standard_cost: Option<Decimal>,
    /// Quantity issued while stock was negative, awaiting correction.
    pub pending_qty: Decimal,
    /// Unit cost the pending quantity was issued at.
    pub pending_unit_cost: Decimal,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// A receipt batch (FIFO lineage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryBatch {
    /// Batch id.
    pub id: i64,
    /// The SKU received.
    pub sku: String,
    /// Receipt date.
    pub date: NaiveDate,
    /// Quantity received.
    pub qty: Decimal,
    /// Quantity not yet consumed.
    pub remaining_qty: Decimal,
    /// Unit cost.
    pub unit_cost: Decimal,
    /// Total cost.
    pub total_cost: Decimal,
}

/// Movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Receipt.
    In,
    /// Issue.
    Out,
}

/// One inventory movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMove {
    /// Move id.
    pub id: i64,
    /// The SKU moved.
    pub sku: String,
    /// Receipt or issue.
    pub direction: MoveDirection,
    /// Quantity moved.
    pub qty: Decimal,
    /// Unit cost applied.
    pub unit_cost: Decimal,
    /// Total cost applied.
    pub total_cost: Decimal,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Movement date.
    pub date: NaiveDate,
    /// Quantity issued beyond stock (allow policy only).
    pub deficit_qty: Decimal,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// Serial tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialStatus {
    /// On hand.
    In,
    /// Issued.
    Out,
}

/// One tracked serial number, unique across the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySerial {
    /// The serial number.
    pub serial_no: String,
    /// The SKU it belongs to.
    pub sku: String,
    /// On hand or issued.
    pub status: SerialStatus,
    /// The receipt movement that brought it in.
    pub move_in_id: i64,
    /// The issue movement that took it out, if any.
    pub move_out_id: Option<i64>,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A physical count and its adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryCount {
    /// Count id.
    pub id: i64,
    /// The SKU counted.
    pub sku: String,
    /// Count date.
    pub date: NaiveDate,
    /// Book quantity at the count.
    pub book_qty: Decimal,
    /// Counted quantity.
    pub counted_qty: Decimal,
    /// Counted minus book.
    pub diff_qty: Decimal,
    /// The adjustment voucher, when a difference was posted.
    pub voucher_id: Option<i64>,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// Outcome of a receipt or issue.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    /// The movement record.
    pub move_id: i64,
    /// The voucher posted.
    pub voucher_id: i64,
    /// Quantity moved.
    pub qty: Decimal,
    /// Unit cost applied.
    pub unit_cost: Decimal,
    /// Total cost applied (cost of goods for issues).
    pub total_cost: Decimal,
    /// On-hand quantity after the move.
    pub on_hand_qty: Decimal,
    /// On-hand amount after the move.
    pub on_hand_amount: Decimal,
    /// Cost correction posted for earlier negative issues, if any.
    pub correction: Option<Decimal>,
}

/// On-hand position of one SKU.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryPosition {
    /// The SKU.
    pub sku: String,
    /// On-hand quantity.
    pub qty: Decimal,
    /// On-hand amount.
    pub amount: Decimal,
    /// Average unit cost (zero when empty).
    pub unit_cost: Decimal,
}

/// Stateless inventory service.
pub struct InventoryService;

impl InventoryService {
    /// Registers an item (no posting).
    pub fn add_item(
        state: &mut LedgerState,
        sku: &str,
        name: &str,
        unit: &str,
        method: CostingMethod,
        standard_cost: Option<Decimal>,
    ) {
        state
            .inventory_items
            .entry(sku.to_string())
            .or_insert_with(|| InventoryItem {
                sku: sku.to_string(),
                name: name.to_string(),
                unit: unit.to_string(),
                method,
                standard_cost,
                pending_qty: Decimal::ZERO,
                pending_unit_cost: Decimal::ZERO,
                created_at: Utc::now(),
            });
    }

    /// Receives stock.
    ///
    /// Posts inventory against bank; under standard costing the inventory
    /// leg posts at standard and the difference lands on the variance
    /// account. A pending negative-issue deficit is corrected against cost
    /// of sales at the new receipt cost.
    ///
    /// # Errors
    ///
    /// `SKU_NOT_FOUND` when the item is not registered and no name was
    /// given; voucher admission errors propagate.
    #[allow(clippy::too_many_arguments)]
    pub fn receive(
        state: &mut LedgerState,
        config: &LedgerConfig,
        sku: &str,
        qty: Decimal,
        unit_cost: Decimal,
        date: NaiveDate,
        description: Option<String>,
        name: Option<&str>,
    ) -> LedgerResult<MoveOutcome> {
        if !state.inventory_items.contains_key(sku) {
            match name {
                Some(name) => Self::add_item(
                    state,
                    sku,
                    name,
                    "unit",
                    CostingMethod::MovingAverage,
                    None,
                ),
                None => return Err(LedgerError::SkuNotFound(sku.to_string())),
            }
        }
        let item = state.inventory_items.get(sku).cloned().expect("just ensured");
        let unit_cost = money::round_rate(unit_cost);
        let actual_total = money::round_money(qty * unit_cost);

        // Standard costing books inventory at standard and posts the
        // difference to the variance account.
        let (inventory_amount, variance) = match item.method {
            CostingMethod::Standard => {
                let standard = item.standard_cost.unwrap_or(unit_cost);
                let standard_total = money::round_money(qty * standard);
                (standard_total, standard_total - actual_total)
            }
            _ => (actual_total, Decimal::ZERO),
        };

        let mut entries = vec![EntryDraft {
            account: config.accounts.inventory.clone(),
            description: description.clone(),
            debit: inventory_amount,
            ..Default::default()
        }];
        if !variance.is_zero() {
            // Favorable variance (standard above actual) credits the
            // variance account; unfavorable debits it.
            entries.push(EntryDraft {
                account: config.inventory.variance_account.clone(),
                description: Some("Standard cost variance".into()),
                debit: if variance < Decimal::ZERO {
                    -variance
                } else {
                    Decimal::ZERO
                },
                credit: if variance > Decimal::ZERO {
                    variance
                } else {
                    Decimal::ZERO
                },
                ..Default::default()
            });
        }
        entries.push(EntryDraft {
            account: config.accounts.bank.clone(),
            description: description.clone(),
            credit: actual_total,
            ..Default::default()
        });

        let draft = VoucherDraft {
            date,
            description: description.or_else(|| Some(format!("Receipt {sku}"))),
            entry_type: Default::default(),
            source_event_id: None,
            entries,
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        // Lineage carries what the inventory account carries: standard
        // cost under standard costing, actual cost otherwise.
        let book_unit_cost = if qty.is_zero() {
            unit_cost
        } else {
            inventory_amount / qty
        };
        state.counters.inventory_batch += 1;
        state.inventory_batches.push(InventoryBatch {
            id: state.counters.inventory_batch,
            sku: sku.to_string(),
            date,
            qty,
            remaining_qty: qty,
            unit_cost: book_unit_cost,
            total_cost: inventory_amount,
        });
        state.counters.inventory_move += 1;
        let move_id = state.counters.inventory_move;
        state.inventory_moves.push(InventoryMove {
            id: move_id,
            sku: sku.to_string(),
            direction: MoveDirection::In,
            qty,
            unit_cost: book_unit_cost,
            total_cost: inventory_amount,
            voucher_id: voucher.voucher_id,
            date,
            deficit_qty: Decimal::ZERO,
            created_at: Utc::now(),
        });

        // Correct earlier negative issues now that a real cost is known.
        let mut correction = None;
        let item = state.inventory_items.get(sku).cloned().expect("present");
        if item.pending_qty > Decimal::ZERO {
            let delta =
                money::round_money(item.pending_qty * (unit_cost - item.pending_unit_cost));
            if !delta.is_zero() {
                let (debit_account, credit_account, amount) = if delta > Decimal::ZERO {
                    (
                        config.accounts.cost_of_sales.clone(),
                        config.accounts.inventory.clone(),
                        delta,
                    )
                } else {
                    (
                        config.accounts.inventory.clone(),
                        config.accounts.cost_of_sales.clone(),
                        -delta,
                    )
                };
                let draft = VoucherDraft {
                    date,
                    description: Some(format!("Cost correction {sku}")),
                    entry_type: Default::default(),
                    source_event_id: None,
                    entries: vec![
                        EntryDraft {
                            account: debit_account,
                            debit: amount,
                            ..Default::default()
                        },
                        EntryDraft {
                            account: credit_account,
                            credit: amount,
                            ..Default::default()
                        },
                    ],
                };
                let correction_voucher = VoucherStore::submit(state, &draft, true)?;
                // Mirror the monetary correction in the movement lineage so
                // the sub-ledger value tracks the control account.
                state.counters.inventory_move += 1;
                state.inventory_moves.push(InventoryMove {
                    id: state.counters.inventory_move,
                    sku: sku.to_string(),
                    direction: if delta > Decimal::ZERO {
                        MoveDirection::Out
                    } else {
                        MoveDirection::In
                    },
                    qty: Decimal::ZERO,
                    unit_cost: Decimal::ZERO,
                    total_cost: delta.abs(),
                    voucher_id: correction_voucher.voucher_id,
                    date,
                    deficit_qty: Decimal::ZERO,
                    created_at: Utc::now(),
                });
                correction = Some(delta);
            }
            // The deficit units were already issued; consume them from the
            // batch that just arrived so lineage matches on-hand quantity.
            let consumed = item.pending_qty.min(qty);
            if let Some(batch) = state
                .inventory_batches
                .iter_mut()
                .rev()
                .find(|b| b.sku == sku)
            {
                batch.remaining_qty -= consumed;
            }
            let item = state.inventory_items.get_mut(sku).expect("present");
            item.pending_qty = Decimal::ZERO;
            item.pending_unit_cost = Decimal::ZERO;
        }

        let position = Self::position(state, sku, None);
        info!(sku, %qty, %unit_cost, "inventory received");
        Ok(MoveOutcome {
            move_id,
            voucher_id: voucher.voucher_id,
            qty,
            unit_cost,
            total_cost: actual_total,
            on_hand_qty: position.qty,
            on_hand_amount: position.amount,
            correction,
        })
    }

    /// Issues stock at the item's costing method.
    ///
    /// # Errors
    ///
    /// `SKU_NOT_FOUND`; `NEGATIVE_INVENTORY` under the reject policy;
    /// voucher admission errors propagate.
    pub fn issue(
        state: &mut LedgerState,
        config: &LedgerConfig,
        sku: &str,
        qty: Decimal,
        date: NaiveDate,
        description: Option<String>,
    ) -> LedgerResult<MoveOutcome> {
        let item = state
            .inventory_items
            .get(sku)
            .cloned()
            .ok_or_else(|| LedgerError::SkuNotFound(sku.to_string()))?;

        let position = Self::position(state, sku, None);
        let available = position.qty;
        let deficit = (qty - available).max(Decimal::ZERO);
        if !deficit.is_zero() && config.inventory.negative_policy == NegativeInventoryPolicy::Reject
        {
            return Err(LedgerError::NegativeInventory {
                sku: sku.to_string(),
                requested: qty,
                available,
            });
        }

        let (cost, issue_unit_cost) = match item.method {
            CostingMethod::MovingAverage => {
                let unit = position.unit_cost;
                (money::round_money(qty * unit), unit)
            }
            CostingMethod::Standard => {
                let unit = item.standard_cost.unwrap_or(position.unit_cost);
                (money::round_money(qty * unit), unit)
            }
            CostingMethod::Fifo => {
                let covered = qty - deficit;
                let mut remaining = covered;
                let mut cost = Decimal::ZERO;
                let mut last_unit = position.unit_cost;
                for batch in state
                    .inventory_batches
                    .iter_mut()
                    .filter(|b| b.sku == sku && b.remaining_qty > Decimal::ZERO)
                {
                    if remaining.is_zero() {
                        break;
                    }
                    let take = remaining.min(batch.remaining_qty);
                    cost += take * batch.unit_cost;
                    batch.remaining_qty -= take;
                    remaining -= take;
                    last_unit = batch.unit_cost;
                }
                // A deficit issues at the last known batch cost.
                cost += deficit * last_unit;
                let unit = if qty.is_zero() {
                    Decimal::ZERO
                } else {
                    cost / qty
                };
                (money::round_money(cost), unit)
            }
        };

        // Non-FIFO deficits also consume at the cost just computed.
        if !deficit.is_zero() {
            let item = state.inventory_items.get_mut(sku).expect("present");
            item.pending_qty += deficit;
            item.pending_unit_cost = issue_unit_cost;
        }
        // Consume batches for non-FIFO methods too, so batch lineage stays
        // aligned with on-hand quantity.
        if item.method != CostingMethod::Fifo {
            let mut remaining = qty - deficit;
            for batch in state
                .inventory_batches
                .iter_mut()
                .filter(|b| b.sku == sku && b.remaining_qty > Decimal::ZERO)
            {
                if remaining.is_zero() {
                    break;
                }
                let take = remaining.min(batch.remaining_qty);
                batch.remaining_qty -= take;
                remaining -= take;
            }
        }

        let draft = VoucherDraft {
            date,
            description: description.or_else(|| Some(format!("Issue {sku}"))),
            entry_type: Default::default(),
            source_event_id: None,
            entries: vec![
                EntryDraft {
                    account: config.accounts.cost_of_sales.clone(),
                    debit: cost,
                    ..Default::default()
                },
                EntryDraft {
                    account: config.accounts.inventory.clone(),
                    credit: cost,
                    ..Default::default()
                },
            ],
        };
        let voucher = VoucherStore::submit(state, &draft, true)?;

        state.counters.inventory_move += 1;
        let move_id = state.counters.inventory_move;
        state.inventory_moves.push(InventoryMove {
            id: move_id,
            sku: sku.to_string(),
            direction: MoveDirection::Out,
            qty,
            unit_cost: issue_unit_cost,
            total_cost: cost,
            voucher_id: voucher.voucher_id,
            date,
            deficit_qty: deficit,
            created_at: Utc::now(),
        });

        let position = Self::position(state, sku, None);
        info!(sku, %qty, cost = %cost, "inventory issued");
        Ok(MoveOutcome {
            move_id,
            voucher_id: voucher.voucher_id,
            qty,
            unit_cost: issue_unit_cost,
            total_cost: cost,
            on_hand_qty: position.qty,
            on_hand_amount: position.amount,
            correction: None,
        })
    }

    /// Registers serial numbers against a receipt movement.
    ///
    /// # Errors
    ///
    /// `MOVE_NOT_FOUND` for an unknown or non-receipt movement,
    /// `SERIAL_EXISTS` for a duplicate serial number,
    /// `SERIAL_COUNT_EXCEEDS_MOVE` when the movement cannot hold that many
    /// serials.
    pub fn register_serials(
        state: &mut LedgerState,
        move_id: i64,
        serial_nos: &[String],
    ) -> LedgerResult<usize> {
        let movement = state
            .inventory_moves
            .iter()
            .find(|m| m.id == move_id && m.direction == MoveDirection::In)
            .cloned()
            .ok_or(LedgerError::MoveNotFound(move_id))?;

        let assigned = state
            .inventory_serials
            .iter()
            .filter(|s| s.move_in_id == move_id)
            .count();
        let capacity = movement.qty.trunc().to_usize().unwrap_or(0);
        if assigned + serial_nos.len() > capacity {
            return Err(LedgerError::SerialCountExceedsMove {
                move_id,
                count: assigned + serial_nos.len(),
                qty: movement.qty,
            });
        }
        for serial_no in serial_nos {
            if state.inventory_serials.iter().any(|s| &s.serial_no == serial_no) {
                return Err(LedgerError::SerialExists(serial_no.clone()));
            }
        }

        for serial_no in serial_nos {
            state.inventory_serials.push(InventorySerial {
                serial_no: serial_no.clone(),
                sku: movement.sku.clone(),
                status: SerialStatus::In,
                move_in_id: move_id,
                move_out_id: None,
                created_at: Utc::now(),
                updated_at: None,
            });
        }
        Ok(serial_nos.len())
    }

    /// Marks serial numbers issued against an issue movement.
    ///
    /// # Errors
    ///
    /// `MOVE_NOT_FOUND` for an unknown or non-issue movement,
    /// `SERIAL_NOT_AVAILABLE` when a serial is unknown, belongs to another
    /// SKU, or is already out.
    pub fn issue_serials(
        state: &mut LedgerState,
        move_id: i64,
        serial_nos: &[String],
    ) -> LedgerResult<usize> {
        let movement = state
            .inventory_moves
            .iter()
            .find(|m| m.id == move_id && m.direction == MoveDirection::Out)
            .cloned()
            .ok_or(LedgerError::MoveNotFound(move_id))?;

        for serial_no in serial_nos {
            let available = state.inventory_serials.iter().any(|s| {
                &s.serial_no == serial_no
                    && s.sku == movement.sku
                    && s.status == SerialStatus::In
            });
            if !available {
                return Err(LedgerError::SerialNotAvailable(serial_no.clone()));
            }
        }

        for serial_no in serial_nos {
            let serial = state
                .inventory_serials
                .iter_mut()
                .find(|s| &s.serial_no == serial_no)
                .expect("availability checked above");
            serial.status = SerialStatus::Out;
            serial.move_out_id = Some(move_id);
            serial.updated_at = Some(Utc::now());
        }
        Ok(serial_nos.len())
    }

    /// Serial numbers on hand for a SKU.
    #[must_use]
    pub fn serials_on_hand<'a>(state: &'a LedgerState, sku: &str) -> Vec<&'a InventorySerial> {
        state
            .inventory_serials
            .iter()
            .filter(|s| s.sku == sku && s.status == SerialStatus::In)
            .collect()
    }

    /// Records a physical count, posting an adjustment voucher for the
    /// difference.
    ///
    /// # Errors
    ///
    /// `SKU_NOT_FOUND`; voucher admission errors propagate.
    pub fn count(
        state: &mut LedgerState,
        config: &LedgerConfig,
        sku: &str,
        counted_qty: Decimal,
        date: NaiveDate,
    ) -> LedgerResult<InventoryCount> {
        if !state.inventory_items.contains_key(sku) {
            return Err(LedgerError::SkuNotFound(sku.to_string()));
        }
        let position = Self::position(state, sku, Some(date));
        let diff_qty = counted_qty - position.qty;
        let amount = money::round_money(diff_qty.abs() * position.unit_cost);

        let voucher_id = if amount.is_zero() {
            None
        } else {
            let (debit_account, credit_account) = if diff_qty > Decimal::ZERO {
                // Overage: book the found stock.
                (
                    config.accounts.inventory.clone(),
                    config.accounts.admin_expense.clone(),
                )
            } else {
                // Shortage: expense the missing stock.
                (
                    config.accounts.admin_expense.clone(),
                    config.accounts.inventory.clone(),
                )
            };
            let draft = VoucherDraft {
                date,
                description: Some(format!("Count adjustment {sku}")),
                entry_type: Default::default(),
                source_event_id: None,
                entries: vec![
                    EntryDraft {
                        account: debit_account,
                        debit: amount,
                        ..Default::default()
                    },
                    EntryDraft {
                        account: credit_account,
                        credit: amount,
                        ..Default::default()
                    },
                ],
            };
            Some(VoucherStore::submit(state, &draft, true)?.voucher_id)
        };

        // Align batch lineage with the counted quantity.
        if diff_qty > Decimal::ZERO {
            state.counters.inventory_batch += 1;
            state.inventory_batches.push(InventoryBatch {
                id: state.counters.inventory_batch,
                sku: sku.to_string(),
                date,
                qty: diff_qty,
                remaining_qty: diff_qty,
                unit_cost: position.unit_cost,
                total_cost: money::round_money(diff_qty * position.unit_cost),
            });
        } else if diff_qty < Decimal::ZERO {
            let mut remaining = -diff_qty;
            for batch in state
                .inventory_batches
                .iter_mut()
                .filter(|b| b.sku == sku && b.remaining_qty > Decimal::ZERO)
            {
                if remaining.is_zero() {
                    break;
                }
                let take = remaining.min(batch.remaining_qty);
                batch.remaining_qty -= take;
                remaining -= take;
            }
        }

        state.counters.inventory_count += 1;
        let record = InventoryCount {
            id: state.counters.inventory_count,
            sku: sku.to_string(),
            date,
            book_qty: position.qty,
            counted_qty,
            diff_qty,
            voucher_id,
            created_at: Utc::now(),
        };
        state.inventory_counts.push(record.clone());
        Ok(record)
    }

    /// On-hand position of a SKU, optionally as of a date.
    #[must_use]
    pub fn position(state: &LedgerState, sku: &str, as_of: Option<NaiveDate>) -> InventoryPosition {
        let mut qty = Decimal::ZERO;
        let mut amount = Decimal::ZERO;
        for movement in state
            .inventory_moves
            .iter()
            .filter(|m| m.sku == sku && as_of.map_or(true, |d| m.date <= d))
        {
            match movement.direction {
                MoveDirection::In => {
                    qty += movement.qty;
                    amount += movement.total_cost;
                }
                MoveDirection::Out => {
                    qty -= movement.qty;
                    amount -= movement.total_cost;
                }
            }
        }
        // Count adjustments change book quantity through batch lineage.
        for count in state
            .inventory_counts
            .iter()
            .filter(|c| c.sku == sku && as_of.map_or(true, |d| c.date <= d))
        {
            if !count.diff_qty.is_zero() {
                let unit = if qty.is_zero() {
                    Decimal::ZERO
                } else {
                    amount / qty
                };
                qty += count.diff_qty;
                amount += money::round_money(count.diff_qty * unit);
            }
        }
        let unit_cost = if qty.is_zero() {
            Decimal::ZERO
        } else {
            amount / qty
        };
        InventoryPosition {
            sku: sku.to_string(),
            qty,
            amount: money::round_money(amount),
            unit_cost,
        }
    }

    /// Reconciles the inventory control account against sub-ledger value.
    #[must_use]
    pub fn reconcile(
        state: &LedgerState,
        config: &LedgerConfig,
        period: Period,
    ) -> super::receivable::ReconcileReport {
        let control_balance: Decimal = crate::balance::BalanceEngine::effective_rows(state, period)
            .iter()
            .filter(|b| b.account_code == config.accounts.inventory)
            .map(|b| b.closing)
            .sum();
        let as_of = period.last_day();
        let subledger_total: Decimal = state
            .inventory_items
            .keys()
            .map(|sku| Self::position(state, sku, Some(as_of)).amount)
            .sum();
        let difference = control_balance - subledger_total;
        super::receivable::ReconcileReport {
            period,
            control_balance,
            subledger_total,
            difference,
            matched: difference.abs() <= money::tolerance(),
        }
    }
}
