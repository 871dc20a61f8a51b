//! The persisted ledger state.
//!
//! One `LedgerState` is the entire content of a ledger file: the chart,
//! dimensions, vouchers, the derived balance index, periods, templates,
//! sub-ledger tables, and currency data. The persistence layer serializes
//! it as a single document of row-oriented tables; the facade in
//! [`crate::ledger`] guarantees each top-level operation mutates it
//! atomically.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tessera_shared::Period;

use crate::balance::{Balance, BalanceKey};
use crate::chart::{seed, Account};
use crate::dimension::{Dimension, DimensionType, DIMENSION_NONE};
use crate::error::{LedgerError, LedgerResult};
use crate::fx::{Currency, ExchangeRate};
use crate::period::{PeriodRecord, PeriodStatus};
use crate::subledger::{
    BadDebtProvision, CipProject, CipTransfer, DepreciationRecord, FixedAsset, ImpairmentRecord,
    InventoryBatch, InventoryCount, InventoryItem, InventoryMove, InventorySerial, OpenItem,
    Settlement,
};
use crate::template::{ClosingTemplate, VoucherTemplate};
use crate::template::types::VoucherEvent;
use crate::voucher::{VoidLink, Voucher};

/// Monotonic id counters. Ids are never reused, even after deletes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    /// Next voucher id.
    pub voucher: i64,
    /// Next dimension id (`0` is the absent sentinel).
    pub dimension: i64,
    /// Next open-item id.
    pub open_item: i64,
    /// Next settlement id.
    pub settlement: i64,
    /// Next bad-debt provision id.
    pub provision: i64,
    /// Next inventory batch id.
    pub inventory_batch: i64,
    /// Next inventory move id.
    pub inventory_move: i64,
    /// Next inventory count id.
    pub inventory_count: i64,
    /// Next fixed-asset id.
    pub fixed_asset: i64,
    /// Next depreciation record id.
    pub depreciation: i64,
    /// Next impairment record id.
    pub impairment: i64,
    /// Next CIP project id.
    pub cip_project: i64,
    /// Next CIP transfer id.
    pub cip_transfer: i64,
}

impl Counters {
    fn next(field: &mut i64) -> i64 {
        *field += 1;
        *field
    }

    /// Allocates the next voucher id.
    pub fn next_voucher(&mut self) -> i64 {
        Self::next(&mut self.voucher)
    }

    /// Allocates the next dimension id.
    pub fn next_dimension(&mut self) -> i64 {
        Self::next(&mut self.dimension)
    }
}

/// The whole ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    /// Chart of accounts, keyed by code.
    pub accounts: BTreeMap<String, Account>,
    /// Dimension values, keyed by id.
    pub dimensions: BTreeMap<i64, Dimension>,
    /// Vouchers with their entries, keyed by id.
    pub vouchers: BTreeMap<i64, Voucher>,
    /// Per-day voucher number sequences; never rewound.
    pub voucher_day_seq: BTreeMap<NaiveDate, u32>,
    /// The derived balance index.
    pub balances: Vec<Balance>,
    /// Period records.
    pub periods: BTreeMap<Period, PeriodRecord>,
    /// Red-letter reversal links.
    pub void_links: Vec<VoidLink>,
    /// Closing templates, keyed by code.
    pub closing_templates: BTreeMap<String, ClosingTemplate>,
    /// Voucher templates, keyed by code.
    pub voucher_templates: BTreeMap<String, VoucherTemplate>,
    /// Processed events, keyed by event id.
    pub voucher_events: BTreeMap<String, VoucherEvent>,
    /// Registered currencies, keyed by code.
    pub currencies: BTreeMap<String, Currency>,
    /// Exchange-rate observations.
    pub exchange_rates: Vec<ExchangeRate>,
    /// Receivable/payable open items.
    pub open_items: Vec<OpenItem>,
    /// Settlements against open items.
    pub settlements: Vec<Settlement>,
    /// Bad-debt provisions (negative amount = reversal).
    pub bad_debt_provisions: Vec<BadDebtProvision>,
    /// Inventory items, keyed by SKU.
    pub inventory_items: BTreeMap<String, InventoryItem>,
    /// Receipt batches for FIFO costing.
    pub inventory_batches: Vec<InventoryBatch>,
    /// Inventory movements.
    pub inventory_moves: Vec<InventoryMove>,
    /// Inventory count records.
    pub inventory_counts: Vec<InventoryCount>,
    /// Tracked serial numbers.
    #[serde(default)]
    pub inventory_serials: Vec<InventorySerial>,
    /// Fixed-asset cards, keyed by id.
    pub fixed_assets: BTreeMap<i64, FixedAsset>,
    /// Monthly depreciation records.
    pub depreciations: Vec<DepreciationRecord>,
    /// Impairments and reversals.
    pub impairments: Vec<ImpairmentRecord>,
    /// Construction-in-progress projects, keyed by id.
    pub cip_projects: BTreeMap<i64, CipProject>,
    /// CIP-to-asset transfers.
    pub cip_transfers: Vec<CipTransfer>,
    /// Id counters.
    pub counters: Counters,
}

impl LedgerState {
    /// A fresh ledger with the standard chart seeded.
    #[must_use]
    pub fn seeded() -> Self {
        let mut state = Self::default();
        for account in seed::standard_accounts() {
            state.accounts.insert(account.code.clone(), account);
        }
        state
    }

    // ========== Accounts ==========

    /// Resolves an enabled account by code.
    ///
    /// # Errors
    ///
    /// `ACCOUNT_NOT_FOUND` when absent, `ACCOUNT_DISABLED` when disabled.
    pub fn account(&self, code: &str) -> LedgerResult<&Account> {
        let account = self
            .accounts
            .get(code)
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))?;
        if !account.is_enabled {
            return Err(LedgerError::AccountDisabled(code.to_string()));
        }
        Ok(account)
    }

    /// Resolves an account by code regardless of the enabled flag.
    ///
    /// # Errors
    ///
    /// `ACCOUNT_NOT_FOUND` when absent.
    pub fn account_any(&self, code: &str) -> LedgerResult<&Account> {
        self.accounts
            .get(code)
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    // ========== Dimensions ==========

    /// Resolves an enabled dimension value to its id.
    ///
    /// # Errors
    ///
    /// `DIMENSION_NOT_FOUND` when absent or disabled.
    pub fn dimension_id(&self, dim_type: DimensionType, code: &str) -> LedgerResult<i64> {
        self.dimensions
            .values()
            .find(|d| d.dim_type == dim_type && d.code == code && d.is_enabled)
            .map(|d| d.id)
            .ok_or_else(|| LedgerError::DimensionNotFound {
                dim_type,
                code: code.to_string(),
            })
    }

    /// Verifies that a dimension id exists and is enabled. The sentinel
    /// `0` always passes.
    ///
    /// # Errors
    ///
    /// `DIMENSION_NOT_FOUND` otherwise.
    pub fn check_dimension(&self, dim_type: DimensionType, id: i64) -> LedgerResult<()> {
        if id == DIMENSION_NONE {
            return Ok(());
        }
        match self.dimensions.get(&id) {
            Some(d) if d.dim_type == dim_type && d.is_enabled => Ok(()),
            _ => Err(LedgerError::DimensionNotFound {
                dim_type,
                code: id.to_string(),
            }),
        }
    }

    // ========== Vouchers ==========

    /// Fetches a voucher.
    ///
    /// # Errors
    ///
    /// `VOUCHER_NOT_FOUND` when absent.
    pub fn voucher(&self, id: i64) -> LedgerResult<&Voucher> {
        self.vouchers
            .get(&id)
            .ok_or(LedgerError::VoucherNotFound(id))
    }

    /// Fetches a voucher mutably.
    ///
    /// # Errors
    ///
    /// `VOUCHER_NOT_FOUND` when absent.
    pub fn voucher_mut(&mut self, id: i64) -> LedgerResult<&mut Voucher> {
        self.vouchers
            .get_mut(&id)
            .ok_or(LedgerError::VoucherNotFound(id))
    }

    /// Allocates the next voucher number for a date: `V<YYYYMMDD><seq>`,
    /// with a per-day sequence that is never reused.
    pub fn next_voucher_no(&mut self, date: NaiveDate) -> String {
        let seq = self.voucher_day_seq.entry(date).or_insert(0);
        *seq += 1;
        format!("V{}{:03}", date.format("%Y%m%d"), seq)
    }

    // ========== Periods ==========

    /// The period record, creating it open if this is the first touch.
    pub fn ensure_period(&mut self, period: Period) -> &mut PeriodRecord {
        self.periods
            .entry(period)
            .or_insert_with(|| PeriodRecord::open(period))
    }

    /// The status of a period; untouched periods are implicitly open.
    #[must_use]
    pub fn period_status(&self, period: Period) -> PeriodStatus {
        self.periods
            .get(&period)
            .map_or(PeriodStatus::Open, |p| p.status)
    }

    // ========== Balances ==========

    /// Index of the balance row with the given key.
    #[must_use]
    pub fn balance_position(&self, key: &BalanceKey) -> Option<usize> {
        self.balances.iter().position(|b| {
            b.account_code == key.account_code && b.period == key.period && b.dims == key.dims
        })
    }

    /// The balance row with the given key.
    #[must_use]
    pub fn balance(&self, key: &BalanceKey) -> Option<&Balance> {
        self.balance_position(key).map(|i| &self.balances[i])
    }

    /// All balance rows of a period.
    pub fn balances_for_period(&self, period: Period) -> impl Iterator<Item = &Balance> {
        self.balances.iter().filter(move |b| b.period == period)
    }
}
