//! Sub-ledgers: receivables/payables, inventory, and fixed assets.
//!
//! Each sub-ledger owns its quantity and cost lineage and translates every
//! business operation into balanced vouchers submitted through the voucher
//! store, which remains the authority for monetary postings.

pub mod fixed_asset;
pub mod inventory;
pub mod receivable;

pub use fixed_asset::{
    AssetService, CipProject, CipTransfer, DepreciationMethod, DepreciationRecord, DisposalOutcome,
    FixedAsset, ImpairmentRecord,
};
pub use inventory::{
    CostingMethod, InventoryBatch, InventoryCount, InventoryItem, InventoryMove, InventorySerial,
    InventoryService, MoveDirection, SerialStatus,
};
pub use receivable::{
    AgingBucket, AgingReport, BadDebtProvision, OpenItem, OpenItemSide, OpenItemStatus,
    ReceivableService, ReconcileReport, Settlement,
};
