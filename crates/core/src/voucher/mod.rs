//! Voucher store: lifecycle, admission, numbering, and red-letter voiding.

pub mod store;
pub mod types;

pub use store::{SubmitOutcome, VoidOutcome, VoucherStore};
pub use types::{
    EntryDraft, EntryKind, VoidLink, Voucher, VoucherDraft, VoucherEntry, VoucherFilter,
    VoucherStatus, VoucherTotals,
};
