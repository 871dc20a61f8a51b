//! Period status, closing, and reopening.

pub mod closing;
pub mod types;

pub use closing::PeriodEngine;
pub use types::{PeriodRecord, PeriodStatus};
