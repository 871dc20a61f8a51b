//! Model-mode five-step balancing engine.
//!
//! Consumes a driver record and produces the three statements through the
//! Financing -> Depreciation -> P&L -> Equity -> Reconcile pipeline, with
//! fixed-point iteration over the debt/interest/cash cycle. Diagnostic,
//! scenario, and explain sub-modes operate on the computed output.

pub mod diagnose;
pub mod engine;
pub mod error;
pub mod explain;
pub mod scenario;
pub mod types;

pub use diagnose::diagnose;
pub use engine::{CalcOptions, ModelEngine};
pub use error::ModelError;
pub use explain::explain;
pub use scenario::sweep;
pub use types::{CheckReport, DriverRecord, ModelOutput};
