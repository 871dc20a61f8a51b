//! Closing templates, voucher templates, and their expression language.

pub mod engine;
pub mod expr;
pub mod types;

pub use engine::TemplateEngine;
pub use expr::{Expr, ExprError};
pub use types::{
    ClosingRule, ClosingTemplate, EventField, SourceSelector, TemplateEntry, VoucherTemplate,
    VoucherTemplateRule,
};
