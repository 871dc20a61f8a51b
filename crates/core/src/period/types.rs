//! Period record types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_shared::Period;

use crate::voucher::EntryKind;

/// Period posting status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// All postings admitted.
    Open,
    /// Only adjustment vouchers admitted.
    Adjustment,
    /// No postings admitted.
    Closed,
}

impl PeriodStatus {
    /// Returns true if a voucher of the given kind may post.
    #[must_use]
    pub fn admits(&self, kind: EntryKind) -> bool {
        match self {
            Self::Open => true,
            Self::Adjustment => kind == EntryKind::Adjustment,
            Self::Closed => false,
        }
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Adjustment => "adjustment",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Stored state of one accounting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// The period.
    pub period: Period,
    /// Current status.
    pub status: PeriodStatus,
    /// When the period was first opened.
    pub opened_at: Option<DateTime<Utc>>,
    /// When the period was last closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Closing vouchers emitted by templates, keyed by template code.
    /// Cleared on reopen; used for idempotency and symmetric reversal.
    #[serde(default)]
    pub closing_vouchers: Vec<(String, i64)>,
}

impl PeriodRecord {
    /// A freshly opened period.
    #[must_use]
    pub fn open(period: Period) -> Self {
        Self {
            period,
            status: PeriodStatus::Open,
            opened_at: Some(Utc::now()),
            closed_at: None,
            closing_vouchers: Vec::new(),
        }
    }

    /// Returns true if a template has already closed into this period.
    #[must_use]
    pub fn has_closing_for(&self, template_code: &str) -> bool {
        self.closing_vouchers.iter().any(|(code, _)| code == template_code)
    }
}
