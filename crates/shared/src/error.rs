//! Structured error envelope for the external surface.
//!
//! Every failed operation is reported as `{error: true, code, message,
//! details}`. Domain errors implement `error_code()` and convert into this
//! envelope at the boundary; the codes are stable and part of the contract.

use serde::Serialize;
use serde_json::Value;

/// The wire shape of a failed operation.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    /// Always `true`; distinguishes the envelope from a success payload.
    pub error: bool,
    /// Stable machine-readable error code, e.g. `NOT_BALANCED`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Optional structured context (ids, totals, field names).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    /// Creates an envelope without details.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serializes_without_details() {
        let envelope = ErrorEnvelope::new("NOT_BALANCED", "Debits do not equal credits");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["error"], json!(true));
        assert_eq!(value["code"], json!("NOT_BALANCED"));
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_envelope_serializes_with_details() {
        let envelope = ErrorEnvelope::new("NOT_BALANCED", "Debits do not equal credits")
            .with_details(json!({"debit_total": "100.00", "credit_total": "90.00"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["details"]["debit_total"], json!("100.00"));
    }
}
