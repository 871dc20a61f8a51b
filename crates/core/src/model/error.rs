//! Model-mode errors.

use thiserror::Error;

use tessera_shared::error::ErrorEnvelope;

/// Errors produced by the model engine and its sub-modes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The input payload is not a JSON object.
    #[error("Input must be a JSON object")]
    NotAnObject,

    /// A required driver field is absent.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A driver field holds a non-numeric or out-of-range value.
    #[error("Invalid field {field}: {message}")]
    InvalidField {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The named field is not part of the model.
    #[error("Unknown field: {field} (supported: {supported})")]
    UnknownField {
        /// The unresolved name.
        field: String,
        /// Comma-separated supported names.
        supported: String,
    },
}

impl ModelError {
    /// Stable error code for the envelope.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotAnObject => "INVALID_JSON",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
        }
    }

    /// Converts into the structured envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.error_code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ModelError::MissingField("revenue".into()).error_code(),
            "MISSING_FIELD"
        );
        assert_eq!(
            ModelError::UnknownField {
                field: "x".into(),
                supported: "net_income".into()
            }
            .error_code(),
            "UNKNOWN_FIELD"
        );
    }
}
