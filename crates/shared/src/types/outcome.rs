//! Structured results returned across the ledger's operation boundary.
//!
//! Write operations never surface a bare error to their caller. They return an
//! [`OperationResult`] whose [`FailureKind`] lets the caller tell a
//! user-correctable validation failure apart from a retryable conflict or a
//! fatal system fault.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broad classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad input shape or value; the user can fix it.
    Validation,
    /// A business rule refused the operation (e.g. insufficient balance).
    BusinessRule,
    /// A referenced entity does not exist for this tenant.
    NotFound,
    /// Concurrent modification; retrying may succeed.
    Conflict,
    /// Storage or internal failure.
    System,
}

impl FailureKind {
    /// Returns true if the user can correct the input and try again.
    #[must_use]
    pub const fn is_user_correctable(self) -> bool {
        matches!(self, Self::Validation | Self::BusinessRule | Self::NotFound)
    }

    /// Returns true if the same request may succeed when retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Conflict)
    }
}

/// A single field-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The offending input field, or `"_"` when the error is not tied to one.
    pub field: String,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a write operation: `{success, id?, errors?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation committed.
    pub success: bool,
    /// Identifier of the created or affected entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Operation-specific payload (e.g. the new advance balance).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure classification; `None` on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    /// Field-level errors; empty on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl OperationResult {
    /// A successful result for the given entity.
    #[must_use]
    pub fn ok(id: Uuid) -> Self {
        Self {
            success: true,
            id: Some(id),
            data: None,
            kind: None,
            errors: Vec::new(),
        }
    }

    /// Attaches a payload to the result.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A failed result.
    #[must_use]
    pub fn failure(kind: FailureKind, errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            id: None,
            data: None,
            kind: Some(kind),
            errors,
        }
    }

    /// Returns the first error code, if any.
    #[must_use]
    pub fn first_error_code(&self) -> Option<&str> {
        self.errors.first().map(|e| e.code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_ok_serializes_without_error_fields() {
        let id = Uuid::nil();
        let json = serde_json::to_value(OperationResult::ok(id)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["id"], id.to_string());
        assert!(json.get("errors").is_none());
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_failure_carries_field_errors() {
        let result = OperationResult::failure(
            FailureKind::Validation,
            vec![FieldError::new("amount", "VALIDATION_ERROR", "must be positive")],
        );
        assert!(!result.success);
        assert_eq!(result.first_error_code(), Some("VALIDATION_ERROR"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["errors"][0]["field"], "amount");
    }

    #[rstest]
    #[case(FailureKind::Validation, true, false)]
    #[case(FailureKind::BusinessRule, true, false)]
    #[case(FailureKind::NotFound, true, false)]
    #[case(FailureKind::Conflict, false, true)]
    #[case(FailureKind::System, false, false)]
    fn test_failure_kind_classification(
        #[case] kind: FailureKind,
        #[case] correctable: bool,
        #[case] retryable: bool,
    ) {
        assert_eq!(kind.is_user_correctable(), correctable);
        assert_eq!(kind.is_retryable(), retryable);
    }
}
