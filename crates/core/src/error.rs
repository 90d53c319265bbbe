//! Billing error types.
//!
//! One taxonomy covers the whole ledger: validation failures the user can
//! correct, business-rule refusals (insufficient balance, double billing),
//! currency mismatches, missing entities, exhausted concurrency retries, and
//! storage faults. Every variant knows its boundary classification so the
//! operation layer can turn it into a structured result.

use lexledger_shared::AppError;
use lexledger_shared::types::{Currency, FailureKind, FieldError, Money, MoneyError};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::invoice::InvoiceStatus;

/// Errors that can occur during billing operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillingError {
    // ========== Validation Errors ==========
    /// Input failed a field-level check.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// The offending input field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The requested status change is not allowed from the current status.
    #[error("Invalid invoice status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: InvoiceStatus,
        /// The attempted target status.
        to: InvoiceStatus,
    },

    // ========== Business Rule Errors ==========
    /// An advance does not cover the requested consumption or refund.
    #[error("Insufficient balance on advance {advance_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The advance being drawn on.
        advance_id: Uuid,
        /// Amount requested.
        requested: Decimal,
        /// Balance remaining on the advance.
        available: Decimal,
    },

    /// A time entry or expense is already on another invoice.
    #[error("Entry {entry_id} is already invoiced")]
    AlreadyInvoiced {
        /// The time entry or expense id.
        entry_id: Uuid,
    },

    // ========== Currency Errors ==========
    /// Amounts in different currencies were combined.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        /// The currency already established.
        expected: Currency,
        /// The conflicting currency.
        found: Currency,
    },

    // ========== Lookup Errors ==========
    /// A referenced entity does not resolve for this tenant.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. "advance").
        entity: &'static str,
        /// The id that did not resolve.
        id: Uuid,
    },

    // ========== Concurrency Errors ==========
    /// Optimistic version checks kept failing.
    #[error("Concurrent modification detected after {attempts} attempts, please retry")]
    ConcurrencyConflict {
        /// Number of attempts made.
        attempts: u32,
    },

    // ========== System Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (e.g. a stored row violates an invariant).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Rejects `money` on `field` if it is finer than its currency allows.
    ///
    /// Amounts are stored as given, so anything below the minor unit would
    /// be silently truncated on write.
    pub fn check_scale(field: &str, money: Money) -> Result<(), Self> {
        money
            .ensure_scale()
            .map_err(|err| Self::validation(field, err.to_string()))
    }

    /// Rejects a quantity or rate on `field` with more than `places` decimals.
    pub fn check_places(field: &str, value: Decimal, places: u32) -> Result<(), Self> {
        if value.normalize().scale() > places {
            return Err(Self::validation(
                field,
                format!("{value} has more than {places} decimal places"),
            ));
        }
        Ok(())
    }

    /// Shorthand for a missing entity.
    #[must_use]
    pub const fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::AlreadyInvoiced { .. } => "ALREADY_INVOICED",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation { .. } | Self::InvalidTransition { .. } => 400,

            // 404 Not Found
            Self::NotFound { .. } => 404,

            // 409 Conflict - concurrency errors
            Self::ConcurrencyConflict { .. } => 409,

            // 422 Unprocessable - business rules
            Self::InsufficientBalance { .. }
            | Self::AlreadyInvoiced { .. }
            | Self::CurrencyMismatch { .. } => 422,

            // 500 Internal Server Error
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the boundary classification of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation { .. } | Self::InvalidTransition { .. } => FailureKind::Validation,
            Self::InsufficientBalance { .. }
            | Self::AlreadyInvoiced { .. }
            | Self::CurrencyMismatch { .. } => FailureKind::BusinessRule,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::ConcurrencyConflict { .. } => FailureKind::Conflict,
            Self::Database(_) | Self::Internal(_) => FailureKind::System,
        }
    }

    /// Returns the input field this error is attached to.
    #[must_use]
    pub fn field(&self) -> String {
        match self {
            Self::Validation { field, .. } => field.clone(),
            Self::InvalidTransition { .. } => "status".to_string(),
            Self::InsufficientBalance { .. } => "amount".to_string(),
            Self::AlreadyInvoiced { .. } => "entry_ids".to_string(),
            Self::CurrencyMismatch { .. } => "currency".to_string(),
            Self::NotFound { entity, .. } => format!("{entity}_id"),
            Self::ConcurrencyConflict { .. } | Self::Database(_) | Self::Internal(_) => {
                "_".to_string()
            }
        }
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Converts the error into boundary field errors.
    ///
    /// System faults are reported generically; their detail stays in the logs.
    #[must_use]
    pub fn to_field_errors(&self) -> Vec<FieldError> {
        let message = match self {
            Self::Database(_) | Self::Internal(_) => {
                "The operation could not be completed; no changes were made".to_string()
            }
            other => other.to_string(),
        };
        vec![FieldError::new(self.field(), self.error_code(), message)]
    }
}

impl From<MoneyError> for BillingError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::CurrencyMismatch { expected, found } => {
                Self::CurrencyMismatch { expected, found }
            }
            MoneyError::ExcessScale { .. } => Self::validation("amount", err.to_string()),
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        let message = err.to_string();
        match err.kind() {
            FailureKind::Validation => Self::Validation(message),
            FailureKind::BusinessRule => Self::BusinessRule(message),
            FailureKind::NotFound => Self::NotFound(message),
            FailureKind::Conflict => Self::Conflict(message),
            FailureKind::System => match err {
                BillingError::Database(detail) => Self::Database(detail),
                _ => Self::Internal(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn insufficient() -> BillingError {
        BillingError::InsufficientBalance {
            advance_id: Uuid::nil(),
            requested: dec!(6000),
            available: dec!(5000),
        }
    }

    #[rstest]
    #[case(BillingError::validation("amount", "must be positive"), "VALIDATION_ERROR", 400, FailureKind::Validation)]
    #[case(insufficient(), "INSUFFICIENT_BALANCE", 422, FailureKind::BusinessRule)]
    #[case(BillingError::AlreadyInvoiced { entry_id: Uuid::nil() }, "ALREADY_INVOICED", 422, FailureKind::BusinessRule)]
    #[case(BillingError::CurrencyMismatch { expected: Currency::USD, found: Currency::EUR }, "CURRENCY_MISMATCH", 422, FailureKind::BusinessRule)]
    #[case(BillingError::not_found("invoice", Uuid::nil()), "NOT_FOUND", 404, FailureKind::NotFound)]
    #[case(BillingError::ConcurrencyConflict { attempts: 3 }, "CONCURRENCY_CONFLICT", 409, FailureKind::Conflict)]
    #[case(BillingError::Database("boom".into()), "DATABASE_ERROR", 500, FailureKind::System)]
    fn test_error_classification(
        #[case] err: BillingError,
        #[case] code: &str,
        #[case] status: u16,
        #[case] kind: FailureKind,
    ) {
        assert_eq!(err.error_code(), code);
        assert_eq!(err.http_status_code(), status);
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(BillingError::ConcurrencyConflict { attempts: 1 }.is_retryable());
        assert!(!insufficient().is_retryable());
        assert!(!BillingError::Database("x".into()).is_retryable());
    }

    #[test]
    fn test_field_errors_name_the_field() {
        let errors = BillingError::validation("narrative", "must not be empty").to_field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "narrative");
        assert_eq!(errors[0].code, "VALIDATION_ERROR");

        let errors = BillingError::not_found("advance", Uuid::nil()).to_field_errors();
        assert_eq!(errors[0].field, "advance_id");
    }

    #[test]
    fn test_system_errors_hide_detail() {
        let errors = BillingError::Database("connection reset by peer".into()).to_field_errors();
        assert!(!errors[0].message.contains("connection reset"));
    }

    #[test]
    fn test_insufficient_balance_display() {
        assert_eq!(
            insufficient().to_string(),
            format!(
                "Insufficient balance on advance {}: requested 6000, available 5000",
                Uuid::nil()
            )
        );
    }

    #[test]
    fn test_money_error_converts_to_currency_mismatch() {
        let err: BillingError = MoneyError::CurrencyMismatch {
            expected: Currency::USD,
            found: Currency::GBP,
        }
        .into();
        assert_eq!(
            err,
            BillingError::CurrencyMismatch {
                expected: Currency::USD,
                found: Currency::GBP,
            }
        );
    }

    #[test]
    fn test_check_scale_names_the_field() {
        assert!(BillingError::check_scale("rate", Money::new(dec!(150.25), Currency::USD)).is_ok());

        let err = BillingError::check_scale("rate", Money::new(dec!(150.255), Currency::USD))
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(err.field(), "rate");

        assert!(BillingError::check_places("markup_percent", dec!(12.5000), 4).is_ok());
        assert_eq!(
            BillingError::check_places("markup_percent", dec!(12.00001), 4)
                .unwrap_err()
                .field(),
            "markup_percent"
        );

        let err: BillingError = MoneyError::ExcessScale {
            amount: dec!(0.5),
            currency: Currency::JPY,
        }
        .into();
        assert_eq!(err.field(), "amount");
    }

    #[test]
    fn test_converts_into_app_error() {
        let app: AppError = insufficient().into();
        assert_eq!(app.status_code(), 422);
        let app: AppError = BillingError::Database("down".into()).into();
        assert_eq!(app.error_code(), "DATABASE_ERROR");
    }
}
