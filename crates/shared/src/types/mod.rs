//! Common types used across the application.

pub mod id;
pub mod money;
pub mod outcome;
pub mod pagination;

pub use id::*;
pub use money::{Currency, CurrencyTotals, Money, MoneyError, round_half_up};
pub use outcome::{FailureKind, FieldError, OperationResult};
pub use pagination::{PageMeta, PageRequest, PageResponse};
