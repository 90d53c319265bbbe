//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//!
//! Reads go through the repository structs. Writes are free functions generic
//! over [`ConnectionTrait`] so the ledger can run several of them inside one
//! database transaction.

pub mod advance;
pub mod entry;
pub mod invoice;
mod mapping;
pub mod retry;

pub use advance::{AdvanceFilter, AdvanceRepository};
pub use entry::EntryRepository;
pub use invoice::{InvoiceFilter, InvoiceRepository};
pub use retry::with_retry;

use lexledger_core::BillingError;
use sea_orm::DbErr;

/// A loaded row together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// The domain value.
    pub value: T,
    /// Row version at read time; writes must present it back.
    pub version: i64,
}

pub(crate) fn db_err(err: DbErr) -> BillingError {
    BillingError::Database(err.to_string())
}

/// Fails with a single-attempt conflict when a versioned update touched no row.
pub(crate) fn ensure_updated(rows_affected: u64) -> Result<(), BillingError> {
    if rows_affected == 0 {
        Err(BillingError::ConcurrencyConflict { attempts: 1 })
    } else {
        Ok(())
    }
}
