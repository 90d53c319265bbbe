//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//! - The [`BillingLedger`] operation boundary and the [`PartyDirectory`] seam

pub mod directory;
pub mod entities;
pub mod ledger;
pub mod migration;
pub mod repositories;

pub use directory::{InMemoryDirectory, PartyDirectory};
pub use ledger::{BillingLedger, InvoiceDetail, InvoiceSummary, VoidInvoiceInput};
pub use repositories::{AdvanceFilter, InvoiceFilter};

use lexledger_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the configured database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
