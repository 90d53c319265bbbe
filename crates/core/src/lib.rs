//! Core billing logic for `LexLedger`.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `parties` - Read-only client, matter and lawyer views, rate resolution
//! - `entries` - Time entries and expenses
//! - `advance` - Retainer and advance balances
//! - `invoice` - Invoice composition and status machine
//! - `revenue` - Period revenue classification
//! - `error` - The billing error taxonomy

pub mod advance;
pub mod entries;
pub mod error;
pub mod invoice;
pub mod parties;
pub mod revenue;

pub use error::BillingError;
