//! Shared types, errors, and configuration for LexLedger.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision and currency-checked arithmetic
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - The structured `OperationResult` returned by write operations
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
