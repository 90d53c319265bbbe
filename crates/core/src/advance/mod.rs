//! Retainer and advance ledger.
//!
//! Every advance owns its balance. Deposits open it, invoices consume it,
//! refunds return it, and voided invoices reinstate what they consumed.
//!
//! # Modules
//!
//! - `types` - Advance type, status, owner and deposit input
//! - `ledger` - The `Advance` aggregate and balance queries

pub mod ledger;
pub mod types;

#[cfg(test)]
mod props;

pub use ledger::{Advance, outstanding_balance};
pub use types::{AdvanceOwner, AdvanceParts, AdvanceStatus, AdvanceType, NewAdvance};
