//! Invoice composition and the invoice status machine.
//!
//! # Modules
//!
//! - `types` - Invoice, line item, status and compose input types
//! - `composer` - Prices unbilled work into a draft invoice
//! - `workflow` - Send, payment and void transitions

pub mod composer;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod props;

pub use composer::{InvoiceComposer, InvoiceTotals, compute_totals, discount_amount};
pub use types::{
    ComposeInvoiceInput, ComposeSources, ComposedInvoice, DiscountType, Invoice, InvoiceLineItem,
    InvoiceParts, InvoiceStatus, ItemType, ManualLineInput, RetainerRequest, VoidKind,
    VoidReversal,
};
pub use workflow::{InvoiceWorkflow, PaymentOutcome};
