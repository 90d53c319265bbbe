//! `SeaORM` entity definitions for the billing ledger tables.
//!
//! Every table carries `tenant_id`; mutable tables carry a `version` column
//! that writers bump and check for optimistic concurrency.

pub mod advances;
pub mod expenses;
pub mod invoice_line_items;
pub mod invoices;
pub mod time_entries;

pub mod prelude {
    //! Entity re-exports.
    pub use super::advances::Entity as Advances;
    pub use super::expenses::Entity as Expenses;
    pub use super::invoice_line_items::Entity as InvoiceLineItems;
    pub use super::invoices::Entity as Invoices;
    pub use super::time_entries::Entity as TimeEntries;
}
