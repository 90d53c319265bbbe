//! Time entries and expenses awaiting billing.

pub mod types;

pub use types::{
    EntryStatus, Expense, ExpenseParts, NewExpense, NewTimeEntry, TimeEntry, TimeEntryParts,
};
