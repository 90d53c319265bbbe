//! Period revenue classification.
//!
//! Answers "how much of the cash received in a period is firm revenue"
//! without mutating anything.

pub mod classifier;
pub mod types;


pub use classifier::RevenueClassifier;
pub use types::{
    DateRange, RevenueBreakdown, RevenueCategory, RevenueReport, RevenueScope,
};
