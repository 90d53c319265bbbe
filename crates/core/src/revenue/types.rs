//! Revenue report types.

use chrono::NaiveDate;
use lexledger_shared::types::{ClientId, Currency, CurrencyTotals, MatterId, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::BillingError;

/// Which slice of the firm a revenue query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum RevenueScope {
    /// Everything the firm received.
    #[default]
    Firm,
    /// One client.
    Client(ClientId),
    /// One matter.
    Matter(MatterId),
}

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BillingError> {
        if start > end {
            return Err(BillingError::validation(
                "start",
                format!("period start {start} is after period end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Returns true if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Which revenue bucket a cash flow lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueCategory {
    /// Client retainer deposits.
    Retainer,
    /// Fees paid directly.
    FeePayment,
    /// Invoices settled in full.
    PaidInvoice,
}

/// Revenue in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    /// Client retainers received.
    pub retainers: Decimal,
    /// Direct fee payments received.
    pub fee_payments: Decimal,
    /// Invoices paid in the period.
    pub paid_invoices: Decimal,
    /// Sum of the three.
    pub total: Decimal,
}

impl RevenueBreakdown {
    /// Adds an amount to a bucket and to the total.
    pub fn add(&mut self, category: RevenueCategory, amount: Decimal) {
        match category {
            RevenueCategory::Retainer => self.retainers += amount,
            RevenueCategory::FeePayment => self.fee_payments += amount,
            RevenueCategory::PaidInvoice => self.paid_invoices += amount,
        }
        self.total += amount;
    }
}

/// Revenue for a period, bucketed per currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueReport {
    /// The period covered.
    pub period: DateRange,
    /// The slice covered.
    pub scope: RevenueScope,
    /// One breakdown per currency seen in the period.
    pub by_currency: BTreeMap<Currency, RevenueBreakdown>,
}

impl RevenueReport {
    /// Breakdown for one currency; all zero if the currency is absent.
    #[must_use]
    pub fn for_currency(&self, currency: Currency) -> RevenueBreakdown {
        self.by_currency.get(&currency).copied().unwrap_or_default()
    }

    /// The only currency's breakdown, for callers that want a single figure.
    ///
    /// Returns `Ok(None)` for an empty period.
    ///
    /// # Errors
    ///
    /// `CurrencyMismatch` when the period holds more than one currency.
    pub fn single_currency(&self) -> Result<Option<(Currency, RevenueBreakdown)>, BillingError> {
        let mut iter = self.by_currency.iter();
        let Some((first, breakdown)) = iter.next() else {
            return Ok(None);
        };
        if let Some((found, _)) = iter.next() {
            return Err(BillingError::CurrencyMismatch {
                expected: *first,
                found: *found,
            });
        }
        Ok(Some((*first, *breakdown)))
    }

    /// Period totals per currency.
    #[must_use]
    pub fn totals(&self) -> CurrencyTotals {
        self.by_currency
            .iter()
            .map(|(currency, b)| Money::new(b.total, *currency))
            .collect()
    }
}
