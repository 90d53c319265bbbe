//! Revenue recognition rules.
//!
//! Firm revenue for a period is the sum of three cash flows:
//! client retainers received, fee payments received, and invoices paid.
//! Client expense advances and lawyer advances are pass-through money and
//! never count, whatever their size. Refunded advances do not count either.

use lexledger_shared::types::TenantId;
use std::collections::BTreeMap;

use super::types::{DateRange, RevenueBreakdown, RevenueCategory, RevenueReport, RevenueScope};
use crate::advance::{Advance, AdvanceStatus, AdvanceType};
use crate::invoice::{Invoice, InvoiceStatus};

/// Service for classifying cash flows into period revenue.
pub struct RevenueClassifier;

impl RevenueClassifier {
    /// The revenue bucket an advance type falls in, or `None` for
    /// pass-through transfers.
    #[must_use]
    pub fn classify_advance(advance_type: &AdvanceType) -> Option<RevenueCategory> {
        match advance_type {
            AdvanceType::ClientRetainer => Some(RevenueCategory::Retainer),
            AdvanceType::FeePayment(_) => Some(RevenueCategory::FeePayment),
            AdvanceType::ClientExpenseAdvance | AdvanceType::LawyerAdvance => None,
        }
    }

    /// Aggregates revenue for `period` and `scope`.
    ///
    /// Reads only; rows from other tenants are ignored. Amounts are kept per
    /// currency and never summed across currencies.
    #[must_use]
    pub fn revenue_for_period(
        tenant_id: TenantId,
        period: DateRange,
        scope: RevenueScope,
        advances: &[Advance],
        invoices: &[Invoice],
    ) -> RevenueReport {
        let mut by_currency: BTreeMap<_, RevenueBreakdown> = BTreeMap::new();

        for advance in advances {
            if advance.tenant_id() != tenant_id
                || !period.contains(advance.date_received())
                || !matches!(
                    advance.status(),
                    AdvanceStatus::Active | AdvanceStatus::Depleted
                )
                || !advance_in_scope(advance, scope)
            {
                continue;
            }
            if let Some(category) = Self::classify_advance(advance.advance_type()) {
                by_currency
                    .entry(advance.currency())
                    .or_default()
                    .add(category, advance.amount().amount);
            }
        }

        for invoice in invoices {
            let paid_in_period = invoice.status == InvoiceStatus::Paid
                && invoice.paid_date.is_some_and(|d| period.contains(d));
            if invoice.tenant_id != tenant_id || !paid_in_period || !invoice_in_scope(invoice, scope)
            {
                continue;
            }
            by_currency
                .entry(invoice.currency)
                .or_default()
                .add(RevenueCategory::PaidInvoice, invoice.total);
        }

        RevenueReport {
            period,
            scope,
            by_currency,
        }
    }
}

fn advance_in_scope(advance: &Advance, scope: RevenueScope) -> bool {
    match scope {
        RevenueScope::Firm => true,
        RevenueScope::Client(id) => advance.client_id() == Some(id),
        RevenueScope::Matter(id) => advance.matter_id() == Some(id),
    }
}

fn invoice_in_scope(invoice: &Invoice, scope: RevenueScope) -> bool {
    match scope {
        RevenueScope::Firm => true,
        RevenueScope::Client(id) => invoice.client_id == id,
        RevenueScope::Matter(id) => invoice.matter_id == Some(id),
    }
}
