//! Invoice status machine.
//!
//! `draft -> sent -> partial -> paid`, with `sent -> paid` directly on full
//! payment. Any unvoided invoice can be cancelled or written off; a paid one
//! only with an admin override. Voiding hands back what composing took.

use chrono::NaiveDate;
use lexledger_shared::types::Money;
use rust_decimal::Decimal;

use super::types::{Invoice, InvoiceLineItem, InvoiceStatus, VoidKind, VoidReversal};
use crate::error::BillingError;

/// What a payment did to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The payment was booked; the invoice is now in `status`.
    Applied {
        /// Status after the payment.
        status: InvoiceStatus,
    },
    /// The invoice was already paid; nothing changed.
    AlreadyPaid,
}

/// Stateless service for invoice status transitions.
pub struct InvoiceWorkflow;

impl InvoiceWorkflow {
    /// Sends a draft invoice.
    pub fn send(invoice: &mut Invoice) -> Result<(), BillingError> {
        match invoice.status {
            InvoiceStatus::Draft => {
                invoice.status = InvoiceStatus::Sent;
                Ok(())
            }
            from => Err(BillingError::InvalidTransition {
                from,
                to: InvoiceStatus::Sent,
            }),
        }
    }

    /// Records a payment received on `date`.
    ///
    /// Moves a sent or partly paid invoice to `partial`, or to `paid` once
    /// the total is covered. `paid_date` is set on the way into `paid` and
    /// never overwritten. Recording a payment against an invoice that is
    /// already paid changes nothing.
    ///
    /// # Errors
    /// * `InvalidTransition` if the invoice is a draft or voided
    /// * `CurrencyMismatch` if the payment is in another currency
    /// * `Validation` if the amount is negative, zero while money is owed,
    ///   or more than is owed
    pub fn record_payment(
        invoice: &mut Invoice,
        amount: Money,
        date: NaiveDate,
    ) -> Result<PaymentOutcome, BillingError> {
        match invoice.status {
            InvoiceStatus::Paid => return Ok(PaymentOutcome::AlreadyPaid),
            InvoiceStatus::Sent | InvoiceStatus::Partial => {}
            from => {
                return Err(BillingError::InvalidTransition {
                    from,
                    to: InvoiceStatus::Paid,
                });
            }
        }

        invoice.total_money().ensure_same_currency(amount.currency)?;
        let outstanding = invoice.balance_due().amount;
        if amount.is_negative() {
            return Err(BillingError::validation("amount", "must not be negative"));
        }
        BillingError::check_scale("amount", amount)?;
        if amount.is_zero() && outstanding > Decimal::ZERO {
            return Err(BillingError::validation("amount", "must be greater than zero"));
        }
        if amount.amount > outstanding {
            return Err(BillingError::validation(
                "amount",
                format!("payment {amount} exceeds balance due {outstanding}"),
            ));
        }

        invoice.amount_paid += amount.amount;
        if invoice.amount_paid >= invoice.total {
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_date = invoice.paid_date.or(Some(date));
        } else {
            invoice.status = InvoiceStatus::Partial;
        }
        Ok(PaymentOutcome::Applied {
            status: invoice.status,
        })
    }

    /// Cancels or writes off an invoice and returns what it must give back.
    ///
    /// # Errors
    /// * `Validation` if the reason is blank, or the invoice is paid and
    ///   `admin_override` is not set
    /// * `InvalidTransition` if the invoice is already voided
    pub fn void(
        invoice: &mut Invoice,
        line_items: &[InvoiceLineItem],
        kind: VoidKind,
        reason: &str,
        voided_on: NaiveDate,
        admin_override: bool,
    ) -> Result<VoidReversal, BillingError> {
        let target = kind.target_status();
        if reason.trim().is_empty() {
            return Err(BillingError::validation("reason", "a void reason is required"));
        }
        if !invoice.status.can_transition_to(target) {
            return Err(BillingError::InvalidTransition {
                from: invoice.status,
                to: target,
            });
        }
        if invoice.status == InvoiceStatus::Paid && !admin_override {
            return Err(BillingError::validation(
                "admin_override",
                "voiding a paid invoice requires an admin override",
            ));
        }

        let reversal = VoidReversal {
            time_entry_ids: line_items
                .iter()
                .filter_map(|l| l.source_time_entry_id)
                .collect(),
            expense_ids: line_items
                .iter()
                .filter_map(|l| l.source_expense_id)
                .collect(),
            retainer: invoice
                .retainer_advance_id
                .filter(|_| invoice.retainer_applied > Decimal::ZERO)
                .map(|id| (id, Money::new(invoice.retainer_applied, invoice.currency))),
        };

        invoice.status = target;
        invoice.void_reason = Some(reason.trim().to_string());
        invoice.voided_on = Some(voided_on);
        Ok(reversal)
    }
}
