//! Invoice domain types.

use chrono::NaiveDate;
use lexledger_shared::types::{
    AdvanceId, ClientId, Currency, ExpenseId, InvoiceId, LineItemId, MatterId, Money, TenantId,
    TimeEntryId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::advance::Advance;
use crate::entries::{Expense, TimeEntry};
use crate::error::BillingError;

/// Invoice status.
///
/// `Overdue` is never stored; it is projected from `Sent`/`Partial` by
/// [`Invoice::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Composed, not yet sent to the client.
    Draft,
    /// Sent, nothing paid yet.
    Sent,
    /// Partly paid.
    Partial,
    /// Fully paid.
    Paid,
    /// Sent or partly paid and past its due date.
    Overdue,
    /// Voided before collection.
    Cancelled,
    /// Voided as uncollectable.
    WrittenOff,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
            Self::WrittenOff => "written_off",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            "written_off" => Some(Self::WrittenOff),
            _ => None,
        }
    }

    /// Returns true for cancelled and written-off invoices.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Cancelled | Self::WrittenOff)
    }

    /// Returns true while money is still expected from the client.
    #[must_use]
    pub fn is_collectable(&self) -> bool {
        matches!(self, Self::Sent | Self::Partial | Self::Overdue)
    }

    /// Check if transition to target status is valid.
    ///
    /// Voiding a paid invoice is listed here; the workflow additionally
    /// demands an admin override for it.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Sent)
                | (Self::Sent | Self::Partial | Self::Overdue, Self::Partial | Self::Paid)
                | (
                    Self::Draft | Self::Sent | Self::Partial | Self::Overdue | Self::Paid,
                    Self::Cancelled | Self::WrittenOff
                )
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the invoice discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// No discount.
    #[default]
    None,
    /// Percentage of the subtotal.
    Percent,
    /// Fixed amount in the invoice currency.
    Fixed,
}

impl DiscountType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }

    /// Parses a discount type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "percent" => Some(Self::Percent),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

/// Kind of line on an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Billed from a time entry.
    Time,
    /// Billed from an expense.
    Expense,
    /// Entered by hand on the invoice.
    Manual,
}

impl ItemType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Expense => "expense",
            Self::Manual => "manual",
        }
    }

    /// Parses an item type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "time" => Some(Self::Time),
            "expense" => Some(Self::Expense),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// How an invoice is voided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoidKind {
    /// The invoice should never have been issued.
    Cancelled,
    /// The debt is abandoned.
    WrittenOff,
}

impl VoidKind {
    /// The status the invoice ends up in.
    #[must_use]
    pub fn target_status(self) -> InvoiceStatus {
        match self {
            Self::Cancelled => InvoiceStatus::Cancelled,
            Self::WrittenOff => InvoiceStatus::WrittenOff,
        }
    }
}

/// An invoice header with its derived totals.
///
/// Status and payment fields change only through
/// [`InvoiceWorkflow`](super::InvoiceWorkflow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice id.
    pub id: InvoiceId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Billed client.
    pub client_id: ClientId,
    /// Billed matter; `None` spans the whole client relationship.
    pub matter_id: Option<MatterId>,
    /// First day of the billed period.
    pub period_start: NaiveDate,
    /// Last day of the billed period.
    pub period_end: NaiveDate,
    /// Day the invoice is dated.
    pub issue_date: NaiveDate,
    /// Day payment is due.
    pub due_date: NaiveDate,
    /// Invoice currency; every line shares it.
    pub currency: Currency,
    /// Sum of line amounts.
    pub subtotal: Decimal,
    /// Discount kind.
    pub discount_type: DiscountType,
    /// Discount as entered (percent or amount).
    pub discount_value: Decimal,
    /// Discount in money.
    pub discount_amount: Decimal,
    /// Amount covered by an advance.
    pub retainer_applied: Decimal,
    /// Advance the retainer was drawn from.
    pub retainer_advance_id: Option<AdvanceId>,
    /// `subtotal - discount_amount - retainer_applied`.
    pub taxable_amount: Decimal,
    /// VAT as a fraction (0.11 for 11%).
    pub vat_rate: Decimal,
    /// `taxable_amount * vat_rate`, rounded.
    pub vat_amount: Decimal,
    /// `taxable_amount + vat_amount`.
    pub total: Decimal,
    pub(crate) amount_paid: Decimal,
    pub(crate) status: InvoiceStatus,
    pub(crate) paid_date: Option<NaiveDate>,
    pub(crate) void_reason: Option<String>,
    pub(crate) voided_on: Option<NaiveDate>,
}

/// A stored invoice row, as read back from persistence.
#[derive(Debug, Clone)]
pub struct InvoiceParts {
    /// Invoice id.
    pub id: InvoiceId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Billed client.
    pub client_id: ClientId,
    /// Billed matter.
    pub matter_id: Option<MatterId>,
    /// First day of the billed period.
    pub period_start: NaiveDate,
    /// Last day of the billed period.
    pub period_end: NaiveDate,
    /// Day the invoice is dated.
    pub issue_date: NaiveDate,
    /// Day payment is due.
    pub due_date: NaiveDate,
    /// Invoice currency.
    pub currency: Currency,
    /// Sum of line amounts.
    pub subtotal: Decimal,
    /// Discount kind.
    pub discount_type: DiscountType,
    /// Discount as entered.
    pub discount_value: Decimal,
    /// Discount in money.
    pub discount_amount: Decimal,
    /// Amount covered by an advance.
    pub retainer_applied: Decimal,
    /// Advance the retainer was drawn from.
    pub retainer_advance_id: Option<AdvanceId>,
    /// Taxable amount.
    pub taxable_amount: Decimal,
    /// VAT as a fraction.
    pub vat_rate: Decimal,
    /// VAT in money.
    pub vat_amount: Decimal,
    /// Amount billed.
    pub total: Decimal,
    /// Payments received.
    pub amount_paid: Decimal,
    /// Stored status.
    pub status: InvoiceStatus,
    /// Day the invoice became paid.
    pub paid_date: Option<NaiveDate>,
    /// Why the invoice was voided.
    pub void_reason: Option<String>,
    /// Day the invoice was voided.
    pub voided_on: Option<NaiveDate>,
}

impl Invoice {
    /// Rebuilds an invoice from a stored row.
    ///
    /// Rejects rows whose status disagrees with their payments: `overdue`
    /// stored as a status, payments outside `[0, total]`, a paid invoice
    /// without a paid date, or a voided invoice without a void date.
    pub fn from_parts(parts: InvoiceParts) -> Result<Self, BillingError> {
        let corrupt = |detail: &str| {
            BillingError::Internal(format!(
                "invoice {} is {} but {detail}",
                parts.id, parts.status
            ))
        };
        if parts.status == InvoiceStatus::Overdue {
            return Err(corrupt("overdue is never stored"));
        }
        if parts.amount_paid < Decimal::ZERO || parts.amount_paid > parts.total {
            return Err(corrupt("amount paid is outside [0, total]"));
        }
        if parts.status == InvoiceStatus::Paid && parts.paid_date.is_none() {
            return Err(corrupt("has no paid date"));
        }
        if parts.status.is_void() != parts.voided_on.is_some() {
            return Err(corrupt("void date does not match"));
        }

        Ok(Self {
            id: parts.id,
            tenant_id: parts.tenant_id,
            client_id: parts.client_id,
            matter_id: parts.matter_id,
            period_start: parts.period_start,
            period_end: parts.period_end,
            issue_date: parts.issue_date,
            due_date: parts.due_date,
            currency: parts.currency,
            subtotal: parts.subtotal,
            discount_type: parts.discount_type,
            discount_value: parts.discount_value,
            discount_amount: parts.discount_amount,
            retainer_applied: parts.retainer_applied,
            retainer_advance_id: parts.retainer_advance_id,
            taxable_amount: parts.taxable_amount,
            vat_rate: parts.vat_rate,
            vat_amount: parts.vat_amount,
            total: parts.total,
            amount_paid: parts.amount_paid,
            status: parts.status,
            paid_date: parts.paid_date,
            void_reason: parts.void_reason,
            voided_on: parts.voided_on,
        })
    }

    /// Stored status. See [`Invoice::effective_status`] for the reported one.
    #[must_use]
    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// Payments received so far.
    #[must_use]
    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    /// Day the invoice became paid.
    #[must_use]
    pub fn paid_date(&self) -> Option<NaiveDate> {
        self.paid_date
    }

    /// Why the invoice was voided.
    #[must_use]
    pub fn void_reason(&self) -> Option<&str> {
        self.void_reason.as_deref()
    }

    /// Day the invoice was voided.
    #[must_use]
    pub fn voided_on(&self) -> Option<NaiveDate> {
        self.voided_on
    }

    /// Status as reported on `today`.
    ///
    /// A sent or partly paid invoice past its due date reads as overdue.
    /// Nothing is written back.
    #[must_use]
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        match self.status {
            InvoiceStatus::Sent | InvoiceStatus::Partial if today > self.due_date => {
                InvoiceStatus::Overdue
            }
            status => status,
        }
    }

    /// Amount still owed.
    #[must_use]
    pub fn balance_due(&self) -> Money {
        Money::new(self.total - self.amount_paid, self.currency)
    }

    /// Invoice total as money.
    #[must_use]
    pub fn total_money(&self) -> Money {
        Money::new(self.total, self.currency)
    }
}

/// A priced line on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    /// Line id.
    pub id: LineItemId,
    /// Owning invoice.
    pub invoice_id: InvoiceId,
    /// Kind of line.
    pub item_type: ItemType,
    /// Text printed on the invoice.
    pub description: String,
    /// Hours for time lines, 1 for expenses.
    pub quantity: Decimal,
    /// Unit of the quantity.
    pub unit: String,
    /// Price per unit.
    pub rate: Decimal,
    /// Line amount, rounded to the currency's minor units.
    pub amount: Decimal,
    /// Source time entry.
    pub source_time_entry_id: Option<TimeEntryId>,
    /// Source expense.
    pub source_expense_id: Option<ExpenseId>,
    /// Position on the invoice.
    pub sort_order: i32,
}

/// A line typed in by the biller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualLineInput {
    /// Text printed on the invoice.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit of the quantity.
    pub unit: String,
    /// Price per unit.
    pub rate: Decimal,
    /// Amount to bill; `None` means `quantity * rate`.
    pub amount: Option<Decimal>,
}

/// Request to draw on an advance while composing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetainerRequest {
    /// Advance to draw from.
    pub advance_id: AdvanceId,
    /// Amount requested.
    pub amount: Decimal,
}

/// Input for composing an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeInvoiceInput {
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Client to bill.
    pub client_id: ClientId,
    /// Restrict billing to one matter.
    pub matter_id: Option<MatterId>,
    /// Explicit time entries; `None` picks every unbilled billable entry in scope.
    pub time_entry_ids: Option<Vec<TimeEntryId>>,
    /// Explicit expenses; `None` picks every unbilled billable expense in scope.
    pub expense_ids: Option<Vec<ExpenseId>>,
    /// Lines typed in by the biller.
    #[serde(default)]
    pub manual_lines: Vec<ManualLineInput>,
    /// Invoice currency; derived from the entries when absent.
    pub currency: Option<Currency>,
    /// Discount kind.
    #[serde(default)]
    pub discount_type: DiscountType,
    /// Discount value (percent or amount).
    #[serde(default)]
    pub discount_value: Decimal,
    /// VAT as a fraction; `None` means no VAT.
    pub vat_rate: Option<Decimal>,
    /// Optional draw on an advance.
    pub retainer: Option<RetainerRequest>,
    /// Invoice date.
    pub issue_date: NaiveDate,
    /// Due date; defaults to the configured payment terms.
    pub due_date: Option<NaiveDate>,
    /// Billed period start; defaults to the earliest entry date.
    pub period_start: Option<NaiveDate>,
    /// Billed period end; defaults to the latest entry date.
    pub period_end: Option<NaiveDate>,
}

/// Everything the composer read, ready to be checked and priced.
#[derive(Debug, Clone, Default)]
pub struct ComposeSources {
    /// Time entries named by the request, or every candidate in scope.
    pub time_entries: Vec<TimeEntry>,
    /// Expenses named by the request, or every candidate in scope.
    pub expenses: Vec<Expense>,
    /// The advance named by the retainer request.
    pub advance: Option<Advance>,
}

/// Result of composing: the new invoice and the records it changed.
#[derive(Debug, Clone)]
pub struct ComposedInvoice {
    /// The draft invoice.
    pub invoice: Invoice,
    /// Its lines in print order.
    pub line_items: Vec<InvoiceLineItem>,
    /// Time entries now marked invoiced.
    pub time_entries: Vec<TimeEntry>,
    /// Expenses now marked invoiced.
    pub expenses: Vec<Expense>,
    /// The advance after consumption, if one was drawn on.
    pub advance: Option<Advance>,
}

/// What voiding an invoice gives back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoidReversal {
    /// Time entries to return to draft.
    pub time_entry_ids: Vec<TimeEntryId>,
    /// Expenses to return to draft.
    pub expense_ids: Vec<ExpenseId>,
    /// Retainer to reinstate on its advance.
    pub retainer: Option<(AdvanceId, Money)>,
}
