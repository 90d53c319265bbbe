//! Conversions between stored rows and core billing types.
//!
//! Enum-like columns are stored as text and parsed back here. A row that no
//! longer parses is reported as `BillingError::Internal`; it means the table
//! was written by something other than this crate.

use chrono::{DateTime, Utc};
use lexledger_core::BillingError;
use lexledger_core::advance::{Advance, AdvanceOwner, AdvanceParts, AdvanceStatus, AdvanceType};
use lexledger_core::entries::{EntryStatus, Expense, ExpenseParts, TimeEntry, TimeEntryParts};
use lexledger_core::invoice::{
    DiscountType, Invoice, InvoiceLineItem, InvoiceParts, InvoiceStatus, ItemType,
};
use lexledger_shared::types::{
    AdvanceId, ClientId, Currency, ExpenseId, InvoiceId, LawyerId, LineItemId, MatterId, TenantId,
    TimeEntryId,
};
use rust_decimal::Decimal;
use sea_orm::Set;

use crate::entities::{advances, expenses, invoice_line_items, invoices, time_entries};

/// Scale money columns are stored at.
const STORED_SCALE: u32 = 4;
/// Scale of the VAT rate column.
const RATE_SCALE: u32 = 6;

/// Normalizes a decimal read back from storage.
///
/// Backends without a native decimal type hand values back through a binary
/// float; rounding to the column scale restores the exact stored amount.
fn stored(value: Decimal) -> Decimal {
    value.round_dp(STORED_SCALE)
}

fn corrupt(table: &str, id: uuid::Uuid, column: &str, value: &str) -> BillingError {
    BillingError::Internal(format!("{table} {id} has invalid {column} '{value}'"))
}

fn currency(table: &str, id: uuid::Uuid, code: &str) -> Result<Currency, BillingError> {
    code.parse()
        .map_err(|_| corrupt(table, id, "currency", code))
}

// ============================================================================
// Advances
// ============================================================================

pub(crate) fn advance_from_model(model: advances::Model) -> Result<Advance, BillingError> {
    let advance_type: AdvanceType = model
        .advance_type
        .parse()
        .map_err(|_| corrupt("advance", model.id, "advance_type", &model.advance_type))?;
    let status = AdvanceStatus::parse(&model.status)
        .ok_or_else(|| corrupt("advance", model.id, "status", &model.status))?;
    let owner = match (model.client_id, model.lawyer_id) {
        (Some(client), None) => AdvanceOwner::Client(ClientId::from_uuid(client)),
        (None, Some(lawyer)) => AdvanceOwner::Lawyer(LawyerId::from_uuid(lawyer)),
        _ => {
            return Err(BillingError::Internal(format!(
                "advance {} must have exactly one owner",
                model.id
            )));
        }
    };

    Advance::from_parts(AdvanceParts {
        id: AdvanceId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        owner,
        matter_id: model.matter_id.map(MatterId::from_uuid),
        advance_type,
        amount: stored(model.amount),
        currency: currency("advance", model.id, &model.currency)?,
        date_received: model.date_received,
        balance_remaining: stored(model.balance_remaining),
        status,
    })
}

pub(crate) fn advance_to_active(advance: &Advance, now: DateTime<Utc>) -> advances::ActiveModel {
    advances::ActiveModel {
        id: Set(advance.id().into_inner()),
        tenant_id: Set(advance.tenant_id().into_inner()),
        advance_type: Set(advance.advance_type().to_string()),
        client_id: Set(advance.client_id().map(ClientId::into_inner)),
        lawyer_id: Set(advance.lawyer_id().map(LawyerId::into_inner)),
        matter_id: Set(advance.matter_id().map(MatterId::into_inner)),
        amount: Set(advance.amount().amount),
        currency: Set(advance.currency().code().to_string()),
        date_received: Set(advance.date_received()),
        balance_remaining: Set(advance.balance().amount),
        status: Set(advance.status().as_str().to_string()),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

// ============================================================================
// Time entries and expenses
// ============================================================================

pub(crate) fn time_entry_from_model(model: time_entries::Model) -> Result<TimeEntry, BillingError> {
    let status = EntryStatus::parse(&model.status)
        .ok_or_else(|| corrupt("time_entry", model.id, "status", &model.status))?;
    TimeEntry::from_parts(TimeEntryParts {
        id: TimeEntryId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        lawyer_id: LawyerId::from_uuid(model.lawyer_id),
        client_id: ClientId::from_uuid(model.client_id),
        matter_id: MatterId::from_uuid(model.matter_id),
        date: model.date,
        duration_minutes: stored(model.duration_minutes),
        narrative: model.narrative,
        billable: model.billable,
        rate: stored(model.rate),
        currency: currency("time_entry", model.id, &model.currency)?,
        status,
        invoice_id: model.invoice_id.map(InvoiceId::from_uuid),
    })
}

pub(crate) fn time_entry_to_active(
    entry: &TimeEntry,
    now: DateTime<Utc>,
) -> time_entries::ActiveModel {
    time_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        tenant_id: Set(entry.tenant_id.into_inner()),
        lawyer_id: Set(entry.lawyer_id.into_inner()),
        client_id: Set(entry.client_id.into_inner()),
        matter_id: Set(entry.matter_id.into_inner()),
        date: Set(entry.date),
        duration_minutes: Set(entry.duration_minutes),
        narrative: Set(entry.narrative.clone()),
        billable: Set(entry.billable),
        rate: Set(entry.rate),
        currency: Set(entry.currency.code().to_string()),
        status: Set(entry.status().as_str().to_string()),
        invoice_id: Set(entry.invoice_id().map(InvoiceId::into_inner)),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub(crate) fn expense_from_model(model: expenses::Model) -> Result<Expense, BillingError> {
    let status = EntryStatus::parse(&model.status)
        .ok_or_else(|| corrupt("expense", model.id, "status", &model.status))?;
    Expense::from_parts(ExpenseParts {
        id: ExpenseId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        client_id: ClientId::from_uuid(model.client_id),
        matter_id: MatterId::from_uuid(model.matter_id),
        date: model.date,
        category: model.category,
        description: model.description,
        amount: stored(model.amount),
        currency: currency("expense", model.id, &model.currency)?,
        billable: model.billable,
        markup_percent: stored(model.markup_percent),
        status,
        invoice_id: model.invoice_id.map(InvoiceId::from_uuid),
    })
}

pub(crate) fn expense_to_active(expense: &Expense, now: DateTime<Utc>) -> expenses::ActiveModel {
    expenses::ActiveModel {
        id: Set(expense.id.into_inner()),
        tenant_id: Set(expense.tenant_id.into_inner()),
        client_id: Set(expense.client_id.into_inner()),
        matter_id: Set(expense.matter_id.into_inner()),
        date: Set(expense.date),
        category: Set(expense.category.clone()),
        description: Set(expense.description.clone()),
        amount: Set(expense.amount),
        currency: Set(expense.currency.code().to_string()),
        billable: Set(expense.billable),
        markup_percent: Set(expense.markup_percent),
        status: Set(expense.status().as_str().to_string()),
        invoice_id: Set(expense.invoice_id().map(InvoiceId::into_inner)),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

// ============================================================================
// Invoices
// ============================================================================

pub(crate) fn invoice_from_model(model: invoices::Model) -> Result<Invoice, BillingError> {
    let status = InvoiceStatus::parse(&model.status)
        .ok_or_else(|| corrupt("invoice", model.id, "status", &model.status))?;
    let discount_type = DiscountType::parse(&model.discount_type)
        .ok_or_else(|| corrupt("invoice", model.id, "discount_type", &model.discount_type))?;
    Invoice::from_parts(InvoiceParts {
        id: InvoiceId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        client_id: ClientId::from_uuid(model.client_id),
        matter_id: model.matter_id.map(MatterId::from_uuid),
        period_start: model.period_start,
        period_end: model.period_end,
        issue_date: model.issue_date,
        due_date: model.due_date,
        currency: currency("invoice", model.id, &model.currency)?,
        subtotal: stored(model.subtotal),
        discount_type,
        discount_value: stored(model.discount_value),
        discount_amount: stored(model.discount_amount),
        retainer_applied: stored(model.retainer_applied),
        retainer_advance_id: model.retainer_advance_id.map(AdvanceId::from_uuid),
        taxable_amount: stored(model.taxable_amount),
        vat_rate: model.vat_rate.round_dp(RATE_SCALE),
        vat_amount: stored(model.vat_amount),
        total: stored(model.total),
        amount_paid: stored(model.amount_paid),
        status,
        paid_date: model.paid_date,
        void_reason: model.void_reason,
        voided_on: model.voided_on,
    })
}

pub(crate) fn invoice_to_active(invoice: &Invoice, now: DateTime<Utc>) -> invoices::ActiveModel {
    invoices::ActiveModel {
        id: Set(invoice.id.into_inner()),
        tenant_id: Set(invoice.tenant_id.into_inner()),
        client_id: Set(invoice.client_id.into_inner()),
        matter_id: Set(invoice.matter_id.map(MatterId::into_inner)),
        period_start: Set(invoice.period_start),
        period_end: Set(invoice.period_end),
        issue_date: Set(invoice.issue_date),
        due_date: Set(invoice.due_date),
        currency: Set(invoice.currency.code().to_string()),
        subtotal: Set(invoice.subtotal),
        discount_type: Set(invoice.discount_type.as_str().to_string()),
        discount_value: Set(invoice.discount_value),
        discount_amount: Set(invoice.discount_amount),
        retainer_applied: Set(invoice.retainer_applied),
        retainer_advance_id: Set(invoice.retainer_advance_id.map(AdvanceId::into_inner)),
        taxable_amount: Set(invoice.taxable_amount),
        vat_rate: Set(invoice.vat_rate),
        vat_amount: Set(invoice.vat_amount),
        total: Set(invoice.total),
        amount_paid: Set(invoice.amount_paid()),
        status: Set(invoice.status().as_str().to_string()),
        paid_date: Set(invoice.paid_date()),
        void_reason: Set(invoice.void_reason().map(str::to_string)),
        voided_on: Set(invoice.voided_on()),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub(crate) fn line_item_from_model(
    model: invoice_line_items::Model,
) -> Result<InvoiceLineItem, BillingError> {
    let item_type = ItemType::parse(&model.item_type)
        .ok_or_else(|| corrupt("invoice_line_item", model.id, "item_type", &model.item_type))?;
    Ok(InvoiceLineItem {
        id: LineItemId::from_uuid(model.id),
        invoice_id: InvoiceId::from_uuid(model.invoice_id),
        item_type,
        description: model.description,
        quantity: stored(model.quantity),
        unit: model.unit,
        rate: stored(model.rate),
        amount: stored(model.amount),
        source_time_entry_id: model.source_time_entry_id.map(TimeEntryId::from_uuid),
        source_expense_id: model.source_expense_id.map(ExpenseId::from_uuid),
        sort_order: model.sort_order,
    })
}

pub(crate) fn line_item_to_active(
    line: &InvoiceLineItem,
    tenant_id: TenantId,
    now: DateTime<Utc>,
) -> invoice_line_items::ActiveModel {
    invoice_line_items::ActiveModel {
        id: Set(line.id.into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        invoice_id: Set(line.invoice_id.into_inner()),
        item_type: Set(line.item_type.as_str().to_string()),
        description: Set(line.description.clone()),
        quantity: Set(line.quantity),
        unit: Set(line.unit.clone()),
        rate: Set(line.rate),
        amount: Set(line.amount),
        source_time_entry_id: Set(line.source_time_entry_id.map(TimeEntryId::into_inner)),
        source_expense_id: Set(line.source_expense_id.map(ExpenseId::into_inner)),
        sort_order: Set(line.sort_order),
        created_at: Set(now),
    }
}
