//! Invoice composition.
//!
//! Turns unbilled time entries, expenses and manual lines into a priced draft
//! invoice. Every line is rounded half-up to the currency's minor units on
//! its own and the subtotal is the sum of those rounded lines, so an invoice
//! always reconciles with what is printed on it.
//!
//! Composition is pure: it returns the invoice together with the entries and
//! advance it changed, and the caller persists all of them in one
//! transaction or none of them.

use chrono::{Days, NaiveDate};
use lexledger_shared::types::{
    ClientId, Currency, InvoiceId, LineItemId, MatterId, Money, TenantId, round_half_up,
};
use rust_decimal::Decimal;
use std::collections::HashSet;

use super::types::{
    ComposeInvoiceInput, ComposeSources, ComposedInvoice, DiscountType, Invoice, InvoiceLineItem,
    InvoiceStatus, ItemType, ManualLineInput,
};
use crate::advance::Advance;
use crate::entries::{EntryStatus, Expense, TimeEntry};
use crate::error::BillingError;

/// Decimal places quantities and percentages are stored with.
const QUANTITY_SCALE: u32 = 4;
/// Decimal places the VAT rate is stored with.
const VAT_RATE_SCALE: u32 = 6;

/// Composes draft invoices.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceComposer {
    payment_terms_days: u32,
}

impl Default for InvoiceComposer {
    fn default() -> Self {
        Self::new(30)
    }
}

/// Totals derived from the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    /// Sum of rounded lines.
    pub subtotal: Decimal,
    /// Discount in money.
    pub discount_amount: Decimal,
    /// Amount covered by an advance.
    pub retainer_applied: Decimal,
    /// What VAT is charged on.
    pub taxable_amount: Decimal,
    /// VAT in money.
    pub vat_amount: Decimal,
    /// Amount billed.
    pub total: Decimal,
}

impl InvoiceComposer {
    /// Creates a composer that dates invoices due `payment_terms_days` after issue.
    #[must_use]
    pub const fn new(payment_terms_days: u32) -> Self {
        Self { payment_terms_days }
    }

    /// Composes a draft invoice.
    ///
    /// `sources` holds the entries the request named (or every candidate in
    /// scope when it named none) and the advance it asked to draw on.
    ///
    /// # Errors
    ///
    /// - `Validation` for bad discounts, VAT, dates, manual lines, entries
    ///   outside the client or matter, and an empty selection
    /// - `AlreadyInvoiced` if a named entry is already on an invoice
    /// - `CurrencyMismatch` if the selection spans currencies, or the
    ///   advance is in another currency
    /// - `InsufficientBalance` if the retainer request exceeds the advance
    /// - `NotFound` if the advance is missing or belongs to another firm
    pub fn compose(
        &self,
        input: &ComposeInvoiceInput,
        sources: ComposeSources,
    ) -> Result<ComposedInvoice, BillingError> {
        validate_terms(input)?;

        let mut time_entries = select_time_entries(input, sources.time_entries)?;
        let mut expenses = select_expenses(input, sources.expenses)?;
        if time_entries.is_empty() && expenses.is_empty() && input.manual_lines.is_empty() {
            return Err(BillingError::validation(
                "entry_ids",
                "there is nothing to bill for this client",
            ));
        }

        let currency = resolve_currency(input.currency, &time_entries, &expenses)?;
        let invoice_id = InvoiceId::new();
        let line_items = build_lines(
            invoice_id,
            currency,
            &time_entries,
            &expenses,
            &input.manual_lines,
        )?;

        let subtotal = line_items.iter().map(|l| l.amount).sum::<Decimal>();
        let discount_amount =
            discount_amount(input.discount_type, input.discount_value, subtotal, currency)?;

        let mut advance = sources.advance;
        let retainer_applied = match (input.retainer, advance.as_mut()) {
            (None, _) => Decimal::ZERO,
            (Some(request), None) => {
                return Err(BillingError::not_found(
                    "advance",
                    request.advance_id.into_inner(),
                ));
            }
            (Some(request), Some(advance)) => {
                if advance.id() != request.advance_id {
                    return Err(BillingError::not_found(
                        "advance",
                        request.advance_id.into_inner(),
                    ));
                }
                apply_retainer(input, advance, request.amount, currency, subtotal - discount_amount)?
            }
        };

        let totals = compute_totals(
            subtotal,
            discount_amount,
            retainer_applied,
            input.vat_rate.unwrap_or(Decimal::ZERO),
            currency,
        );

        for entry in &mut time_entries {
            entry.mark_invoiced(invoice_id)?;
        }
        for expense in &mut expenses {
            expense.mark_invoiced(invoice_id)?;
        }

        let dates = time_entries
            .iter()
            .map(|e| e.date)
            .chain(expenses.iter().map(|e| e.date));
        let period_start = input
            .period_start
            .or_else(|| dates.clone().min())
            .unwrap_or(input.issue_date);
        let period_end = input
            .period_end
            .or_else(|| dates.max())
            .unwrap_or(input.issue_date);
        if period_start > period_end {
            return Err(BillingError::validation(
                "period_start",
                "must not be after period_end",
            ));
        }

        let due_date = match input.due_date {
            Some(date) => date,
            None => self.default_due_date(input.issue_date)?,
        };

        let invoice = Invoice {
            id: invoice_id,
            tenant_id: input.tenant_id,
            client_id: input.client_id,
            matter_id: input.matter_id,
            period_start,
            period_end,
            issue_date: input.issue_date,
            due_date,
            currency,
            subtotal: totals.subtotal,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            discount_amount: totals.discount_amount,
            retainer_applied: totals.retainer_applied,
            retainer_advance_id: input
                .retainer
                .filter(|_| totals.retainer_applied > Decimal::ZERO)
                .map(|r| r.advance_id),
            taxable_amount: totals.taxable_amount,
            vat_rate: input.vat_rate.unwrap_or(Decimal::ZERO),
            vat_amount: totals.vat_amount,
            total: totals.total,
            amount_paid: Decimal::ZERO,
            status: InvoiceStatus::Draft,
            paid_date: None,
            void_reason: None,
            voided_on: None,
        };

        Ok(ComposedInvoice {
            invoice,
            line_items,
            time_entries,
            expenses,
            advance: advance.filter(|_| retainer_applied > Decimal::ZERO),
        })
    }

    fn default_due_date(&self, issue_date: NaiveDate) -> Result<NaiveDate, BillingError> {
        issue_date
            .checked_add_days(Days::new(u64::from(self.payment_terms_days)))
            .ok_or_else(|| BillingError::validation("issue_date", "due date is out of range"))
    }
}

/// Derives taxable amount, VAT and total from the subtotal.
///
/// `taxable = subtotal - discount - retainer` floored at zero,
/// `vat = round(taxable * vat_rate)`, `total = taxable + vat`.
#[must_use]
pub fn compute_totals(
    subtotal: Decimal,
    discount_amount: Decimal,
    retainer_applied: Decimal,
    vat_rate: Decimal,
    currency: Currency,
) -> InvoiceTotals {
    let taxable_amount = (subtotal - discount_amount - retainer_applied).max(Decimal::ZERO);
    let vat_amount = round_half_up(taxable_amount * vat_rate, currency);
    InvoiceTotals {
        subtotal,
        discount_amount,
        retainer_applied,
        taxable_amount,
        vat_amount,
        total: taxable_amount + vat_amount,
    }
}

/// Discount in money for a subtotal.
///
/// # Errors
///
/// `Validation` if the value is negative or finer than it can be stored, a
/// percentage is above 100, or the discount would exceed the subtotal.
pub fn discount_amount(
    discount_type: DiscountType,
    discount_value: Decimal,
    subtotal: Decimal,
    currency: Currency,
) -> Result<Decimal, BillingError> {
    if discount_value < Decimal::ZERO {
        return Err(BillingError::validation(
            "discount_value",
            "must not be negative",
        ));
    }
    let amount = match discount_type {
        DiscountType::None => Decimal::ZERO,
        DiscountType::Percent => {
            if discount_value > Decimal::ONE_HUNDRED {
                return Err(BillingError::validation(
                    "discount_value",
                    "a percentage discount cannot exceed 100",
                ));
            }
            BillingError::check_places("discount_value", discount_value, QUANTITY_SCALE)?;
            round_half_up(subtotal * discount_value / Decimal::ONE_HUNDRED, currency)
        }
        DiscountType::Fixed => {
            BillingError::check_scale("discount_value", Money::new(discount_value, currency))?;
            discount_value
        }
    };
    if amount > subtotal {
        return Err(BillingError::validation(
            "discount_value",
            format!("discount {amount} exceeds subtotal {subtotal}"),
        ));
    }
    Ok(amount)
}

fn validate_terms(input: &ComposeInvoiceInput) -> Result<(), BillingError> {
    if let Some(rate) = input.vat_rate
        && (rate < Decimal::ZERO || rate > Decimal::ONE)
    {
        return Err(BillingError::validation(
            "vat_rate",
            "must be a fraction between 0 and 1",
        ));
    }
    if let Some(rate) = input.vat_rate {
        BillingError::check_places("vat_rate", rate, VAT_RATE_SCALE)?;
    }
    if let Some(due) = input.due_date
        && due < input.issue_date
    {
        return Err(BillingError::validation(
            "due_date",
            "must not be before issue_date",
        ));
    }
    Ok(())
}

fn check_scope(
    input: &ComposeInvoiceInput,
    entry_id: uuid::Uuid,
    tenant_id: TenantId,
    client_id: ClientId,
    matter_id: MatterId,
) -> Result<(), BillingError> {
    if tenant_id != input.tenant_id {
        return Err(BillingError::not_found("entry", entry_id));
    }
    if client_id != input.client_id || input.matter_id.is_some_and(|m| m != matter_id) {
        return Err(BillingError::validation(
            "entry_ids",
            format!("entry {entry_id} is outside the invoiced client or matter"),
        ));
    }
    Ok(())
}

fn select_time_entries(
    input: &ComposeInvoiceInput,
    candidates: Vec<TimeEntry>,
) -> Result<Vec<TimeEntry>, BillingError> {
    let mut selected = match &input.time_entry_ids {
        Some(ids) => {
            let wanted: HashSet<_> = ids.iter().copied().collect();
            let mut picked = Vec::with_capacity(wanted.len());
            for entry in candidates.into_iter().filter(|e| wanted.contains(&e.id)) {
                let id = entry.id.into_inner();
                check_scope(input, id, entry.tenant_id, entry.client_id, entry.matter_id)?;
                if entry.status() == EntryStatus::Invoiced || entry.invoice_id().is_some() {
                    return Err(BillingError::AlreadyInvoiced { entry_id: id });
                }
                if !entry.billable {
                    return Err(BillingError::validation(
                        "entry_ids",
                        format!("time entry {id} is not billable"),
                    ));
                }
                picked.push(entry);
            }
            if let Some(missing) = ids.iter().find(|id| !picked.iter().any(|e| e.id == **id)) {
                return Err(BillingError::not_found("time_entry", missing.into_inner()));
            }
            picked
        }
        None => candidates
            .into_iter()
            .filter(|e| {
                e.is_unbilled()
                    && e.tenant_id == input.tenant_id
                    && e.client_id == input.client_id
                    && input.matter_id.is_none_or(|m| m == e.matter_id)
            })
            .collect(),
    };
    selected.sort_by_key(|e| (e.date, e.id));
    Ok(selected)
}

fn select_expenses(
    input: &ComposeInvoiceInput,
    candidates: Vec<Expense>,
) -> Result<Vec<Expense>, BillingError> {
    let mut selected = match &input.expense_ids {
        Some(ids) => {
            let wanted: HashSet<_> = ids.iter().copied().collect();
            let mut picked = Vec::with_capacity(wanted.len());
            for expense in candidates.into_iter().filter(|e| wanted.contains(&e.id)) {
                let id = expense.id.into_inner();
                check_scope(
                    input,
                    id,
                    expense.tenant_id,
                    expense.client_id,
                    expense.matter_id,
                )?;
                if expense.status() == EntryStatus::Invoiced || expense.invoice_id().is_some() {
                    return Err(BillingError::AlreadyInvoiced { entry_id: id });
                }
                if !expense.billable {
                    return Err(BillingError::validation(
                        "expense_ids",
                        format!("expense {id} is not billable"),
                    ));
                }
                picked.push(expense);
            }
            if let Some(missing) = ids.iter().find(|id| !picked.iter().any(|e| e.id == **id)) {
                return Err(BillingError::not_found("expense", missing.into_inner()));
            }
            picked
        }
        None => candidates
            .into_iter()
            .filter(|e| {
                e.is_unbilled()
                    && e.tenant_id == input.tenant_id
                    && e.client_id == input.client_id
                    && input.matter_id.is_none_or(|m| m == e.matter_id)
            })
            .collect(),
    };
    selected.sort_by_key(|e| (e.date, e.id));
    Ok(selected)
}

fn resolve_currency(
    requested: Option<Currency>,
    time_entries: &[TimeEntry],
    expenses: &[Expense],
) -> Result<Currency, BillingError> {
    let mut currencies = time_entries
        .iter()
        .map(|e| e.currency)
        .chain(expenses.iter().map(|e| e.currency));
    let Some(expected) = requested.or_else(|| currencies.next()) else {
        return Err(BillingError::validation(
            "currency",
            "required when only manual lines are billed",
        ));
    };
    let invoice_currency = Money::zero(expected);
    time_entries
        .iter()
        .map(|e| e.currency)
        .chain(expenses.iter().map(|e| e.currency))
        .try_for_each(|found| invoice_currency.ensure_same_currency(found))?;
    Ok(expected)
}

fn build_lines(
    invoice_id: InvoiceId,
    currency: Currency,
    time_entries: &[TimeEntry],
    expenses: &[Expense],
    manual_lines: &[ManualLineInput],
) -> Result<Vec<InvoiceLineItem>, BillingError> {
    let mut lines = Vec::with_capacity(time_entries.len() + expenses.len() + manual_lines.len());

    for entry in time_entries {
        lines.push(InvoiceLineItem {
            id: LineItemId::new(),
            invoice_id,
            item_type: ItemType::Time,
            description: format!("{} ({})", entry.narrative, entry.date.format("%Y-%m-%d")),
            quantity: entry.hours().round_dp(QUANTITY_SCALE),
            unit: "hours".to_string(),
            rate: entry.rate,
            amount: entry.line_amount().amount,
            source_time_entry_id: Some(entry.id),
            source_expense_id: None,
            sort_order: sort_order(lines.len()),
        });
    }

    for expense in expenses {
        let label = expense.description.as_deref().unwrap_or(&expense.category);
        lines.push(InvoiceLineItem {
            id: LineItemId::new(),
            invoice_id,
            item_type: ItemType::Expense,
            description: format!("{label} ({})", expense.date.format("%Y-%m-%d")),
            quantity: Decimal::ONE,
            unit: "each".to_string(),
            rate: expense.line_amount().amount,
            amount: expense.line_amount().amount,
            source_time_entry_id: None,
            source_expense_id: Some(expense.id),
            sort_order: sort_order(lines.len()),
        });
    }

    for (index, manual) in manual_lines.iter().enumerate() {
        let field = |name: &str| format!("manual_lines[{index}].{name}");
        if manual.description.trim().is_empty() {
            return Err(BillingError::validation(field("description"), "must not be empty"));
        }
        if manual.quantity < Decimal::ZERO || manual.rate < Decimal::ZERO {
            return Err(BillingError::validation(field("quantity"), "must not be negative"));
        }
        BillingError::check_places(&field("quantity"), manual.quantity, QUANTITY_SCALE)?;
        BillingError::check_scale(&field("rate"), Money::new(manual.rate, currency))?;
        let amount = match manual.amount {
            Some(amount) => {
                BillingError::check_scale(&field("amount"), Money::new(amount, currency))?;
                amount
            }
            None => round_half_up(manual.quantity * manual.rate, currency),
        };
        if amount < Decimal::ZERO {
            return Err(BillingError::validation(field("amount"), "must not be negative"));
        }
        lines.push(InvoiceLineItem {
            id: LineItemId::new(),
            invoice_id,
            item_type: ItemType::Manual,
            description: manual.description.trim().to_string(),
            quantity: manual.quantity,
            unit: manual.unit.clone(),
            rate: manual.rate,
            amount,
            source_time_entry_id: None,
            source_expense_id: None,
            sort_order: sort_order(lines.len()),
        });
    }

    Ok(lines)
}

fn sort_order(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}

/// Draws the requested retainer from the advance.
///
/// The whole request must be covered by the balance; the amount actually
/// applied is capped at what is left to pay after the discount.
fn apply_retainer(
    input: &ComposeInvoiceInput,
    advance: &mut Advance,
    requested: Decimal,
    currency: Currency,
    billable: Decimal,
) -> Result<Decimal, BillingError> {
    let advance_id = advance.id().into_inner();
    if advance.tenant_id() != input.tenant_id {
        return Err(BillingError::not_found("advance", advance_id));
    }
    if requested <= Decimal::ZERO {
        return Err(BillingError::validation(
            "retainer.amount",
            "must be greater than zero",
        ));
    }
    BillingError::check_scale("retainer.amount", Money::new(requested, currency))?;
    if !advance.advance_type().is_client_funds() {
        return Err(BillingError::validation(
            "retainer.advance_id",
            format!("a {} cannot be applied to an invoice", advance.advance_type()),
        ));
    }
    if advance.client_id() != Some(input.client_id) {
        return Err(BillingError::validation(
            "retainer.advance_id",
            format!("advance {advance_id} belongs to another client"),
        ));
    }
    Money::zero(currency).ensure_same_currency(advance.currency())?;

    let balance = advance.balance().amount;
    if requested > balance {
        return Err(BillingError::InsufficientBalance {
            advance_id,
            requested,
            available: balance,
        });
    }

    let applied = round_half_up(requested.min(billable.max(Decimal::ZERO)), currency);
    if applied > Decimal::ZERO {
        advance.consume(Money::new(applied, currency))?;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advance::{AdvanceOwner, AdvanceType, NewAdvance};
    use crate::entries::{NewExpense, NewTimeEntry};
    use crate::invoice::types::RetainerRequest;
    use lexledger_shared::types::LawyerId;
    use rust_decimal_macros::dec;

    struct Fixture {
        tenant_id: TenantId,
        client_id: ClientId,
        matter_id: MatterId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tenant_id: TenantId::new(),
                client_id: ClientId::new(),
                matter_id: MatterId::new(),
            }
        }

        fn time(&self, day: u32, minutes: Decimal, rate: Decimal) -> TimeEntry {
            TimeEntry::capture(
                NewTimeEntry {
                    tenant_id: self.tenant_id,
                    lawyer_id: LawyerId::new(),
                    client_id: self.client_id,
                    matter_id: self.matter_id,
                    date: date(day),
                    duration_minutes: minutes,
                    narrative: "Research".to_string(),
                    billable: true,
                    rate: None,
                },
                Money::new(rate, Currency::USD),
            )
            .unwrap()
        }

        fn expense(&self, day: u32, amount: Decimal, markup: Decimal) -> Expense {
            Expense::capture(NewExpense {
                tenant_id: self.tenant_id,
                client_id: self.client_id,
                matter_id: self.matter_id,
                date: date(day),
                category: "travel".to_string(),
                description: None,
                amount: Money::new(amount, Currency::USD),
                billable: true,
                markup_percent: markup,
            })
            .unwrap()
        }

        fn retainer(&self, amount: Decimal) -> Advance {
            Advance::deposit(NewAdvance {
                tenant_id: self.tenant_id,
                owner: AdvanceOwner::Client(self.client_id),
                matter_id: None,
                advance_type: AdvanceType::ClientRetainer,
                amount: Money::new(amount, Currency::USD),
                date_received: date(5),
            })
            .unwrap()
        }

        fn input(&self) -> ComposeInvoiceInput {
            ComposeInvoiceInput {
                tenant_id: self.tenant_id,
                client_id: self.client_id,
                matter_id: None,
                time_entry_ids: None,
                expense_ids: None,
                manual_lines: vec![],
                currency: None,
                discount_type: DiscountType::None,
                discount_value: Decimal::ZERO,
                vat_rate: None,
                retainer: None,
                issue_date: date(31),
                due_date: None,
                period_start: None,
                period_end: None,
            }
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn test_retainer_scenario() {
        let fx = Fixture::new();
        let advance = fx.retainer(dec!(5000));
        let mut input = fx.input();
        input.retainer = Some(RetainerRequest {
            advance_id: advance.id(),
            amount: dec!(300),
        });

        let composed = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(120), dec!(200))],
                    expenses: vec![],
                    advance: Some(advance),
                },
            )
            .unwrap();

        let inv = &composed.invoice;
        assert_eq!(inv.subtotal, dec!(400.00));
        assert_eq!(inv.retainer_applied, dec!(300.00));
        assert_eq!(inv.taxable_amount, dec!(100.00));
        assert_eq!(inv.vat_amount, Decimal::ZERO);
        assert_eq!(inv.total, dec!(100.00));
        assert_eq!(inv.status, InvoiceStatus::Draft);
        assert_eq!(inv.due_date, date(31) + Days::new(30));
        assert_eq!(inv.period_start, date(6));
        assert_eq!(
            composed.advance.unwrap().balance(),
            Money::new(dec!(4700.00), Currency::USD)
        );
        assert_eq!(composed.time_entries[0].status(), EntryStatus::Invoiced);
        assert_eq!(composed.time_entries[0].invoice_id(), Some(inv.id));
        assert_eq!(composed.line_items[0].unit, "hours");
        assert_eq!(composed.line_items[0].quantity, dec!(2));
    }

    #[test]
    fn test_retainer_request_above_balance_fails() {
        let fx = Fixture::new();
        let advance = fx.retainer(dec!(5000));
        let mut input = fx.input();
        input.retainer = Some(RetainerRequest {
            advance_id: advance.id(),
            amount: dec!(6000),
        });
        let entry = fx.time(6, dec!(120), dec!(200));

        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![entry.clone()],
                    expenses: vec![],
                    advance: Some(advance),
                },
            )
            .unwrap_err();
        assert!(matches!(err, BillingError::InsufficientBalance { .. }));
        assert_eq!(entry.status(), EntryStatus::Draft);
    }

    #[test]
    fn test_retainer_capped_at_amount_due() {
        let fx = Fixture::new();
        let advance = fx.retainer(dec!(5000));
        let mut input = fx.input();
        input.retainer = Some(RetainerRequest {
            advance_id: advance.id(),
            amount: dec!(1000),
        });

        let composed = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(120), dec!(200))],
                    expenses: vec![],
                    advance: Some(advance),
                },
            )
            .unwrap();
        assert_eq!(composed.invoice.retainer_applied, dec!(400.00));
        assert_eq!(composed.invoice.total, Decimal::ZERO);
        assert_eq!(composed.advance.unwrap().balance().amount, dec!(4600.00));
    }

    #[test]
    fn test_lawyer_advance_cannot_be_applied() {
        let fx = Fixture::new();
        let advance = Advance::deposit(NewAdvance {
            tenant_id: fx.tenant_id,
            owner: AdvanceOwner::Lawyer(LawyerId::new()),
            matter_id: None,
            advance_type: AdvanceType::LawyerAdvance,
            amount: Money::new(dec!(500), Currency::USD),
            date_received: date(6),
        })
        .unwrap();
        let mut input = fx.input();
        input.retainer = Some(RetainerRequest {
            advance_id: advance.id(),
            amount: dec!(100),
        });

        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(60), dec!(200))],
                    expenses: vec![],
                    advance: Some(advance),
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), "retainer.advance_id");
    }

    #[test]
    fn test_discount_and_vat() {
        let fx = Fixture::new();
        let mut input = fx.input();
        input.discount_type = DiscountType::Percent;
        input.discount_value = dec!(10);
        input.vat_rate = Some(dec!(0.11));

        let composed = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(90), dec!(300))],
                    expenses: vec![fx.expense(7, dec!(80), dec!(12.5))],
                    advance: None,
                },
            )
            .unwrap();

        let inv = &composed.invoice;
        // 450.00 + 90.00
        assert_eq!(inv.subtotal, dec!(540.00));
        assert_eq!(inv.discount_amount, dec!(54.00));
        assert_eq!(inv.taxable_amount, dec!(486.00));
        assert_eq!(inv.vat_amount, dec!(53.46));
        assert_eq!(inv.total, dec!(539.46));
        assert_eq!(composed.line_items.len(), 2);
        assert_eq!(composed.line_items[1].item_type, ItemType::Expense);
        assert_eq!(composed.line_items[1].sort_order, 1);
    }

    #[test]
    fn test_lines_rounded_before_summing() {
        let fx = Fixture::new();
        // three lines of 10 minutes at 100/h = 16.666.. each
        let entries = vec![
            fx.time(6, dec!(10), dec!(100)),
            fx.time(7, dec!(10), dec!(100)),
            fx.time(8, dec!(10), dec!(100)),
        ];
        let composed = InvoiceComposer::default()
            .compose(
                &fx.input(),
                ComposeSources {
                    time_entries: entries,
                    ..ComposeSources::default()
                },
            )
            .unwrap();
        // 3 x 16.67, not round(50.00)
        assert_eq!(composed.invoice.subtotal, dec!(50.01));
    }

    #[test]
    fn test_discount_above_subtotal_rejected() {
        let fx = Fixture::new();
        let mut input = fx.input();
        input.discount_type = DiscountType::Fixed;
        input.discount_value = dec!(500);
        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(60), dec!(100))],
                    ..ComposeSources::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), "discount_value");
    }

    #[test]
    fn test_mixed_currencies_rejected() {
        let fx = Fixture::new();
        let mut euro = fx.time(7, dec!(60), dec!(100));
        euro.currency = Currency::EUR;
        let err = InvoiceComposer::default()
            .compose(
                &fx.input(),
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(60), dec!(100)), euro],
                    ..ComposeSources::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, BillingError::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_implicit_selection_skips_invoiced_and_non_billable() {
        let fx = Fixture::new();
        let mut invoiced = fx.time(6, dec!(60), dec!(100));
        invoiced.mark_invoiced(InvoiceId::new()).unwrap();
        let mut unbillable = fx.time(7, dec!(60), dec!(100));
        unbillable.billable = false;
        let fresh = fx.time(8, dec!(60), dec!(100));

        let composed = InvoiceComposer::default()
            .compose(
                &fx.input(),
                ComposeSources {
                    time_entries: vec![invoiced, unbillable, fresh.clone()],
                    ..ComposeSources::default()
                },
            )
            .unwrap();
        assert_eq!(composed.time_entries.len(), 1);
        assert_eq!(composed.time_entries[0].id, fresh.id);
    }

    #[test]
    fn test_explicit_invoiced_entry_rejected() {
        let fx = Fixture::new();
        let mut invoiced = fx.time(6, dec!(60), dec!(100));
        invoiced.mark_invoiced(InvoiceId::new()).unwrap();
        let mut input = fx.input();
        input.time_entry_ids = Some(vec![invoiced.id]);

        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![invoiced],
                    ..ComposeSources::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, BillingError::AlreadyInvoiced { .. }));
    }

    #[test]
    fn test_entry_for_other_matter_rejected() {
        let fx = Fixture::new();
        let entry = fx.time(6, dec!(60), dec!(100));
        let mut input = fx.input();
        input.matter_id = Some(MatterId::new());
        input.time_entry_ids = Some(vec![entry.id]);

        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![entry],
                    ..ComposeSources::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), "entry_ids");
    }

    #[test]
    fn test_nothing_to_bill() {
        let fx = Fixture::new();
        let err = InvoiceComposer::default()
            .compose(&fx.input(), ComposeSources::default())
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation { .. }));
    }

    #[test]
    fn test_manual_lines_need_currency() {
        let fx = Fixture::new();
        let mut input = fx.input();
        input.manual_lines = vec![ManualLineInput {
            description: "Flat filing fee".to_string(),
            quantity: dec!(1),
            unit: "each".to_string(),
            rate: dec!(150),
            amount: None,
        }];
        let err = InvoiceComposer::default()
            .compose(&input, ComposeSources::default())
            .unwrap_err();
        assert_eq!(err.field(), "currency");

        input.currency = Some(Currency::USD);
        input.manual_lines[0].amount = Some(dec!(149.995));
        let err = InvoiceComposer::default()
            .compose(&input, ComposeSources::default())
            .unwrap_err();
        assert_eq!(err.field(), "manual_lines[0].amount");

        // 1.5 x 99.99 = 149.985, rounded up
        input.manual_lines[0].amount = None;
        input.manual_lines[0].quantity = dec!(1.5);
        input.manual_lines[0].rate = dec!(99.99);
        let composed = InvoiceComposer::default()
            .compose(&input, ComposeSources::default())
            .unwrap();
        assert_eq!(composed.invoice.subtotal, dec!(149.99));
        assert_eq!(composed.invoice.period_start, date(31));
        assert!(composed.advance.is_none());
    }

    #[test]
    fn test_vat_rate_range() {
        let fx = Fixture::new();
        let mut input = fx.input();
        input.vat_rate = Some(dec!(11));
        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(60), dec!(100))],
                    ..ComposeSources::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), "vat_rate");
    }

    #[test]
    fn test_sub_cent_inputs_rejected() {
        let fx = Fixture::new();
        let advance = fx.retainer(dec!(5000));
        let mut input = fx.input();
        input.retainer = Some(RetainerRequest {
            advance_id: advance.id(),
            amount: dec!(100.005),
        });
        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(60), dec!(200))],
                    expenses: vec![],
                    advance: Some(advance),
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), "retainer.amount");

        let mut input = fx.input();
        input.discount_type = DiscountType::Fixed;
        input.discount_value = dec!(10.001);
        let err = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![fx.time(6, dec!(60), dec!(200))],
                    ..ComposeSources::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), "discount_value");
    }

    #[test]
    fn test_yen_invoice_rounds_to_whole_yen() {
        let fx = Fixture::new();
        let entry = TimeEntry::capture(
            NewTimeEntry {
                tenant_id: fx.tenant_id,
                lawyer_id: LawyerId::new(),
                client_id: fx.client_id,
                matter_id: fx.matter_id,
                date: date(6),
                duration_minutes: dec!(50),
                narrative: "Contract review".to_string(),
                billable: true,
                rate: None,
            },
            Money::new(dec!(25000), Currency::JPY),
        )
        .unwrap();
        let mut input = fx.input();
        input.discount_type = DiscountType::Percent;
        input.discount_value = dec!(3);
        input.vat_rate = Some(dec!(0.1));

        let composed = InvoiceComposer::default()
            .compose(
                &input,
                ComposeSources {
                    time_entries: vec![entry],
                    ..ComposeSources::default()
                },
            )
            .unwrap();

        let inv = &composed.invoice;
        assert_eq!(inv.currency, Currency::JPY);
        // 50 minutes at 25000/h = 20833.33..
        assert_eq!(inv.subtotal, dec!(20833));
        // 3% = 624.99
        assert_eq!(inv.discount_amount, dec!(625));
        assert_eq!(inv.taxable_amount, dec!(20208));
        // 2020.8
        assert_eq!(inv.vat_amount, dec!(2021));
        assert_eq!(inv.total, dec!(22229));
    }

    #[test]
    fn test_compute_totals_floor() {
        let totals = compute_totals(dec!(100), dec!(60), dec!(40), dec!(0.2), Currency::USD);
        assert_eq!(totals.taxable_amount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
