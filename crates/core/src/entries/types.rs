//! Captured work: time entries and expenses.
//!
//! Both start as `draft` and move to `invoiced` when exactly one invoice
//! consumes them. Voiding that invoice is the only way back to `draft`.

use chrono::NaiveDate;
use lexledger_shared::types::{
    ClientId, Currency, ExpenseId, InvoiceId, LawyerId, MatterId, Money, TenantId, TimeEntryId,
    round_half_up,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::BillingError;

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);
const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;
/// Decimal places durations and markups are stored with.
const STORED_PLACES: u32 = 4;

/// Billing status of a time entry or expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Not yet on any invoice.
    Draft,
    /// Consumed by exactly one invoice.
    Invoiced,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Invoiced => "invoiced",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "invoiced" => Some(Self::Invoiced),
            _ => None,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for capturing a time entry.
#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Who did the work.
    pub lawyer_id: LawyerId,
    /// Client billed.
    pub client_id: ClientId,
    /// Matter the work belongs to.
    pub matter_id: MatterId,
    /// Day the work was done.
    pub date: NaiveDate,
    /// Duration in minutes; fractions allowed.
    pub duration_minutes: Decimal,
    /// What was done.
    pub narrative: String,
    /// Whether the entry may be invoiced.
    pub billable: bool,
    /// Explicit rate; `None` resolves from the matter and lawyer.
    pub rate: Option<Money>,
}

/// A unit of lawyer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Entry id.
    pub id: TimeEntryId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Who did the work.
    pub lawyer_id: LawyerId,
    /// Client billed.
    pub client_id: ClientId,
    /// Matter the work belongs to.
    pub matter_id: MatterId,
    /// Day the work was done.
    pub date: NaiveDate,
    /// Duration in minutes.
    pub duration_minutes: Decimal,
    /// What was done.
    pub narrative: String,
    /// Whether the entry may be invoiced.
    pub billable: bool,
    /// Hourly rate captured at entry time.
    pub rate: Decimal,
    /// Currency of the rate.
    pub currency: Currency,
    status: EntryStatus,
    invoice_id: Option<InvoiceId>,
}

/// A stored time entry row, as read back from persistence.
#[derive(Debug, Clone)]
pub struct TimeEntryParts {
    /// Entry id.
    pub id: TimeEntryId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Who did the work.
    pub lawyer_id: LawyerId,
    /// Client billed.
    pub client_id: ClientId,
    /// Matter the work belongs to.
    pub matter_id: MatterId,
    /// Day the work was done.
    pub date: NaiveDate,
    /// Duration in minutes.
    pub duration_minutes: Decimal,
    /// What was done.
    pub narrative: String,
    /// Whether the entry may be invoiced.
    pub billable: bool,
    /// Hourly rate.
    pub rate: Decimal,
    /// Currency of the rate.
    pub currency: Currency,
    /// Billing status.
    pub status: EntryStatus,
    /// Invoice that consumed the entry.
    pub invoice_id: Option<InvoiceId>,
}

impl TimeEntry {
    /// Validates input and creates a draft entry at the given rate.
    pub fn capture(input: NewTimeEntry, rate: Money) -> Result<Self, BillingError> {
        if input.narrative.trim().is_empty() {
            return Err(BillingError::validation("narrative", "must not be empty"));
        }
        if input.duration_minutes < Decimal::ZERO {
            return Err(BillingError::validation(
                "duration_minutes",
                "must not be negative",
            ));
        }
        BillingError::check_places("duration_minutes", input.duration_minutes, STORED_PLACES)?;
        if rate.amount < Decimal::ZERO {
            return Err(BillingError::validation("rate", "must not be negative"));
        }
        BillingError::check_scale("rate", rate)?;

        Ok(Self {
            id: TimeEntryId::new(),
            tenant_id: input.tenant_id,
            lawyer_id: input.lawyer_id,
            client_id: input.client_id,
            matter_id: input.matter_id,
            date: input.date,
            duration_minutes: input.duration_minutes,
            narrative: input.narrative.trim().to_string(),
            billable: input.billable,
            rate: rate.amount,
            currency: rate.currency,
            status: EntryStatus::Draft,
            invoice_id: None,
        })
    }

    /// Rebuilds an entry from a stored row.
    ///
    /// An entry is invoiced exactly when it names its invoice; rows that
    /// disagree are rejected.
    pub fn from_parts(parts: TimeEntryParts) -> Result<Self, BillingError> {
        check_billing_state(parts.id.into_inner(), parts.status, parts.invoice_id)?;
        Ok(Self {
            id: parts.id,
            tenant_id: parts.tenant_id,
            lawyer_id: parts.lawyer_id,
            client_id: parts.client_id,
            matter_id: parts.matter_id,
            date: parts.date,
            duration_minutes: parts.duration_minutes,
            narrative: parts.narrative,
            billable: parts.billable,
            rate: parts.rate,
            currency: parts.currency,
            status: parts.status,
            invoice_id: parts.invoice_id,
        })
    }

    /// Billing status.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// Invoice that consumed this entry.
    #[must_use]
    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.invoice_id
    }

    /// Duration in hours, unrounded.
    #[must_use]
    pub fn hours(&self) -> Decimal {
        self.duration_minutes / MINUTES_PER_HOUR
    }

    /// Billed amount: `rate × minutes / 60`, rounded half-up to the
    /// currency's minor units.
    #[must_use]
    pub fn line_amount(&self) -> Money {
        Money::new(
            round_half_up(self.rate * self.duration_minutes / MINUTES_PER_HOUR, self.currency),
            self.currency,
        )
    }

    /// True if the entry can be picked up by the composer.
    #[must_use]
    pub fn is_unbilled(&self) -> bool {
        self.billable && self.status == EntryStatus::Draft
    }

    /// Marks the entry as consumed by `invoice_id`.
    pub fn mark_invoiced(&mut self, invoice_id: InvoiceId) -> Result<(), BillingError> {
        mark(&mut self.status, &mut self.invoice_id, invoice_id, self.id.into_inner())
    }

    /// Returns the entry to draft after its invoice was voided.
    pub fn release(&mut self, invoice_id: InvoiceId) -> Result<(), BillingError> {
        release(&mut self.status, &mut self.invoice_id, invoice_id, self.id.into_inner())
    }
}

/// Input for capturing an expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Client billed.
    pub client_id: ClientId,
    /// Matter the expense belongs to.
    pub matter_id: MatterId,
    /// Day the expense was incurred.
    pub date: NaiveDate,
    /// Expense category (court fees, travel, ...).
    pub category: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Amount spent.
    pub amount: Money,
    /// Whether the expense may be invoiced.
    pub billable: bool,
    /// Markup added when billing, in percent.
    pub markup_percent: Decimal,
}

/// A disbursement made on the client's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense id.
    pub id: ExpenseId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Client billed.
    pub client_id: ClientId,
    /// Matter the expense belongs to.
    pub matter_id: MatterId,
    /// Day the expense was incurred.
    pub date: NaiveDate,
    /// Expense category.
    pub category: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Amount spent.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: Currency,
    /// Whether the expense may be invoiced.
    pub billable: bool,
    /// Markup added when billing, in percent.
    pub markup_percent: Decimal,
    status: EntryStatus,
    invoice_id: Option<InvoiceId>,
}

/// A stored expense row, as read back from persistence.
#[derive(Debug, Clone)]
pub struct ExpenseParts {
    /// Expense id.
    pub id: ExpenseId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Client billed.
    pub client_id: ClientId,
    /// Matter the expense belongs to.
    pub matter_id: MatterId,
    /// Day the expense was incurred.
    pub date: NaiveDate,
    /// Expense category.
    pub category: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Amount spent.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: Currency,
    /// Whether the expense may be invoiced.
    pub billable: bool,
    /// Markup in percent.
    pub markup_percent: Decimal,
    /// Billing status.
    pub status: EntryStatus,
    /// Invoice that consumed the expense.
    pub invoice_id: Option<InvoiceId>,
}

impl Expense {
    /// Validates input and creates a draft expense.
    pub fn capture(input: NewExpense) -> Result<Self, BillingError> {
        if input.category.trim().is_empty() {
            return Err(BillingError::validation("category", "must not be empty"));
        }
        if input.amount.amount <= Decimal::ZERO {
            return Err(BillingError::validation("amount", "must be positive"));
        }
        BillingError::check_scale("amount", input.amount)?;
        if input.markup_percent < Decimal::ZERO {
            return Err(BillingError::validation(
                "markup_percent",
                "must not be negative",
            ));
        }
        BillingError::check_places("markup_percent", input.markup_percent, STORED_PLACES)?;

        Ok(Self {
            id: ExpenseId::new(),
            tenant_id: input.tenant_id,
            client_id: input.client_id,
            matter_id: input.matter_id,
            date: input.date,
            category: input.category.trim().to_string(),
            description: input.description,
            amount: input.amount.amount,
            currency: input.amount.currency,
            billable: input.billable,
            markup_percent: input.markup_percent,
            status: EntryStatus::Draft,
            invoice_id: None,
        })
    }

    /// Rebuilds an expense from a stored row.
    pub fn from_parts(parts: ExpenseParts) -> Result<Self, BillingError> {
        check_billing_state(parts.id.into_inner(), parts.status, parts.invoice_id)?;
        Ok(Self {
            id: parts.id,
            tenant_id: parts.tenant_id,
            client_id: parts.client_id,
            matter_id: parts.matter_id,
            date: parts.date,
            category: parts.category,
            description: parts.description,
            amount: parts.amount,
            currency: parts.currency,
            billable: parts.billable,
            markup_percent: parts.markup_percent,
            status: parts.status,
            invoice_id: parts.invoice_id,
        })
    }

    /// Billing status.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// Invoice that consumed this expense.
    #[must_use]
    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.invoice_id
    }

    /// Billed amount: `amount × (1 + markup/100)`, rounded half-up to the
    /// currency's minor units.
    #[must_use]
    pub fn line_amount(&self) -> Money {
        Money::new(
            round_half_up(
                self.amount * (ONE_HUNDRED + self.markup_percent) / ONE_HUNDRED,
                self.currency,
            ),
            self.currency,
        )
    }

    /// True if the expense can be picked up by the composer.
    #[must_use]
    pub fn is_unbilled(&self) -> bool {
        self.billable && self.status == EntryStatus::Draft
    }

    /// Marks the expense as consumed by `invoice_id`.
    pub fn mark_invoiced(&mut self, invoice_id: InvoiceId) -> Result<(), BillingError> {
        mark(&mut self.status, &mut self.invoice_id, invoice_id, self.id.into_inner())
    }

    /// Returns the expense to draft after its invoice was voided.
    pub fn release(&mut self, invoice_id: InvoiceId) -> Result<(), BillingError> {
        release(&mut self.status, &mut self.invoice_id, invoice_id, self.id.into_inner())
    }
}

fn check_billing_state(
    entry_id: Uuid,
    status: EntryStatus,
    invoice_id: Option<InvoiceId>,
) -> Result<(), BillingError> {
    if (status == EntryStatus::Invoiced) != invoice_id.is_some() {
        return Err(BillingError::Internal(format!(
            "entry {entry_id} is {status} but invoice is {invoice_id:?}"
        )));
    }
    Ok(())
}

fn mark(
    status: &mut EntryStatus,
    current: &mut Option<InvoiceId>,
    invoice_id: InvoiceId,
    entry_id: Uuid,
) -> Result<(), BillingError> {
    if *status == EntryStatus::Invoiced || current.is_some() {
        return Err(BillingError::AlreadyInvoiced { entry_id });
    }
    *status = EntryStatus::Invoiced;
    *current = Some(invoice_id);
    Ok(())
}

fn release(
    status: &mut EntryStatus,
    current: &mut Option<InvoiceId>,
    invoice_id: InvoiceId,
    entry_id: Uuid,
) -> Result<(), BillingError> {
    if *current != Some(invoice_id) {
        return Err(BillingError::Internal(format!(
            "entry {entry_id} is not held by invoice {invoice_id}"
        )));
    }
    *status = EntryStatus::Draft;
    *current = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_time(duration: Decimal) -> NewTimeEntry {
        NewTimeEntry {
            tenant_id: TenantId::new(),
            lawyer_id: LawyerId::new(),
            client_id: ClientId::new(),
            matter_id: MatterId::new(),
            date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            duration_minutes: duration,
            narrative: "Draft motion to dismiss".to_string(),
            billable: true,
            rate: None,
        }
    }

    fn new_expense(amount: Decimal, markup: Decimal) -> NewExpense {
        NewExpense {
            tenant_id: TenantId::new(),
            client_id: ClientId::new(),
            matter_id: MatterId::new(),
            date: NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
            category: "court_fees".to_string(),
            description: Some("Filing fee".to_string()),
            amount: Money::new(amount, Currency::USD),
            billable: true,
            markup_percent: markup,
        }
    }

    #[test]
    fn test_two_hours_at_200() {
        let entry =
            TimeEntry::capture(new_time(dec!(120)), Money::new(dec!(200), Currency::USD)).unwrap();
        assert_eq!(entry.hours(), dec!(2));
        assert_eq!(entry.line_amount(), Money::new(dec!(400.00), Currency::USD));
        assert_eq!(entry.status, EntryStatus::Draft);
    }

    #[test]
    fn test_time_amount_rounds_half_up() {
        // 7 minutes at 100/h = 11.6666.. -> 11.67
        let entry =
            TimeEntry::capture(new_time(dec!(7)), Money::new(dec!(100), Currency::USD)).unwrap();
        assert_eq!(entry.line_amount().amount, dec!(11.67));

        // 3 minutes at 250.10/h = 12.505 -> 12.51 (half-up, not half-even)
        let entry =
            TimeEntry::capture(new_time(dec!(3)), Money::new(dec!(250.10), Currency::USD)).unwrap();
        assert_eq!(entry.line_amount().amount, dec!(12.51));
    }

    #[test]
    fn test_sub_minute_duration_is_allowed() {
        let entry =
            TimeEntry::capture(new_time(dec!(0.5)), Money::new(dec!(240), Currency::USD)).unwrap();
        assert_eq!(entry.line_amount().amount, dec!(2.00));
    }

    #[test]
    fn test_time_entry_validation() {
        let mut input = new_time(dec!(30));
        input.narrative = "   ".to_string();
        let err = TimeEntry::capture(input, Money::new(dec!(100), Currency::USD)).unwrap_err();
        assert_eq!(err.field(), "narrative");

        let err = TimeEntry::capture(new_time(dec!(-1)), Money::new(dec!(100), Currency::USD))
            .unwrap_err();
        assert_eq!(err.field(), "duration_minutes");

        let err = TimeEntry::capture(new_time(dec!(10)), Money::new(dec!(-5), Currency::USD))
            .unwrap_err();
        assert_eq!(err.field(), "rate");
    }

    #[test]
    fn test_values_finer_than_storage_rejected() {
        let err = TimeEntry::capture(new_time(dec!(60)), Money::new(dec!(200.001), Currency::USD))
            .unwrap_err();
        assert_eq!(err.field(), "rate");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = TimeEntry::capture(new_time(dec!(0.00001)), Money::new(dec!(200), Currency::USD))
            .unwrap_err();
        assert_eq!(err.field(), "duration_minutes");

        let err = Expense::capture(new_expense(dec!(0.00001), dec!(0))).unwrap_err();
        assert_eq!(err.field(), "amount");

        let err = Expense::capture(new_expense(dec!(10), dec!(12.00001))).unwrap_err();
        assert_eq!(err.field(), "markup_percent");
    }

    #[test]
    fn test_yen_entries_bill_whole_yen() {
        let entry =
            TimeEntry::capture(new_time(dec!(7)), Money::new(dec!(30000), Currency::JPY)).unwrap();
        // 3500 exactly
        assert_eq!(entry.line_amount(), Money::new(dec!(3500), Currency::JPY));

        let entry =
            TimeEntry::capture(new_time(dec!(1)), Money::new(dec!(1000), Currency::JPY)).unwrap();
        // 16.666.. yen
        assert_eq!(entry.line_amount().amount, dec!(17));

        let mut input = new_expense(dec!(1), dec!(0));
        input.amount = Money::new(dec!(1.5), Currency::JPY);
        assert!(Expense::capture(input).is_err());
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_billing_state() {
        let entry =
            TimeEntry::capture(new_time(dec!(60)), Money::new(dec!(100), Currency::USD)).unwrap();
        let parts = |status, invoice_id| TimeEntryParts {
            id: entry.id,
            tenant_id: entry.tenant_id,
            lawyer_id: entry.lawyer_id,
            client_id: entry.client_id,
            matter_id: entry.matter_id,
            date: entry.date,
            duration_minutes: entry.duration_minutes,
            narrative: entry.narrative.clone(),
            billable: entry.billable,
            rate: entry.rate,
            currency: entry.currency,
            status,
            invoice_id,
        };

        let restored = TimeEntry::from_parts(parts(EntryStatus::Draft, None)).unwrap();
        assert_eq!(restored, entry);

        let invoice_id = InvoiceId::new();
        let invoiced =
            TimeEntry::from_parts(parts(EntryStatus::Invoiced, Some(invoice_id))).unwrap();
        assert_eq!(invoiced.invoice_id(), Some(invoice_id));

        assert!(TimeEntry::from_parts(parts(EntryStatus::Invoiced, None)).is_err());
        assert!(TimeEntry::from_parts(parts(EntryStatus::Draft, Some(invoice_id))).is_err());
    }

    #[test]
    fn test_expense_markup() {
        let expense = Expense::capture(new_expense(dec!(80), dec!(12.5))).unwrap();
        assert_eq!(expense.line_amount(), Money::new(dec!(90.00), Currency::USD));

        let expense = Expense::capture(new_expense(dec!(33.33), dec!(10))).unwrap();
        // 36.663 -> 36.66
        assert_eq!(expense.line_amount().amount, dec!(36.66));
    }

    #[test]
    fn test_expense_validation() {
        assert_eq!(
            Expense::capture(new_expense(dec!(0), dec!(0)))
                .unwrap_err()
                .field(),
            "amount"
        );
        assert_eq!(
            Expense::capture(new_expense(dec!(10), dec!(-1)))
                .unwrap_err()
                .field(),
            "markup_percent"
        );
    }

    #[test]
    fn test_entry_cannot_be_invoiced_twice() {
        let mut entry =
            TimeEntry::capture(new_time(dec!(60)), Money::new(dec!(100), Currency::USD)).unwrap();
        let first = InvoiceId::new();
        entry.mark_invoiced(first).unwrap();
        assert!(!entry.is_unbilled());

        let err = entry.mark_invoiced(InvoiceId::new()).unwrap_err();
        assert!(matches!(err, BillingError::AlreadyInvoiced { .. }));
        assert_eq!(entry.invoice_id, Some(first));
    }

    #[test]
    fn test_release_only_by_owning_invoice() {
        let mut expense = Expense::capture(new_expense(dec!(10), dec!(0))).unwrap();
        let owner = InvoiceId::new();
        expense.mark_invoiced(owner).unwrap();

        assert!(expense.release(InvoiceId::new()).is_err());
        assert_eq!(expense.status, EntryStatus::Invoiced);

        expense.release(owner).unwrap();
        assert_eq!(expense.status, EntryStatus::Draft);
        assert!(expense.invoice_id.is_none());
        assert!(expense.is_unbilled());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(EntryStatus::parse("INVOICED"), Some(EntryStatus::Invoiced));
        assert_eq!(EntryStatus::parse("draft"), Some(EntryStatus::Draft));
        assert_eq!(EntryStatus::parse("billed"), None);
    }
}
