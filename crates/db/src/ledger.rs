//! The billing ledger operation boundary.
//!
//! [`BillingLedger`] is what callers talk to. Each write runs in a single
//! database transaction. It re-checks row versions on commit and is retried
//! as a whole when a concurrent writer got there first. Writes never return a
//! bare error: every `BillingError` is logged at a level matching its kind
//! and turned into an [`OperationResult`]. Reads return `Result`.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use chrono::NaiveDate;
use lexledger_core::BillingError;
use lexledger_core::advance::{Advance, AdvanceOwner, AdvanceType, NewAdvance};
use lexledger_core::entries::{Expense, NewExpense, NewTimeEntry, TimeEntry};
use lexledger_core::invoice::{
    ComposeInvoiceInput, ComposeSources, Invoice, InvoiceComposer, InvoiceLineItem, InvoiceStatus,
    InvoiceWorkflow, PaymentOutcome, VoidKind,
};
use lexledger_core::parties::{
    ClientRef, LawyerRef, MatterRef, ensure_client_billable, ensure_matter_billable,
    resolve_hourly_rate,
};
use lexledger_core::revenue::{DateRange, RevenueClassifier, RevenueReport, RevenueScope};
use lexledger_shared::config::BillingConfig;
use lexledger_shared::types::{
    AdvanceId, ClientId, CurrencyTotals, ExpenseId, FailureKind, InvoiceId, LawyerId, MatterId,
    Money, OperationResult, PageRequest, PageResponse, TenantId, TimeEntryId,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::directory::PartyDirectory;
use crate::repositories::{
    AdvanceFilter, AdvanceRepository, EntryRepository, InvoiceFilter, InvoiceRepository,
    Versioned, advance, db_err, entry, invoice, with_retry,
};

/// Request to cancel or write off an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidInvoiceInput {
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Invoice to void.
    pub invoice_id: InvoiceId,
    /// Cancel or write off.
    pub kind: VoidKind,
    /// Why the invoice is voided; required.
    pub reason: String,
    /// Day the void takes effect.
    pub voided_on: NaiveDate,
    /// Allows voiding an invoice that is already paid.
    #[serde(default)]
    pub admin_override: bool,
}

/// An invoice as listed, with its status as of the listing date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    /// The stored invoice.
    pub invoice: Invoice,
    /// Stored status, or `overdue` when past due and unpaid.
    pub effective_status: InvoiceStatus,
}

/// An invoice with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDetail {
    /// The invoice header.
    pub invoice: Invoice,
    /// Line items in display order.
    pub line_items: Vec<InvoiceLineItem>,
}

/// Billing operations for one database and party directory.
pub struct BillingLedger<D> {
    db: DatabaseConnection,
    directory: D,
    composer: InvoiceComposer,
    max_commit_retries: u32,
    advances: AdvanceRepository,
    entries: EntryRepository,
    invoices: InvoiceRepository,
}

impl<D: PartyDirectory> BillingLedger<D> {
    /// Creates a ledger over `db`, resolving parties through `directory`.
    pub fn new(db: DatabaseConnection, directory: D, config: &BillingConfig) -> Self {
        Self {
            advances: AdvanceRepository::new(db.clone()),
            entries: EntryRepository::new(db.clone()),
            invoices: InvoiceRepository::new(db.clone()),
            db,
            directory,
            composer: InvoiceComposer::new(config.payment_terms_days),
            max_commit_retries: config.max_commit_retries,
        }
    }

    /// The party directory this ledger resolves against.
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    // ========================================================================
    // Advances
    // ========================================================================

    /// Records a deposit. The new advance is active with its full amount available.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, advance_type = %input.advance_type))]
    pub async fn deposit_advance(&self, input: NewAdvance) -> OperationResult {
        finish("deposit_advance", self.deposit_advance_checked(input).await)
    }

    async fn deposit_advance_checked(
        &self,
        input: NewAdvance,
    ) -> Result<OperationResult, BillingError> {
        match input.owner {
            AdvanceOwner::Client(client_id) => {
                let client = self.require_client(input.tenant_id, client_id).await?;
                ensure_client_billable(&client)?;
                if let Some(matter_id) = input.matter_id {
                    let matter = self.require_matter(input.tenant_id, matter_id).await?;
                    ensure_matter_billable(&matter, client_id)?;
                }
            }
            AdvanceOwner::Lawyer(lawyer_id) => {
                self.require_lawyer(input.tenant_id, lawyer_id).await?;
                if let Some(matter_id) = input.matter_id {
                    self.require_matter(input.tenant_id, matter_id).await?;
                }
            }
        }

        let deposited = Advance::deposit(input)?;
        let txn = self.db.begin().await.map_err(db_err)?;
        advance::insert(&txn, &deposited).await?;
        txn.commit().await.map_err(db_err)?;

        info!(advance_id = %deposited.id(), amount = %deposited.amount(), "advance deposited");
        Ok(OperationResult::ok(deposited.id().into_inner()).with_data(balance_data(&deposited)))
    }

    /// Draws `amount` down from an advance.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn consume_advance(
        &self,
        tenant_id: TenantId,
        advance_id: AdvanceId,
        amount: Money,
    ) -> OperationResult {
        let result = with_retry("consume_advance", self.max_commit_retries, || {
            self.adjust_advance_once(tenant_id, advance_id, move |a| a.consume(amount))
        })
        .await;
        finish("consume_advance", result)
    }

    /// Returns `amount` of an advance to its owner.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn refund_advance(
        &self,
        tenant_id: TenantId,
        advance_id: AdvanceId,
        amount: Money,
    ) -> OperationResult {
        let result = with_retry("refund_advance", self.max_commit_retries, || {
            self.adjust_advance_once(tenant_id, advance_id, move |a| a.refund(amount))
        })
        .await;
        finish("refund_advance", result)
    }

    async fn adjust_advance_once<F>(
        &self,
        tenant_id: TenantId,
        advance_id: AdvanceId,
        change: F,
    ) -> Result<OperationResult, BillingError>
    where
        F: FnOnce(&mut Advance) -> Result<Money, BillingError>,
    {
        let txn = self.db.begin().await.map_err(db_err)?;
        let Versioned {
            value: mut held,
            version,
        } = advance::load(&txn, tenant_id, advance_id)
            .await?
            .ok_or_else(|| BillingError::not_found("advance", advance_id.into_inner()))?;

        let balance = change(&mut held)?;
        advance::save(&txn, &held, version).await?;
        txn.commit().await.map_err(db_err)?;

        info!(%advance_id, %balance, status = %held.status(), "advance balance changed");
        Ok(OperationResult::ok(advance_id.into_inner()).with_data(balance_data(&held)))
    }

    /// Remaining balance across a client's advances of one type, per currency.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn outstanding_balance(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        advance_type: &AdvanceType,
    ) -> Result<CurrencyTotals, BillingError> {
        let filter = AdvanceFilter {
            client_id: Some(client_id),
            advance_type: Some(advance_type.clone()),
        };
        let advances = self
            .advances
            .list(tenant_id, &filter)
            .await
            .inspect_err(|err| log_failure("outstanding_balance", err))?;
        Ok(lexledger_core::advance::outstanding_balance(
            &advances,
            client_id,
            advance_type,
        ))
    }

    /// Finds an advance.
    pub async fn find_advance(
        &self,
        tenant_id: TenantId,
        advance_id: AdvanceId,
    ) -> Result<Option<Advance>, BillingError> {
        self.advances
            .find(tenant_id, advance_id)
            .await
            .inspect_err(|err| log_failure("find_advance", err))
    }

    /// Lists advances matching `filter`, oldest first.
    pub async fn list_advances(
        &self,
        tenant_id: TenantId,
        filter: &AdvanceFilter,
    ) -> Result<Vec<Advance>, BillingError> {
        self.advances
            .list(tenant_id, filter)
            .await
            .inspect_err(|err| log_failure("list_advances", err))
    }

    // ========================================================================
    // Intake
    // ========================================================================

    /// Captures a time entry, fixing its rate and currency now.
    ///
    /// Without an explicit rate the matter's custom rate applies, else the
    /// lawyer's standard rate; pro-bono matters bill at zero.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, matter_id = %input.matter_id))]
    pub async fn record_time_entry(&self, input: NewTimeEntry) -> OperationResult {
        finish("record_time_entry", self.record_time_entry_checked(input).await)
    }

    async fn record_time_entry_checked(
        &self,
        input: NewTimeEntry,
    ) -> Result<OperationResult, BillingError> {
        let client = self.require_client(input.tenant_id, input.client_id).await?;
        ensure_client_billable(&client)?;
        let matter = self.require_matter(input.tenant_id, input.matter_id).await?;
        ensure_matter_billable(&matter, input.client_id)?;
        let lawyer = self.require_lawyer(input.tenant_id, input.lawyer_id).await?;

        let rate = input
            .rate
            .unwrap_or_else(|| resolve_hourly_rate(&matter, &lawyer));
        let captured = TimeEntry::capture(input, rate)?;
        let txn = self.db.begin().await.map_err(db_err)?;
        entry::insert_time_entry(&txn, &captured).await?;
        txn.commit().await.map_err(db_err)?;

        debug!(entry_id = %captured.id, rate = %captured.rate, "time entry recorded");
        Ok(OperationResult::ok(captured.id.into_inner()).with_data(json!({
            "rate": captured.rate,
            "currency": captured.currency,
            "amount": captured.line_amount().amount,
            "status": captured.status(),
        })))
    }

    /// Captures a disbursement to be billed on to the client.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, matter_id = %input.matter_id))]
    pub async fn record_expense(&self, input: NewExpense) -> OperationResult {
        finish("record_expense", self.record_expense_checked(input).await)
    }

    async fn record_expense_checked(
        &self,
        input: NewExpense,
    ) -> Result<OperationResult, BillingError> {
        let client = self.require_client(input.tenant_id, input.client_id).await?;
        ensure_client_billable(&client)?;
        let matter = self.require_matter(input.tenant_id, input.matter_id).await?;
        ensure_matter_billable(&matter, input.client_id)?;

        let captured = Expense::capture(input)?;
        let txn = self.db.begin().await.map_err(db_err)?;
        entry::insert_expense(&txn, &captured).await?;
        txn.commit().await.map_err(db_err)?;

        debug!(expense_id = %captured.id, "expense recorded");
        Ok(OperationResult::ok(captured.id.into_inner()).with_data(json!({
            "amount": captured.line_amount().amount,
            "currency": captured.currency,
            "status": captured.status(),
        })))
    }

    /// Finds a time entry.
    pub async fn find_time_entry(
        &self,
        tenant_id: TenantId,
        entry_id: TimeEntryId,
    ) -> Result<Option<TimeEntry>, BillingError> {
        self.entries
            .find_time_entry(tenant_id, entry_id)
            .await
            .inspect_err(|err| log_failure("find_time_entry", err))
    }

    /// Finds an expense.
    pub async fn find_expense(
        &self,
        tenant_id: TenantId,
        expense_id: ExpenseId,
    ) -> Result<Option<Expense>, BillingError> {
        self.entries
            .find_expense(tenant_id, expense_id)
            .await
            .inspect_err(|err| log_failure("find_expense", err))
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Composes a draft invoice from unbilled work.
    ///
    /// Creating the invoice, marking its entries invoiced and drawing down
    /// the retainer commit together or not at all.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, client_id = %input.client_id))]
    pub async fn compose_invoice(&self, input: ComposeInvoiceInput) -> OperationResult {
        finish("compose_invoice", self.compose_invoice_checked(&input).await)
    }

    async fn compose_invoice_checked(
        &self,
        input: &ComposeInvoiceInput,
    ) -> Result<OperationResult, BillingError> {
        let client = self.require_client(input.tenant_id, input.client_id).await?;
        ensure_client_billable(&client)?;
        if let Some(matter_id) = input.matter_id {
            let matter = self.require_matter(input.tenant_id, matter_id).await?;
            ensure_matter_billable(&matter, input.client_id)?;
        }

        with_retry("compose_invoice", self.max_commit_retries, || {
            self.compose_invoice_once(input)
        })
        .await
    }

    async fn compose_invoice_once(
        &self,
        input: &ComposeInvoiceInput,
    ) -> Result<OperationResult, BillingError> {
        let tenant_id = input.tenant_id;
        let txn = self.db.begin().await.map_err(db_err)?;

        let time_rows = match &input.time_entry_ids {
            Some(ids) => entry::load_time_entries(&txn, tenant_id, ids).await?,
            None => {
                entry::unbilled_time_entries(&txn, tenant_id, input.client_id, input.matter_id)
                    .await?
            }
        };
        let expense_rows = match &input.expense_ids {
            Some(ids) => entry::load_expenses(&txn, tenant_id, ids).await?,
            None => {
                entry::unbilled_expenses(&txn, tenant_id, input.client_id, input.matter_id).await?
            }
        };
        let advance_row = match input.retainer {
            Some(request) => advance::load(&txn, tenant_id, request.advance_id).await?,
            None => None,
        };

        let time_versions: HashMap<_, _> =
            time_rows.iter().map(|r| (r.value.id, r.version)).collect();
        let expense_versions: HashMap<_, _> =
            expense_rows.iter().map(|r| (r.value.id, r.version)).collect();
        let advance_version = advance_row.as_ref().map(|r| r.version);

        let composed = self.composer.compose(
            input,
            ComposeSources {
                time_entries: time_rows.into_iter().map(|r| r.value).collect(),
                expenses: expense_rows.into_iter().map(|r| r.value).collect(),
                advance: advance_row.map(|r| r.value),
            },
        )?;

        invoice::insert(&txn, &composed.invoice, &composed.line_items).await?;
        for billed in &composed.time_entries {
            let version = version_of(&time_versions, billed.id)?;
            entry::save_time_entry(&txn, billed, version).await?;
        }
        for billed in &composed.expenses {
            let version = version_of(&expense_versions, billed.id)?;
            entry::save_expense(&txn, billed, version).await?;
        }
        if let (Some(drawn), Some(version)) = (&composed.advance, advance_version) {
            advance::save(&txn, drawn, version).await?;
        }
        txn.commit().await.map_err(db_err)?;

        info!(
            invoice_id = %composed.invoice.id,
            lines = composed.line_items.len(),
            total = %composed.invoice.total,
            retainer_applied = %composed.invoice.retainer_applied,
            "invoice composed"
        );
        Ok(OperationResult::ok(composed.invoice.id.into_inner())
            .with_data(invoice_data(&composed.invoice)))
    }

    /// Sends a draft invoice.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn send_invoice(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> OperationResult {
        let result = with_retry("send_invoice", self.max_commit_retries, || {
            self.transition_once(tenant_id, invoice_id, |invoice| {
                InvoiceWorkflow::send(invoice).map(|()| true)
            })
        })
        .await;
        finish("send_invoice", result)
    }

    /// Records a payment received on `date`.
    ///
    /// A payment against an invoice that is already paid changes nothing and
    /// still reports success.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn record_payment(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        amount: Money,
        date: NaiveDate,
    ) -> OperationResult {
        let result = with_retry("record_payment", self.max_commit_retries, || {
            self.transition_once(tenant_id, invoice_id, move |invoice| {
                match InvoiceWorkflow::record_payment(invoice, amount, date)? {
                    PaymentOutcome::Applied { .. } => Ok(true),
                    PaymentOutcome::AlreadyPaid => {
                        debug!(%invoice_id, "invoice already paid, payment ignored");
                        Ok(false)
                    }
                }
            })
        })
        .await;
        finish("record_payment", result)
    }

    /// Loads an invoice, applies `transition`, and writes it back when the
    /// transition reports a change.
    async fn transition_once<F>(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        transition: F,
    ) -> Result<OperationResult, BillingError>
    where
        F: FnOnce(&mut Invoice) -> Result<bool, BillingError>,
    {
        let txn = self.db.begin().await.map_err(db_err)?;
        let Versioned {
            value: mut current,
            version,
        } = invoice::load(&txn, tenant_id, invoice_id)
            .await?
            .ok_or_else(|| BillingError::not_found("invoice", invoice_id.into_inner()))?;

        if transition(&mut current)? {
            invoice::save(&txn, &current, version).await?;
            txn.commit().await.map_err(db_err)?;
            info!(%invoice_id, status = %current.status(), "invoice updated");
        }
        Ok(OperationResult::ok(invoice_id.into_inner()).with_data(invoice_data(&current)))
    }

    /// Cancels or writes off an invoice.
    ///
    /// Its entries return to draft and any retainer it drew is reinstated on
    /// the advance, in the same transaction as the status change.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, invoice_id = %input.invoice_id))]
    pub async fn void_invoice(&self, input: VoidInvoiceInput) -> OperationResult {
        let result = with_retry("void_invoice", self.max_commit_retries, || {
            self.void_invoice_once(&input)
        })
        .await;
        finish("void_invoice", result)
    }

    async fn void_invoice_once(
        &self,
        input: &VoidInvoiceInput,
    ) -> Result<OperationResult, BillingError> {
        let tenant_id = input.tenant_id;
        let txn = self.db.begin().await.map_err(db_err)?;
        let Versioned {
            value: mut voided,
            version: invoice_version,
        } = invoice::load(&txn, tenant_id, input.invoice_id)
            .await?
            .ok_or_else(|| BillingError::not_found("invoice", input.invoice_id.into_inner()))?;
        let lines = invoice::load_line_items(&txn, tenant_id, input.invoice_id).await?;

        let reversal = InvoiceWorkflow::void(
            &mut voided,
            &lines,
            input.kind,
            &input.reason,
            input.voided_on,
            input.admin_override,
        )?;

        let time_rows = entry::load_time_entries(&txn, tenant_id, &reversal.time_entry_ids).await?;
        if time_rows.len() != reversal.time_entry_ids.len() {
            return Err(BillingError::Internal(format!(
                "invoice {} references time entries that no longer exist",
                voided.id
            )));
        }
        for Versioned { value, version } in time_rows {
            let mut released = value;
            released.release(voided.id)?;
            entry::save_time_entry(&txn, &released, version).await?;
        }

        let expense_rows = entry::load_expenses(&txn, tenant_id, &reversal.expense_ids).await?;
        if expense_rows.len() != reversal.expense_ids.len() {
            return Err(BillingError::Internal(format!(
                "invoice {} references expenses that no longer exist",
                voided.id
            )));
        }
        for Versioned { value, version } in expense_rows {
            let mut released = value;
            released.release(voided.id)?;
            entry::save_expense(&txn, &released, version).await?;
        }

        if let Some((advance_id, amount)) = reversal.retainer {
            let Versioned {
                value: mut restored,
                version,
            } = advance::load(&txn, tenant_id, advance_id)
                .await?
                .ok_or_else(|| {
                    BillingError::Internal(format!(
                        "invoice {} drew on advance {advance_id} which no longer exists",
                        voided.id
                    ))
                })?;
            restored.reinstate(amount)?;
            advance::save(&txn, &restored, version).await?;
        }

        invoice::save(&txn, &voided, invoice_version).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            invoice_id = %voided.id,
            status = %voided.status(),
            released_time_entries = reversal.time_entry_ids.len(),
            released_expenses = reversal.expense_ids.len(),
            "invoice voided"
        );
        Ok(OperationResult::ok(voided.id.into_inner()).with_data(json!({
            "status": voided.status(),
            "released_time_entries": reversal.time_entry_ids,
            "released_expenses": reversal.expense_ids,
            "retainer_reinstated": reversal.retainer.map(|(_, amount)| amount.amount),
        })))
    }

    /// Finds an invoice with its line items.
    pub async fn find_invoice(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<InvoiceDetail>, BillingError> {
        let Some(found) = self
            .invoices
            .find(tenant_id, invoice_id)
            .await
            .inspect_err(|err| log_failure("find_invoice", err))?
        else {
            return Ok(None);
        };
        let line_items = self
            .invoices
            .line_items(tenant_id, invoice_id)
            .await
            .inspect_err(|err| log_failure("find_invoice", err))?;
        Ok(Some(InvoiceDetail {
            invoice: found,
            line_items,
        }))
    }

    /// Lists invoices with their effective status as of `filter.as_of`.
    #[instrument(skip(self, filter, page), fields(tenant_id = %tenant_id, status = ?filter.status))]
    pub async fn list_invoices(
        &self,
        tenant_id: TenantId,
        filter: &InvoiceFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<InvoiceSummary>, BillingError> {
        let (rows, total) = self
            .invoices
            .list(tenant_id, filter, page)
            .await
            .inspect_err(|err| log_failure("list_invoices", err))?;
        let data = rows
            .into_iter()
            .map(|invoice| InvoiceSummary {
                effective_status: invoice.effective_status(filter.as_of),
                invoice,
            })
            .collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    // ========================================================================
    // Revenue
    // ========================================================================

    /// Firm revenue received in `period`, per currency.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn revenue_for_period(
        &self,
        tenant_id: TenantId,
        period: DateRange,
        scope: RevenueScope,
    ) -> Result<RevenueReport, BillingError> {
        let advances = self
            .advances
            .received_between(tenant_id, period.start, period.end)
            .await
            .inspect_err(|err| log_failure("revenue_for_period", err))?;
        let invoices = self
            .invoices
            .paid_between(tenant_id, period.start, period.end)
            .await
            .inspect_err(|err| log_failure("revenue_for_period", err))?;

        let report =
            RevenueClassifier::revenue_for_period(tenant_id, period, scope, &advances, &invoices);
        debug!(currencies = report.by_currency.len(), "revenue computed");
        Ok(report)
    }

    // ========================================================================
    // Directory lookups
    // ========================================================================

    async fn require_client(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
    ) -> Result<ClientRef, BillingError> {
        self.directory
            .client(tenant_id, client_id)
            .await?
            .ok_or_else(|| BillingError::not_found("client", client_id.into_inner()))
    }

    async fn require_matter(
        &self,
        tenant_id: TenantId,
        matter_id: MatterId,
    ) -> Result<MatterRef, BillingError> {
        self.directory
            .matter(tenant_id, matter_id)
            .await?
            .ok_or_else(|| BillingError::not_found("matter", matter_id.into_inner()))
    }

    async fn require_lawyer(
        &self,
        tenant_id: TenantId,
        lawyer_id: LawyerId,
    ) -> Result<LawyerRef, BillingError> {
        self.directory
            .lawyer(tenant_id, lawyer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("lawyer", lawyer_id.into_inner()))
    }
}

fn version_of<K>(versions: &HashMap<K, i64>, id: K) -> Result<i64, BillingError>
where
    K: Eq + Hash + Display,
{
    versions
        .get(&id)
        .copied()
        .ok_or_else(|| BillingError::Internal(format!("entry {id} was billed but never loaded")))
}

fn balance_data(advance: &Advance) -> serde_json::Value {
    json!({
        "balance_remaining": advance.balance().amount,
        "currency": advance.currency(),
        "status": advance.status(),
    })
}

fn invoice_data(invoice: &Invoice) -> serde_json::Value {
    json!({
        "status": invoice.status(),
        "currency": invoice.currency,
        "subtotal": invoice.subtotal,
        "discount_amount": invoice.discount_amount,
        "retainer_applied": invoice.retainer_applied,
        "vat_amount": invoice.vat_amount,
        "total": invoice.total,
        "amount_paid": invoice.amount_paid(),
        "paid_date": invoice.paid_date(),
    })
}

/// Turns an operation outcome into a boundary result, logging failures.
fn finish(operation: &'static str, result: Result<OperationResult, BillingError>) -> OperationResult {
    result.unwrap_or_else(|err| {
        log_failure(operation, &err);
        OperationResult::failure(err.kind(), err.to_field_errors())
    })
}

fn log_failure(operation: &str, err: &BillingError) {
    let code = err.error_code();
    match err.kind() {
        FailureKind::Validation | FailureKind::NotFound => {
            debug!(operation, code, error = %err, "operation rejected");
        }
        FailureKind::BusinessRule => info!(operation, code, error = %err, "operation refused"),
        FailureKind::Conflict => warn!(operation, code, error = %err, "operation abandoned"),
        FailureKind::System => error!(operation, code, error = %err, "operation failed"),
    }
}
