//! Invoice repository.
//!
//! Overdue is never stored. Listing by `overdue` translates to "sent or
//! partly paid and past due" at the requested date, and listing by `sent` or
//! `partial` excludes the rows that would read as overdue.

use chrono::{NaiveDate, Utc};
use lexledger_core::BillingError;
use lexledger_core::invoice::{Invoice, InvoiceLineItem, InvoiceStatus};
use lexledger_shared::types::{ClientId, InvoiceId, MatterId, PageRequest, TenantId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};

use super::mapping::{invoice_from_model, invoice_to_active, line_item_from_model, line_item_to_active};
use super::{Versioned, db_err, ensure_updated};
use crate::entities::{invoice_line_items, invoices};

/// Filter for listing invoices.
#[derive(Debug, Clone)]
pub struct InvoiceFilter {
    /// Only invoices of this client.
    pub client_id: Option<ClientId>,
    /// Only invoices of this matter.
    pub matter_id: Option<MatterId>,
    /// Only invoices whose effective status on `as_of` is this one.
    pub status: Option<InvoiceStatus>,
    /// Date the effective status is evaluated at.
    pub as_of: NaiveDate,
}

impl InvoiceFilter {
    /// Every invoice, as of `as_of`.
    #[must_use]
    pub const fn as_of(as_of: NaiveDate) -> Self {
        Self {
            client_id: None,
            matter_id: None,
            status: None,
            as_of,
        }
    }

    fn condition(&self, tenant_id: TenantId) -> Condition {
        let mut condition =
            Condition::all().add(invoices::Column::TenantId.eq(tenant_id.into_inner()));
        if let Some(client_id) = self.client_id {
            condition = condition.add(invoices::Column::ClientId.eq(client_id.into_inner()));
        }
        if let Some(matter_id) = self.matter_id {
            condition = condition.add(invoices::Column::MatterId.eq(matter_id.into_inner()));
        }
        match self.status {
            None => condition,
            Some(InvoiceStatus::Overdue) => condition
                .add(invoices::Column::Status.is_in([
                    InvoiceStatus::Sent.as_str(),
                    InvoiceStatus::Partial.as_str(),
                ]))
                .add(invoices::Column::DueDate.lt(self.as_of)),
            Some(status @ (InvoiceStatus::Sent | InvoiceStatus::Partial)) => condition
                .add(invoices::Column::Status.eq(status.as_str()))
                .add(invoices::Column::DueDate.gte(self.as_of)),
            Some(status) => condition.add(invoices::Column::Status.eq(status.as_str())),
        }
    }
}

/// Read access to invoices and their line items.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an invoice by id within a tenant.
    pub async fn find(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<Invoice>, BillingError> {
        Ok(load(&self.db, tenant_id, invoice_id)
            .await?
            .map(|row| row.value))
    }

    /// Line items of an invoice in display order.
    pub async fn line_items(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceLineItem>, BillingError> {
        load_line_items(&self.db, tenant_id, invoice_id).await
    }

    /// One page of invoices matching `filter`, newest first, with the total
    /// number of matches.
    pub async fn list(
        &self,
        tenant_id: TenantId,
        filter: &InvoiceFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Invoice>, u64), BillingError> {
        let query = || -> Select<invoices::Entity> {
            invoices::Entity::find().filter(filter.condition(tenant_id))
        };

        let total = query().count(&self.db).await.map_err(db_err)?;
        let rows = query()
            .order_by_desc(invoices::Column::IssueDate)
            .order_by_desc(invoices::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(invoice_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((rows, total))
    }

    /// Invoices that reached `paid` with a paid date between `start` and
    /// `end`, both inclusive.
    pub async fn paid_between(
        &self,
        tenant_id: TenantId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>, BillingError> {
        invoices::Entity::find()
            .filter(invoices::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(invoices::Column::Status.eq(InvoiceStatus::Paid.as_str()))
            .filter(invoices::Column::PaidDate.gte(start))
            .filter(invoices::Column::PaidDate.lte(end))
            .order_by_asc(invoices::Column::PaidDate)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(invoice_from_model)
            .collect()
    }
}

/// Loads an invoice header with its row version.
pub async fn load<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    invoice_id: InvoiceId,
) -> Result<Option<Versioned<Invoice>>, BillingError> {
    let Some(model) = invoices::Entity::find_by_id(invoice_id.into_inner())
        .filter(invoices::Column::TenantId.eq(tenant_id.into_inner()))
        .one(conn)
        .await
        .map_err(db_err)?
    else {
        return Ok(None);
    };
    let version = model.version;
    Ok(Some(Versioned {
        value: invoice_from_model(model)?,
        version,
    }))
}

/// Loads the line items of an invoice in display order.
pub async fn load_line_items<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    invoice_id: InvoiceId,
) -> Result<Vec<InvoiceLineItem>, BillingError> {
    invoice_line_items::Entity::find()
        .filter(invoice_line_items::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(invoice_line_items::Column::InvoiceId.eq(invoice_id.into_inner()))
        .order_by_asc(invoice_line_items::Column::SortOrder)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(line_item_from_model)
        .collect()
}

/// Inserts a composed invoice and its line items.
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    invoice: &Invoice,
    line_items: &[InvoiceLineItem],
) -> Result<(), BillingError> {
    let now = Utc::now();
    invoices::Entity::insert(invoice_to_active(invoice, now))
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;

    if !line_items.is_empty() {
        invoice_line_items::Entity::insert_many(
            line_items
                .iter()
                .map(|line| line_item_to_active(line, invoice.tenant_id, now)),
        )
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

/// Writes status, payment and void fields back if the row is still at
/// `expected_version`. Totals are fixed at composition and never rewritten.
pub async fn save<C: ConnectionTrait>(
    conn: &C,
    invoice: &Invoice,
    expected_version: i64,
) -> Result<(), BillingError> {
    let result = invoices::Entity::update_many()
        .col_expr(invoices::Column::Status, Expr::value(invoice.status().as_str()))
        .col_expr(invoices::Column::AmountPaid, Expr::value(invoice.amount_paid()))
        .col_expr(invoices::Column::PaidDate, Expr::value(invoice.paid_date()))
        .col_expr(
            invoices::Column::VoidReason,
            Expr::value(invoice.void_reason().map(str::to_string)),
        )
        .col_expr(invoices::Column::VoidedOn, Expr::value(invoice.voided_on()))
        .col_expr(invoices::Column::Version, Expr::value(expected_version + 1))
        .col_expr(invoices::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(invoices::Column::Id.eq(invoice.id.into_inner()))
        .filter(invoices::Column::TenantId.eq(invoice.tenant_id.into_inner()))
        .filter(invoices::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_err)?;
    ensure_updated(result.rows_affected)
}
