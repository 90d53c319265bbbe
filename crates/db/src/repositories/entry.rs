//! Time entry and expense repository.

use chrono::Utc;
use lexledger_core::BillingError;
use lexledger_core::entries::{EntryStatus, Expense, TimeEntry};
use lexledger_shared::types::{ClientId, ExpenseId, InvoiceId, MatterId, TenantId, TimeEntryId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use super::mapping::{
    expense_from_model, expense_to_active, time_entry_from_model, time_entry_to_active,
};
use super::{Versioned, db_err, ensure_updated};
use crate::entities::{expenses, time_entries};

/// Read access to time entries and expenses.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    db: DatabaseConnection,
}

impl EntryRepository {
    /// Creates a new entry repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a time entry by id within a tenant.
    pub async fn find_time_entry(
        &self,
        tenant_id: TenantId,
        entry_id: TimeEntryId,
    ) -> Result<Option<TimeEntry>, BillingError> {
        let mut rows = load_time_entries(&self.db, tenant_id, &[entry_id]).await?;
        Ok(rows.pop().map(|row| row.value))
    }

    /// Finds an expense by id within a tenant.
    pub async fn find_expense(
        &self,
        tenant_id: TenantId,
        expense_id: ExpenseId,
    ) -> Result<Option<Expense>, BillingError> {
        let mut rows = load_expenses(&self.db, tenant_id, &[expense_id]).await?;
        Ok(rows.pop().map(|row| row.value))
    }

    /// Time entries billed on an invoice.
    pub async fn time_entries_on_invoice(
        &self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<TimeEntry>, BillingError> {
        time_entries::Entity::find()
            .filter(time_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(time_entries::Column::InvoiceId.eq(invoice_id.into_inner()))
            .order_by_asc(time_entries::Column::Date)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(time_entry_from_model)
            .collect()
    }
}

// ============================================================================
// Time entries
// ============================================================================

/// Loads the named time entries of a tenant with their row versions.
///
/// Ids that do not resolve for the tenant are simply absent from the result.
pub async fn load_time_entries<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    ids: &[TimeEntryId],
) -> Result<Vec<Versioned<TimeEntry>>, BillingError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    time_entries::Entity::find()
        .filter(time_entries::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(time_entries::Column::Id.is_in(ids.iter().copied().map(TimeEntryId::into_inner)))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(versioned_time_entry)
        .collect()
}

/// Loads every unbilled, billable time entry for a client (and matter).
pub async fn unbilled_time_entries<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    client_id: ClientId,
    matter_id: Option<MatterId>,
) -> Result<Vec<Versioned<TimeEntry>>, BillingError> {
    let mut query = time_entries::Entity::find()
        .filter(time_entries::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(time_entries::Column::ClientId.eq(client_id.into_inner()))
        .filter(time_entries::Column::Status.eq(EntryStatus::Draft.as_str()))
        .filter(time_entries::Column::Billable.eq(true))
        .filter(time_entries::Column::InvoiceId.is_null());
    if let Some(matter_id) = matter_id {
        query = query.filter(time_entries::Column::MatterId.eq(matter_id.into_inner()));
    }
    query
        .order_by_asc(time_entries::Column::Date)
        .order_by_asc(time_entries::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(versioned_time_entry)
        .collect()
}

fn versioned_time_entry(
    model: time_entries::Model,
) -> Result<Versioned<TimeEntry>, BillingError> {
    let version = model.version;
    Ok(Versioned {
        value: time_entry_from_model(model)?,
        version,
    })
}

/// Inserts a newly captured time entry at version 0.
pub async fn insert_time_entry<C: ConnectionTrait>(
    conn: &C,
    entry: &TimeEntry,
) -> Result<(), BillingError> {
    time_entries::Entity::insert(time_entry_to_active(entry, Utc::now()))
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Writes billing status and invoice link back if the row is still at
/// `expected_version`.
pub async fn save_time_entry<C: ConnectionTrait>(
    conn: &C,
    entry: &TimeEntry,
    expected_version: i64,
) -> Result<(), BillingError> {
    let result = time_entries::Entity::update_many()
        .col_expr(time_entries::Column::Status, Expr::value(entry.status().as_str()))
        .col_expr(
            time_entries::Column::InvoiceId,
            Expr::value(entry.invoice_id().map(InvoiceId::into_inner)),
        )
        .col_expr(time_entries::Column::Version, Expr::value(expected_version + 1))
        .col_expr(time_entries::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(time_entries::Column::Id.eq(entry.id.into_inner()))
        .filter(time_entries::Column::TenantId.eq(entry.tenant_id.into_inner()))
        .filter(time_entries::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_err)?;
    ensure_updated(result.rows_affected)
}

// ============================================================================
// Expenses
// ============================================================================

/// Loads the named expenses of a tenant with their row versions.
pub async fn load_expenses<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    ids: &[ExpenseId],
) -> Result<Vec<Versioned<Expense>>, BillingError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    expenses::Entity::find()
        .filter(expenses::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(expenses::Column::Id.is_in(ids.iter().copied().map(ExpenseId::into_inner)))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(versioned_expense)
        .collect()
}

/// Loads every unbilled, billable expense for a client (and matter).
pub async fn unbilled_expenses<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    client_id: ClientId,
    matter_id: Option<MatterId>,
) -> Result<Vec<Versioned<Expense>>, BillingError> {
    let mut query = expenses::Entity::find()
        .filter(expenses::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(expenses::Column::ClientId.eq(client_id.into_inner()))
        .filter(expenses::Column::Status.eq(EntryStatus::Draft.as_str()))
        .filter(expenses::Column::Billable.eq(true))
        .filter(expenses::Column::InvoiceId.is_null());
    if let Some(matter_id) = matter_id {
        query = query.filter(expenses::Column::MatterId.eq(matter_id.into_inner()));
    }
    query
        .order_by_asc(expenses::Column::Date)
        .order_by_asc(expenses::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(versioned_expense)
        .collect()
}

fn versioned_expense(model: expenses::Model) -> Result<Versioned<Expense>, BillingError> {
    let version = model.version;
    Ok(Versioned {
        value: expense_from_model(model)?,
        version,
    })
}

/// Inserts a newly captured expense at version 0.
pub async fn insert_expense<C: ConnectionTrait>(
    conn: &C,
    expense: &Expense,
) -> Result<(), BillingError> {
    expenses::Entity::insert(expense_to_active(expense, Utc::now()))
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Writes billing status and invoice link back if the row is still at
/// `expected_version`.
pub async fn save_expense<C: ConnectionTrait>(
    conn: &C,
    expense: &Expense,
    expected_version: i64,
) -> Result<(), BillingError> {
    let result = expenses::Entity::update_many()
        .col_expr(expenses::Column::Status, Expr::value(expense.status().as_str()))
        .col_expr(
            expenses::Column::InvoiceId,
            Expr::value(expense.invoice_id().map(InvoiceId::into_inner)),
        )
        .col_expr(expenses::Column::Version, Expr::value(expected_version + 1))
        .col_expr(expenses::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(expenses::Column::Id.eq(expense.id.into_inner()))
        .filter(expenses::Column::TenantId.eq(expense.tenant_id.into_inner()))
        .filter(expenses::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_err)?;
    ensure_updated(result.rows_affected)
}
