//! Advance repository.

use chrono::{NaiveDate, Utc};
use lexledger_core::BillingError;
use lexledger_core::advance::{Advance, AdvanceType};
use lexledger_shared::types::{AdvanceId, ClientId, TenantId};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::mapping::{advance_from_model, advance_to_active};
use super::{Versioned, db_err, ensure_updated};
use crate::entities::advances;

/// Filter for listing advances.
#[derive(Debug, Clone, Default)]
pub struct AdvanceFilter {
    /// Only advances deposited by this client.
    pub client_id: Option<ClientId>,
    /// Only advances of this type.
    pub advance_type: Option<AdvanceType>,
}

/// Read access to advances.
#[derive(Debug, Clone)]
pub struct AdvanceRepository {
    db: DatabaseConnection,
}

impl AdvanceRepository {
    /// Creates a new advance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an advance by id within a tenant.
    pub async fn find(
        &self,
        tenant_id: TenantId,
        advance_id: AdvanceId,
    ) -> Result<Option<Advance>, BillingError> {
        Ok(load(&self.db, tenant_id, advance_id)
            .await?
            .map(|row| row.value))
    }

    /// Lists a tenant's advances, oldest deposit first.
    pub async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AdvanceFilter,
    ) -> Result<Vec<Advance>, BillingError> {
        let mut query =
            advances::Entity::find().filter(advances::Column::TenantId.eq(tenant_id.into_inner()));
        if let Some(client_id) = filter.client_id {
            query = query.filter(advances::Column::ClientId.eq(client_id.into_inner()));
        }
        if let Some(advance_type) = &filter.advance_type {
            query = query.filter(advances::Column::AdvanceType.eq(advance_type.to_string()));
        }

        query
            .order_by_asc(advances::Column::DateReceived)
            .order_by_asc(advances::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(advance_from_model)
            .collect()
    }

    /// Advances received between `start` and `end`, both inclusive.
    pub async fn received_between(
        &self,
        tenant_id: TenantId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Advance>, BillingError> {
        advances::Entity::find()
            .filter(advances::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(advances::Column::DateReceived.gte(start))
            .filter(advances::Column::DateReceived.lte(end))
            .order_by_asc(advances::Column::DateReceived)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(advance_from_model)
            .collect()
    }
}

/// Loads an advance with its row version.
pub async fn load<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    advance_id: AdvanceId,
) -> Result<Option<Versioned<Advance>>, BillingError> {
    let Some(model) = advances::Entity::find_by_id(advance_id.into_inner())
        .filter(advances::Column::TenantId.eq(tenant_id.into_inner()))
        .one(conn)
        .await
        .map_err(db_err)?
    else {
        return Ok(None);
    };
    let version = model.version;
    Ok(Some(Versioned {
        value: advance_from_model(model)?,
        version,
    }))
}

/// Inserts a freshly deposited advance at version 0.
pub async fn insert<C: ConnectionTrait>(conn: &C, advance: &Advance) -> Result<(), BillingError> {
    advances::Entity::insert(advance_to_active(advance, Utc::now()))
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Writes the balance and status back if the row is still at `expected_version`.
pub async fn save<C: ConnectionTrait>(
    conn: &C,
    advance: &Advance,
    expected_version: i64,
) -> Result<(), BillingError> {
    let result = advances::Entity::update_many()
        .col_expr(
            advances::Column::BalanceRemaining,
            Expr::value(advance.balance().amount),
        )
        .col_expr(advances::Column::Status, Expr::value(advance.status().as_str()))
        .col_expr(advances::Column::Version, Expr::value(expected_version + 1))
        .col_expr(advances::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(advances::Column::Id.eq(advance.id().into_inner()))
        .filter(advances::Column::TenantId.eq(advance.tenant_id().into_inner()))
        .filter(advances::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_err)?;
    ensure_updated(result.rows_affected)
}
