//! Read-only views of the clients, matters and lawyers the ledger bills for.
//!
//! These records are owned by the practice-management side of the system.
//! The ledger only reads the handful of fields it needs: whether a client or
//! matter is still active, the matter's billing currency and fee arrangement,
//! and the lawyer's hourly rate.

use lexledger_shared::types::{ClientId, Currency, LawyerId, MatterId, Money, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BillingError;

/// How a matter is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeArrangement {
    /// Time is billed at hourly rates.
    Hourly,
    /// A fixed fee agreed up front; time is still tracked at hourly rates.
    FixedFee,
    /// Fee contingent on outcome; time is tracked at hourly rates.
    Contingency,
    /// Work done free of charge.
    ProBono,
}

/// A client as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    /// Client id.
    pub id: ClientId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// False once the client has been soft-deleted.
    pub active: bool,
}

/// A matter as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatterRef {
    /// Matter id.
    pub id: MatterId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// The client the matter belongs to.
    pub client_id: ClientId,
    /// False once the matter has been closed or soft-deleted.
    pub active: bool,
    /// Billing currency of the matter.
    pub currency: Currency,
    /// Fee arrangement.
    pub fee_arrangement: FeeArrangement,
    /// Matter-specific hourly rate overriding the lawyer's own rate.
    pub custom_hourly_rate: Option<Decimal>,
}

/// A lawyer (timekeeper) as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawyerRef {
    /// Lawyer id.
    pub id: LawyerId,
    /// Owning firm.
    pub tenant_id: TenantId,
    /// Standard hourly rate.
    pub hourly_rate: Decimal,
    /// Currency of the standard hourly rate.
    pub hourly_rate_currency: Currency,
}

/// Rejects new billing activity against an inactive client.
///
/// Inactive clients stay readable for history; they just cannot be billed.
pub fn ensure_client_billable(client: &ClientRef) -> Result<(), BillingError> {
    if client.active {
        Ok(())
    } else {
        Err(BillingError::validation(
            "client_id",
            format!("client {} is inactive", client.id),
        ))
    }
}

/// Rejects billing against an inactive matter or one owned by another client.
pub fn ensure_matter_billable(matter: &MatterRef, client_id: ClientId) -> Result<(), BillingError> {
    if matter.client_id != client_id {
        return Err(BillingError::validation(
            "matter_id",
            format!("matter {} does not belong to client {client_id}", matter.id),
        ));
    }
    if !matter.active {
        return Err(BillingError::validation(
            "matter_id",
            format!("matter {} is inactive", matter.id),
        ));
    }
    Ok(())
}

/// Resolves the hourly rate for a new time entry.
///
/// Pro-bono matters bill at zero in the matter currency. Otherwise a
/// matter-specific rate wins (in the matter currency), falling back to the
/// lawyer's standard rate in the lawyer's rate currency. The result is
/// captured on the entry and never recomputed.
#[must_use]
pub fn resolve_hourly_rate(matter: &MatterRef, lawyer: &LawyerRef) -> Money {
    match (matter.fee_arrangement, matter.custom_hourly_rate) {
        (FeeArrangement::ProBono, _) => Money::zero(matter.currency),
        (_, Some(rate)) => Money::new(rate, matter.currency),
        (_, None) => Money::new(lawyer.hourly_rate, lawyer.hourly_rate_currency),
    }
}
