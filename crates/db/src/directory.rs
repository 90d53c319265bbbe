//! Lookup of the clients, matters and lawyers the ledger bills for.
//!
//! Party records live in the practice-management side of the system. The
//! ledger reads them through [`PartyDirectory`]; lookups are always scoped to
//! a tenant and a party from another firm reads as absent.

use std::collections::HashMap;

use async_trait::async_trait;
use lexledger_core::BillingError;
use lexledger_core::parties::{ClientRef, LawyerRef, MatterRef};
use lexledger_shared::types::{ClientId, LawyerId, MatterId, TenantId};
use tokio::sync::RwLock;

/// Read-only source of party records.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Looks up a client.
    async fn client(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
    ) -> Result<Option<ClientRef>, BillingError>;

    /// Looks up a matter.
    async fn matter(
        &self,
        tenant_id: TenantId,
        matter_id: MatterId,
    ) -> Result<Option<MatterRef>, BillingError>;

    /// Looks up a lawyer.
    async fn lawyer(
        &self,
        tenant_id: TenantId,
        lawyer_id: LawyerId,
    ) -> Result<Option<LawyerRef>, BillingError>;
}

/// Directory held in memory, for tests and tools.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    clients: RwLock<HashMap<ClientId, ClientRef>>,
    matters: RwLock<HashMap<MatterId, MatterRef>>,
    lawyers: RwLock<HashMap<LawyerId, LawyerRef>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a client.
    pub async fn upsert_client(&self, client: ClientRef) {
        self.clients.write().await.insert(client.id, client);
    }

    /// Adds or replaces a matter.
    pub async fn upsert_matter(&self, matter: MatterRef) {
        self.matters.write().await.insert(matter.id, matter);
    }

    /// Adds or replaces a lawyer.
    pub async fn upsert_lawyer(&self, lawyer: LawyerRef) {
        self.lawyers.write().await.insert(lawyer.id, lawyer);
    }

    /// Flags a client active or inactive. Returns false if it is unknown.
    pub async fn set_client_active(&self, client_id: ClientId, active: bool) -> bool {
        match self.clients.write().await.get_mut(&client_id) {
            Some(client) => {
                client.active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PartyDirectory for InMemoryDirectory {
    async fn client(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
    ) -> Result<Option<ClientRef>, BillingError> {
        Ok(self
            .clients
            .read()
            .await
            .get(&client_id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn matter(
        &self,
        tenant_id: TenantId,
        matter_id: MatterId,
    ) -> Result<Option<MatterRef>, BillingError> {
        Ok(self
            .matters
            .read()
            .await
            .get(&matter_id)
            .filter(|m| m.tenant_id == tenant_id)
            .cloned())
    }

    async fn lawyer(
        &self,
        tenant_id: TenantId,
        lawyer_id: LawyerId,
    ) -> Result<Option<LawyerRef>, BillingError> {
        Ok(self
            .lawyers
            .read()
            .await
            .get(&lawyer_id)
            .filter(|l| l.tenant_id == tenant_id)
            .cloned())
    }
}
