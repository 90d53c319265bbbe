//! Shared fixtures for ledger integration tests.
//!
//! Every test gets its own in-memory `SQLite` database migrated with the real
//! migrator, and a firm with one client, one matter and one lawyer billing
//! 200 USD an hour.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]

use chrono::NaiveDate;
use lexledger_core::advance::{AdvanceOwner, AdvanceType, NewAdvance};
use lexledger_core::entries::{NewExpense, NewTimeEntry};
use lexledger_core::invoice::{ComposeInvoiceInput, DiscountType, RetainerRequest};
use lexledger_core::parties::{ClientRef, FeeArrangement, LawyerRef, MatterRef};
use lexledger_db::migration::{Migrator, MigratorTrait};
use lexledger_db::{BillingLedger, InMemoryDirectory};
use lexledger_shared::config::{BillingConfig, DatabaseConfig};
use lexledger_shared::types::{
    AdvanceId, ClientId, Currency, ExpenseId, InvoiceId, LawyerId, MatterId, Money,
    OperationResult, TenantId, TimeEntryId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;

pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
}

pub fn feb(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

pub fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

/// Opens a fresh in-memory database and applies all migrations.
pub async fn setup_db() -> DatabaseConnection {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    };
    let db = lexledger_db::connect(&config).await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    db
}

/// Reads a decimal that `OperationResult` data carries as a JSON string.
pub fn decimal(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("valid decimal")
}

/// Asserts a write succeeded and returns the id it reported.
pub fn created(result: &OperationResult) -> uuid::Uuid {
    assert!(result.success, "operation failed: {:?}", result.errors);
    result.id.expect("successful write reports an id")
}

/// Asserts a write failed with `code`.
pub fn assert_failed(result: &OperationResult, code: &str) {
    assert!(!result.success, "operation unexpectedly succeeded");
    assert_eq!(result.first_error_code(), Some(code), "{:?}", result.errors);
}

pub struct Firm {
    pub db: DatabaseConnection,
    pub ledger: BillingLedger<InMemoryDirectory>,
    pub tenant: TenantId,
    pub client: ClientId,
    pub matter: MatterId,
    pub lawyer: LawyerId,
}

impl Firm {
    /// A firm on its own fresh database.
    pub async fn new() -> Self {
        Self::on(setup_db().await).await
    }

    /// A firm sharing `db` with other firms.
    pub async fn on(db: DatabaseConnection) -> Self {
        let tenant = TenantId::new();
        let client = ClientId::new();
        let matter = MatterId::new();
        let lawyer = LawyerId::new();

        let directory = InMemoryDirectory::new();
        directory
            .upsert_client(ClientRef {
                id: client,
                tenant_id: tenant,
                active: true,
            })
            .await;
        directory
            .upsert_matter(MatterRef {
                id: matter,
                tenant_id: tenant,
                client_id: client,
                active: true,
                currency: Currency::USD,
                fee_arrangement: FeeArrangement::Hourly,
                custom_hourly_rate: None,
            })
            .await;
        directory
            .upsert_lawyer(LawyerRef {
                id: lawyer,
                tenant_id: tenant,
                hourly_rate: dec!(200),
                hourly_rate_currency: Currency::USD,
            })
            .await;

        Self {
            ledger: BillingLedger::new(db.clone(), directory, &BillingConfig::default()),
            db,
            tenant,
            client,
            matter,
            lawyer,
        }
    }

    pub async fn deposit(&self, advance_type: AdvanceType, amount: Money, date: NaiveDate) -> AdvanceId {
        let owner = if advance_type == AdvanceType::LawyerAdvance {
            AdvanceOwner::Lawyer(self.lawyer)
        } else {
            AdvanceOwner::Client(self.client)
        };
        let result = self
            .ledger
            .deposit_advance(NewAdvance {
                tenant_id: self.tenant,
                owner,
                matter_id: None,
                advance_type,
                amount,
                date_received: date,
            })
            .await;
        AdvanceId::from_uuid(created(&result))
    }

    pub async fn retainer(&self, amount: Decimal) -> AdvanceId {
        self.deposit(AdvanceType::ClientRetainer, usd(amount), jan(5))
            .await
    }

    pub fn new_time_entry(&self, minutes: Decimal, date: NaiveDate) -> NewTimeEntry {
        NewTimeEntry {
            tenant_id: self.tenant,
            lawyer_id: self.lawyer,
            client_id: self.client,
            matter_id: self.matter,
            date,
            duration_minutes: minutes,
            narrative: "Drafting pleadings".to_string(),
            billable: true,
            rate: None,
        }
    }

    pub async fn time_entry(&self, minutes: Decimal, date: NaiveDate) -> TimeEntryId {
        let result = self
            .ledger
            .record_time_entry(self.new_time_entry(minutes, date))
            .await;
        TimeEntryId::from_uuid(created(&result))
    }

    pub async fn expense(&self, amount: Decimal, date: NaiveDate) -> ExpenseId {
        let result = self
            .ledger
            .record_expense(NewExpense {
                tenant_id: self.tenant,
                client_id: self.client,
                matter_id: self.matter,
                date,
                category: "court_fees".to_string(),
                description: Some("Filing fee".to_string()),
                amount: usd(amount),
                billable: true,
                markup_percent: Decimal::ZERO,
            })
            .await;
        ExpenseId::from_uuid(created(&result))
    }

    /// Compose request billing every unbilled entry of the client, issued 31 Jan.
    pub fn compose_request(&self) -> ComposeInvoiceInput {
        ComposeInvoiceInput {
            tenant_id: self.tenant,
            client_id: self.client,
            matter_id: None,
            time_entry_ids: None,
            expense_ids: None,
            manual_lines: Vec::new(),
            currency: None,
            discount_type: DiscountType::None,
            discount_value: Decimal::ZERO,
            vat_rate: None,
            retainer: None,
            issue_date: jan(31),
            due_date: None,
            period_start: None,
            period_end: None,
        }
    }

    pub fn with_retainer(&self, advance_id: AdvanceId, amount: Decimal) -> ComposeInvoiceInput {
        ComposeInvoiceInput {
            retainer: Some(RetainerRequest { advance_id, amount }),
            ..self.compose_request()
        }
    }

    pub async fn compose(&self, input: ComposeInvoiceInput) -> InvoiceId {
        let result = self.ledger.compose_invoice(input).await;
        InvoiceId::from_uuid(created(&result))
    }
}
