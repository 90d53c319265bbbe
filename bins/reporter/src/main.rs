//! Read-only billing reports for LexLedger.
//!
//! Usage:
//!   reporter revenue <tenant_id> <start> <end> [client_id]
//!   reporter overdue <tenant_id> <as_of>
//!
//! Dates are `YYYY-MM-DD`. Reports are printed to stdout as JSON. Ledger
//! failures are reported with their `AppError` classification.

use anyhow::{Context, bail};
use chrono::NaiveDate;
use lexledger_core::BillingError;
use lexledger_core::invoice::InvoiceStatus;
use lexledger_core::revenue::{DateRange, RevenueScope};
use lexledger_db::{BillingLedger, InMemoryDirectory, InvoiceFilter};
use lexledger_shared::{AppConfig, AppError};
use lexledger_shared::types::{ClientId, PageRequest, TenantId};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Largest page the overdue report fetches at once.
const OVERDUE_PAGE_SIZE: u32 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    // Reports go to stdout, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let db = lexledger_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    // Reports never resolve parties, so an empty directory is enough.
    let ledger = BillingLedger::new(db, InMemoryDirectory::new(), &config.billing);

    let report = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["revenue", tenant, start, end, rest @ ..] => {
            let tenant_id: TenantId = tenant.parse().context("invalid tenant id")?;
            let period =
                DateRange::new(parse_date(start)?, parse_date(end)?).map_err(report_failure)?;
            let scope = match rest {
                [] => RevenueScope::Firm,
                [client] => {
                    RevenueScope::Client(client.parse::<ClientId>().context("invalid client id")?)
                }
                _ => bail!("too many arguments for `revenue`"),
            };
            let report = ledger
                .revenue_for_period(tenant_id, period, scope)
                .await
                .map_err(report_failure)?;
            serde_json::to_value(report)?
        }
        ["overdue", tenant, as_of] => {
            let tenant_id: TenantId = tenant.parse().context("invalid tenant id")?;
            let filter = InvoiceFilter {
                status: Some(InvoiceStatus::Overdue),
                ..InvoiceFilter::as_of(parse_date(as_of)?)
            };
            let page = PageRequest {
                page: 1,
                per_page: OVERDUE_PAGE_SIZE,
            };
            let listed = ledger
                .list_invoices(tenant_id, &filter, &page)
                .await
                .map_err(report_failure)?;
            serde_json::to_value(listed)?
        }
        _ => bail!(
            "usage: reporter revenue <tenant_id> <start> <end> [client_id] | reporter overdue <tenant_id> <as_of>"
        ),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Classifies a ledger failure and logs it before it ends the run.
fn report_failure(err: BillingError) -> anyhow::Error {
    let err = AppError::from(err);
    error!(
        kind = ?err.kind(),
        code = err.error_code(),
        status = err.status_code(),
        error = %err,
        "report failed"
    );
    err.into()
}

fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("invalid date `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexledger_shared::types::FailureKind;

    #[test]
    fn test_report_failure_keeps_classification() {
        let err = report_failure(BillingError::ConcurrencyConflict { attempts: 3 });
        let app = err.downcast_ref::<AppError>().unwrap();
        assert_eq!(app.kind(), FailureKind::Conflict);
        assert_eq!(app.status_code(), 409);

        let err = report_failure(BillingError::Database("disk full".into()));
        let app = err.downcast_ref::<AppError>().unwrap();
        assert_eq!(app.error_code(), "DATABASE_ERROR");
        assert_eq!(app.kind(), FailureKind::System);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
        );
        assert!(parse_date("31/01/2026").is_err());
    }
}
