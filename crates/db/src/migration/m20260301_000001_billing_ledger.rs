//! Billing ledger schema: advances, time entries, expenses, invoices and
//! invoice line items.
//!
//! Money columns are `NUMERIC(16,4)`, the widest precision the SQLite
//! backend accepts. Every mutable table carries a
//! `version` counter used for optimistic concurrency.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Advances::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Advances::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Advances::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Advances::AdvanceType).string_len(64).not_null())
                    .col(ColumnDef::new(Advances::ClientId).uuid().null())
                    .col(ColumnDef::new(Advances::LawyerId).uuid().null())
                    .col(ColumnDef::new(Advances::MatterId).uuid().null())
                    .col(money(Advances::Amount))
                    .col(ColumnDef::new(Advances::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Advances::DateReceived).date().not_null())
                    .col(money(Advances::BalanceRemaining))
                    .col(ColumnDef::new(Advances::Status).string_len(16).not_null())
                    .col(version(Advances::Version))
                    .col(timestamp(Advances::CreatedAt))
                    .col(timestamp(Advances::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_advances_tenant_client")
                    .table(Advances::Table)
                    .col(Advances::TenantId)
                    .col(Advances::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_advances_tenant_date")
                    .table(Advances::Table)
                    .col(Advances::TenantId)
                    .col(Advances::DateReceived)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Invoices::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::MatterId).uuid().null())
                    .col(ColumnDef::new(Invoices::PeriodStart).date().not_null())
                    .col(ColumnDef::new(Invoices::PeriodEnd).date().not_null())
                    .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                    .col(ColumnDef::new(Invoices::DueDate).date().not_null())
                    .col(ColumnDef::new(Invoices::Currency).string_len(3).not_null())
                    .col(money(Invoices::Subtotal))
                    .col(ColumnDef::new(Invoices::DiscountType).string_len(16).not_null())
                    .col(money(Invoices::DiscountValue))
                    .col(money(Invoices::DiscountAmount))
                    .col(money(Invoices::RetainerApplied))
                    .col(ColumnDef::new(Invoices::RetainerAdvanceId).uuid().null())
                    .col(money(Invoices::TaxableAmount))
                    .col(
                        ColumnDef::new(Invoices::VatRate)
                            .decimal_len(9, 6)
                            .not_null()
                            .default(0),
                    )
                    .col(money(Invoices::VatAmount))
                    .col(money(Invoices::Total))
                    .col(money(Invoices::AmountPaid))
                    .col(ColumnDef::new(Invoices::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Invoices::PaidDate).date().null())
                    .col(ColumnDef::new(Invoices::VoidReason).text().null())
                    .col(ColumnDef::new(Invoices::VoidedOn).date().null())
                    .col(version(Invoices::Version))
                    .col(timestamp(Invoices::CreatedAt))
                    .col(timestamp(Invoices::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_tenant_client")
                    .table(Invoices::Table)
                    .col(Invoices::TenantId)
                    .col(Invoices::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_tenant_status_due")
                    .table(Invoices::Table)
                    .col(Invoices::TenantId)
                    .col(Invoices::Status)
                    .col(Invoices::DueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TimeEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TimeEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(TimeEntries::TenantId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::LawyerId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::ClientId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::MatterId).uuid().not_null())
                    .col(ColumnDef::new(TimeEntries::Date).date().not_null())
                    .col(money(TimeEntries::DurationMinutes))
                    .col(ColumnDef::new(TimeEntries::Narrative).text().not_null())
                    .col(ColumnDef::new(TimeEntries::Billable).boolean().not_null())
                    .col(money(TimeEntries::Rate))
                    .col(ColumnDef::new(TimeEntries::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(TimeEntries::Status).string_len(16).not_null())
                    .col(ColumnDef::new(TimeEntries::InvoiceId).uuid().null())
                    .col(version(TimeEntries::Version))
                    .col(timestamp(TimeEntries::CreatedAt))
                    .col(timestamp(TimeEntries::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_time_entries_invoice")
                            .from(TimeEntries::Table, TimeEntries::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_time_entries_tenant_client_status")
                    .table(TimeEntries::Table)
                    .col(TimeEntries::TenantId)
                    .col(TimeEntries::ClientId)
                    .col(TimeEntries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::MatterId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::Date).date().not_null())
                    .col(ColumnDef::new(Expenses::Category).string_len(64).not_null())
                    .col(ColumnDef::new(Expenses::Description).text().null())
                    .col(money(Expenses::Amount))
                    .col(ColumnDef::new(Expenses::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Expenses::Billable).boolean().not_null())
                    .col(
                        ColumnDef::new(Expenses::MarkupPercent)
                            .decimal_len(9, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Expenses::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Expenses::InvoiceId).uuid().null())
                    .col(version(Expenses::Version))
                    .col(timestamp(Expenses::CreatedAt))
                    .col(timestamp(Expenses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_invoice")
                            .from(Expenses::Table, Expenses::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_tenant_client_status")
                    .table(Expenses::Table)
                    .col(Expenses::TenantId)
                    .col(Expenses::ClientId)
                    .col(Expenses::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InvoiceLineItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceLineItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceLineItems::TenantId).uuid().not_null())
                    .col(ColumnDef::new(InvoiceLineItems::InvoiceId).uuid().not_null())
                    .col(ColumnDef::new(InvoiceLineItems::ItemType).string_len(16).not_null())
                    .col(ColumnDef::new(InvoiceLineItems::Description).text().not_null())
                    .col(money(InvoiceLineItems::Quantity))
                    .col(ColumnDef::new(InvoiceLineItems::Unit).string_len(16).not_null())
                    .col(money(InvoiceLineItems::Rate))
                    .col(money(InvoiceLineItems::Amount))
                    .col(ColumnDef::new(InvoiceLineItems::SourceTimeEntryId).uuid().null())
                    .col(ColumnDef::new(InvoiceLineItems::SourceExpenseId).uuid().null())
                    .col(ColumnDef::new(InvoiceLineItems::SortOrder).integer().not_null())
                    .col(timestamp(InvoiceLineItems::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_line_items_invoice")
                            .from(InvoiceLineItems::Table, InvoiceLineItems::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoice_line_items_invoice")
                    .table(InvoiceLineItems::Table)
                    .col(InvoiceLineItems::InvoiceId)
                    .col(InvoiceLineItems::SortOrder)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvoiceLineItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TimeEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Advances::Table).to_owned())
            .await
    }
}

fn money<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .decimal_len(16, 4)
        .not_null()
        .default(0)
        .to_owned()
}

fn version<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(DeriveIden)]
enum Advances {
    Table,
    Id,
    TenantId,
    AdvanceType,
    ClientId,
    LawyerId,
    MatterId,
    Amount,
    Currency,
    DateReceived,
    BalanceRemaining,
    Status,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TimeEntries {
    Table,
    Id,
    TenantId,
    LawyerId,
    ClientId,
    MatterId,
    Date,
    DurationMinutes,
    Narrative,
    Billable,
    Rate,
    Currency,
    Status,
    InvoiceId,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    TenantId,
    ClientId,
    MatterId,
    Date,
    Category,
    Description,
    Amount,
    Currency,
    Billable,
    MarkupPercent,
    Status,
    InvoiceId,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    TenantId,
    ClientId,
    MatterId,
    PeriodStart,
    PeriodEnd,
    IssueDate,
    DueDate,
    Currency,
    Subtotal,
    DiscountType,
    DiscountValue,
    DiscountAmount,
    RetainerApplied,
    RetainerAdvanceId,
    TaxableAmount,
    VatRate,
    VatAmount,
    Total,
    AmountPaid,
    Status,
    PaidDate,
    VoidReason,
    VoidedOn,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InvoiceLineItems {
    Table,
    Id,
    TenantId,
    InvoiceId,
    ItemType,
    Description,
    Quantity,
    Unit,
    Rate,
    Amount,
    SourceTimeEntryId,
    SourceExpenseId,
    SortOrder,
    CreatedAt,
}
