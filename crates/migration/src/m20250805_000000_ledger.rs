//! Ledger tables: obligations and payments.
//!
//! `payments.external_ref` carries a unique index; it is the idempotency
//! barrier that serializes concurrent deliveries of the same gateway
//! confirmation.

use sea_orm_migration::prelude::*;

use crate::m20250801_000000_init::{Bills, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Obligations {
    Table,
    Id,
    BillId,
    PayerId,
    PayeeId,
    AmountMinor,
    Currency,
    Status,
    CreatedAt,
    SettledAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    BillId,
    ObligationId,
    PayerId,
    PayeeId,
    AmountMinor,
    Currency,
    ExternalRef,
    GatewayPaymentRef,
    Status,
    CreatedAt,
    CompletedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Obligations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Obligations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Obligations::BillId).string().not_null())
                    .col(ColumnDef::new(Obligations::PayerId).string().not_null())
                    .col(ColumnDef::new(Obligations::PayeeId).string().not_null())
                    .col(
                        ColumnDef::new(Obligations::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Obligations::Currency).string().not_null())
                    .col(ColumnDef::new(Obligations::Status).string().not_null())
                    .col(ColumnDef::new(Obligations::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Obligations::SettledAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-obligations-bill_id")
                            .from(Obligations::Table, Obligations::BillId)
                            .to(Bills::Table, Bills::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-obligations-payer_id")
                            .from(Obligations::Table, Obligations::PayerId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-obligations-payee_id")
                            .from(Obligations::Table, Obligations::PayeeId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-obligations-bill_id-status")
                    .table(Obligations::Table)
                    .col(Obligations::BillId)
                    .col(Obligations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-obligations-payer_id-payee_id-status")
                    .table(Obligations::Table)
                    .col(Obligations::PayerId)
                    .col(Obligations::PayeeId)
                    .col(Obligations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::BillId).string().not_null())
                    .col(ColumnDef::new(Payments::ObligationId).string().not_null())
                    .col(ColumnDef::new(Payments::PayerId).string().not_null())
                    .col(ColumnDef::new(Payments::PayeeId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Currency).string().not_null())
                    .col(ColumnDef::new(Payments::ExternalRef).string().not_null())
                    .col(ColumnDef::new(Payments::GatewayPaymentRef).string())
                    .col(ColumnDef::new(Payments::Status).string().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::CompletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-bill_id")
                            .from(Payments::Table, Payments::BillId)
                            .to(Bills::Table, Bills::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-obligation_id")
                            .from(Payments::Table, Payments::ObligationId)
                            .to(Obligations::Table, Obligations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-payments-external_ref")
                    .table(Payments::Table)
                    .col(Payments::ExternalRef)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Obligations::Table).to_owned())
            .await?;
        Ok(())
    }
}
