//! Initial schema: users, friendships and the bill aggregate.
//!
//! All monetary columns store integer minor units alongside an ISO 4217
//! currency code; decimals never touch the database.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum Users {
    Table,
    Username,
    Password,
    DisplayName,
    PhoneNumber,
}

#[derive(Iden)]
enum Friendships {
    Table,
    Id,
    Requester,
    Recipient,
    Status,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum Bills {
    Table,
    Id,
    CreatedBy,
    MerchantName,
    SubtotalMinor,
    TaxMinor,
    TipMinor,
    TotalMinor,
    Currency,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum BillItems {
    Table,
    Id,
    BillId,
    Name,
    UnitPriceMinor,
    Currency,
    Quantity,
}

#[derive(Iden)]
enum BillParticipants {
    Table,
    Id,
    BillId,
    UserId,
    ShareMinor,
    Currency,
    IsPaid,
    PaidAt,
}

#[derive(Iden)]
enum ExpenseSplits {
    Table,
    Id,
    BillItemId,
    UserId,
    ShareMinor,
    Currency,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(ColumnDef::new(Users::PhoneNumber).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-users-phone_number")
                    .table(Users::Table)
                    .col(Users::PhoneNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Friendships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Friendships::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Friendships::Requester).string().not_null())
                    .col(ColumnDef::new(Friendships::Recipient).string().not_null())
                    .col(ColumnDef::new(Friendships::Status).string().not_null())
                    .col(
                        ColumnDef::new(Friendships::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-friendships-requester")
                            .from(Friendships::Table, Friendships::Requester)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-friendships-recipient")
                            .from(Friendships::Table, Friendships::Recipient)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-friendships-requester-recipient")
                    .table(Friendships::Table)
                    .col(Friendships::Requester)
                    .col(Friendships::Recipient)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bills::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bills::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bills::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Bills::MerchantName).string().not_null())
                    .col(
                        ColumnDef::new(Bills::SubtotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bills::TaxMinor).big_integer().not_null())
                    .col(ColumnDef::new(Bills::TipMinor).big_integer().not_null())
                    .col(ColumnDef::new(Bills::TotalMinor).big_integer().not_null())
                    .col(ColumnDef::new(Bills::Currency).string().not_null())
                    .col(ColumnDef::new(Bills::Status).string().not_null())
                    .col(ColumnDef::new(Bills::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bills-created_by")
                            .from(Bills::Table, Bills::CreatedBy)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BillItems::BillId).string().not_null())
                    .col(ColumnDef::new(BillItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(BillItems::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BillItems::Currency).string().not_null())
                    .col(ColumnDef::new(BillItems::Quantity).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bill_items-bill_id")
                            .from(BillItems::Table, BillItems::BillId)
                            .to(Bills::Table, Bills::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillParticipants::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BillParticipants::BillId).string().not_null())
                    .col(ColumnDef::new(BillParticipants::UserId).string().not_null())
                    .col(
                        ColumnDef::new(BillParticipants::ShareMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillParticipants::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillParticipants::IsPaid)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BillParticipants::PaidAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-bill_participants-bill_id")
                            .from(BillParticipants::Table, BillParticipants::BillId)
                            .to(Bills::Table, Bills::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-bill_participants-bill_id-user_id")
                    .table(BillParticipants::Table)
                    .col(BillParticipants::BillId)
                    .col(BillParticipants::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseSplits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseSplits::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseSplits::BillItemId).string().not_null())
                    .col(ColumnDef::new(ExpenseSplits::UserId).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseSplits::ShareMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseSplits::Currency).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_splits-bill_item_id")
                            .from(ExpenseSplits::Table, ExpenseSplits::BillItemId)
                            .to(BillItems::Table, BillItems::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExpenseSplits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BillParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BillItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bills::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Friendships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
