//! Keeps the raw receipt-extraction payload on the bill for auditing.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Bills {
    Table,
    OcrData,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Bills::Table)
                    .add_column(ColumnDef::new(Bills::OcrData).text())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Bills::Table)
                    .drop_column(Bills::OcrData)
                    .to_owned(),
            )
            .await
    }
}
