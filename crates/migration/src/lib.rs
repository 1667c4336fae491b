pub use sea_orm_migration::prelude::*;

mod m20250801_000000_init;
mod m20250805_000000_ledger;
mod m20250812_000000_ocr_payload;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000000_init::Migration),
            Box::new(m20250805_000000_ledger::Migration),
            Box::new(m20250812_000000_ocr_payload::Migration),
        ]
    }
}
