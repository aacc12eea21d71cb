pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261001_000001_codes;
mod m20261001_000002_experiments;
mod m20261001_000003_scans;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_codes::Migration),
            Box::new(m20261001_000002_experiments::Migration),
            Box::new(m20261001_000003_scans::Migration),
        ]
    }
}
