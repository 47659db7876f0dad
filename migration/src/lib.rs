pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261001_000001_code_registry;
mod m20261001_000002_vanity_slugs;
mod m20261001_000003_profiles_and_leads;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_code_registry::Migration),
            Box::new(m20261001_000002_vanity_slugs::Migration),
            Box::new(m20261001_000003_profiles_and_leads::Migration),
        ]
    }
}
