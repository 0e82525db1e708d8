pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_table;
mod m20250101_000002_create_jobs_table;
mod m20250101_000003_create_payments_table;
mod m20250101_000004_create_referral_signups_table;
mod m20250101_000005_create_custom_voices_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_jobs_table::Migration),
            Box::new(m20250101_000003_create_payments_table::Migration),
            Box::new(m20250101_000004_create_referral_signups_table::Migration),
            Box::new(m20250101_000005_create_custom_voices_table::Migration),
        ]
    }
}
