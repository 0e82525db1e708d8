use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users_table::Users;
use super::m20250101_000003_create_payments_table::Payments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReferralSignups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferralSignups::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReferralSignups::ReferrerUserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReferralSignups::ReferredUserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ReferralSignups::RewardPaymentId).uuid())
                    .col(ColumnDef::new(ReferralSignups::RewardedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ReferralSignups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_referral_signups_referrer")
                            .from(ReferralSignups::Table, ReferralSignups::ReferrerUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_referral_signups_referred")
                            .from(ReferralSignups::Table, ReferralSignups::ReferredUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_referral_signups_payment")
                            .from(ReferralSignups::Table, ReferralSignups::RewardPaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_referral_signups_referrer")
                    .table(ReferralSignups::Table)
                    .col(ReferralSignups::ReferrerUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReferralSignups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ReferralSignups {
    Table,
    Id,
    ReferrerUserId,
    ReferredUserId,
    RewardPaymentId,
    RewardedAt,
    CreatedAt,
}
