use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomVoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CustomVoices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CustomVoices::UserId).uuid().not_null())
                    .col(ColumnDef::new(CustomVoices::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(CustomVoices::ProviderVoiceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomVoices::PreviewUrl).string())
                    .col(
                        ColumnDef::new(CustomVoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_custom_voices_user")
                            .from(CustomVoices::Table, CustomVoices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One entry per provider voice per user
        manager
            .create_index(
                Index::create()
                    .name("idx_custom_voices_user_voice")
                    .table(CustomVoices::Table)
                    .col(CustomVoices::UserId)
                    .col(CustomVoices::ProviderVoiceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomVoices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CustomVoices {
    Table,
    Id,
    UserId,
    Name,
    ProviderVoiceId,
    PreviewUrl,
    CreatedAt,
}
