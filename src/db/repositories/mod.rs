use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::db::entities::{custom_voices, jobs, users};
use crate::models::voice::is_preset_voice;
use crate::error::Result;

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>> {
        Ok(users::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    pub async fn create(&self, user: users::ActiveModel) -> Result<users::Model> {
        Ok(user.insert(&self.db).await?)
    }

    pub async fn update(&self, user: users::ActiveModel) -> Result<users::Model> {
        Ok(user.update(&self.db).await?)
    }
}

pub struct JobRepository {
    db: DatabaseConnection,
}

impl JobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<jobs::Model>> {
        Ok(jobs::Entity::find_by_id(id)
            .filter(jobs::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: u64, offset: u64) -> Result<Vec<jobs::Model>> {
        Ok(jobs::Entity::find()
            .filter(jobs::Column::UserId.eq(user_id))
            .order_by_desc(jobs::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn update(&self, job: jobs::ActiveModel) -> Result<jobs::Model> {
        Ok(job.update(&self.db).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        jobs::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}

pub struct CustomVoiceRepository {
    db: DatabaseConnection,
}

impl CustomVoiceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<custom_voices::Model>> {
        Ok(custom_voices::Entity::find()
            .filter(custom_voices::Column::UserId.eq(user_id))
            .order_by_desc(custom_voices::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<custom_voices::Model>> {
        Ok(custom_voices::Entity::find_by_id(id)
            .filter(custom_voices::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    pub async fn find_by_voice_id(
        &self,
        user_id: Uuid,
        voice_id: &str,
    ) -> Result<Option<custom_voices::Model>> {
        Ok(custom_voices::Entity::find()
            .filter(custom_voices::Column::UserId.eq(user_id))
            .filter(custom_voices::Column::ProviderVoiceId.eq(voice_id))
            .one(&self.db)
            .await?)
    }

    pub async fn create(&self, voice: custom_voices::ActiveModel) -> Result<custom_voices::Model> {
        Ok(voice.insert(&self.db).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        custom_voices::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// A preset voice name or one of the user's own voices.
    pub async fn is_available(&self, user_id: Uuid, voice_id: &str) -> Result<bool> {
        if is_preset_voice(voice_id) {
            return Ok(true);
        }
        Ok(self.find_by_voice_id(user_id, voice_id).await?.is_some())
    }
}

/// Bytes held by a user's jobs that still have a file on storage.
pub async fn storage_used_bytes<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<i64> {
    let sizes: Vec<Option<i64>> = jobs::Entity::find()
        .select_only()
        .column(jobs::Column::FileSizeBytes)
        .filter(jobs::Column::UserId.eq(user_id))
        .filter(jobs::Column::FilePath.is_not_null())
        .into_tuple()
        .all(conn)
        .await?;

    Ok(sizes.into_iter().flatten().sum())
}
