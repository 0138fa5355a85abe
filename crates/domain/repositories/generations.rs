use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::generations::{GenerationEntity, InsertGenerationEntity};

#[automock]
#[async_trait]
pub trait GenerationRepository {
    async fn insert_generations(
        &self,
        generations: Vec<InsertGenerationEntity>,
    ) -> Result<Vec<GenerationEntity>>;

    async fn find_by_id(&self, generation_id: Uuid) -> Result<Option<GenerationEntity>>;

    /// Newest first.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GenerationEntity>>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64>;

    async fn latest_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>>;

    /// Deletes only when the row belongs to `user_id`. Returns whether a row was removed.
    async fn delete_owned(&self, generation_id: Uuid, user_id: Uuid) -> Result<bool>;
}
