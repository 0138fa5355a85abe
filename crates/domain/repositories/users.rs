use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{
    InsertUserEntity, UpdateIdentityProfileEntity, UserEntity,
};

#[automock]
#[async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;

    async fn find_by_identity_id(&self, identity_id: &str) -> Result<Option<UserEntity>>;

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Option<UserEntity>>;

    /// Inserts the user unless the identity id already exists; returns the stored row either way.
    async fn create_user(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity>;

    async fn upsert_identity_profile(
        &self,
        insert_user_entity: InsertUserEntity,
        profile: UpdateIdentityProfileEntity,
    ) -> Result<UserEntity>;

    async fn set_customer_id(&self, user_id: Uuid, customer_id: &str) -> Result<()>;

    /// Adds `cost` to `credits_used` only if the result stays within `credits_limit`.
    /// Returns false when the reservation would overspend.
    async fn reserve_credits(&self, user_id: Uuid, cost: i32) -> Result<bool>;

    async fn release_credits(&self, user_id: Uuid, cost: i32) -> Result<()>;
}
