use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::users},
};
use domain::{
    entities::users::{InsertUserEntity, UpdateIdentityProfileEntity, UserEntity},
    repositories::users::UserRepository,
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = users::table
            .find(user_id)
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }

    async fn find_by_identity_id(&self, identity_id: &str) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = users::table
            .filter(users::identity_id.eq(identity_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = users::table
            .filter(users::customer_id.eq(customer_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }

    async fn create_user(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Two first requests can race; the loser reads the winner's row.
        insert_into(users::table)
            .values(&insert_user_entity)
            .on_conflict(users::identity_id)
            .do_nothing()
            .execute(&mut conn)?;

        let user = users::table
            .filter(users::identity_id.eq(&insert_user_entity.identity_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)?;

        Ok(user)
    }

    async fn upsert_identity_profile(
        &self,
        insert_user_entity: InsertUserEntity,
        profile: UpdateIdentityProfileEntity,
    ) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = insert_into(users::table)
            .values(&insert_user_entity)
            .on_conflict(users::identity_id)
            .do_update()
            .set(&profile)
            .returning(UserEntity::as_returning())
            .get_result::<UserEntity>(&mut conn)?;

        Ok(user)
    }

    async fn set_customer_id(&self, user_id: Uuid, customer_id: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table.find(user_id))
            .set((
                users::customer_id.eq(Some(customer_id)),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn reserve_credits(&self, user_id: Uuid, cost: i32) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Check and increment in one statement so concurrent requests cannot both pass.
        let updated = update(users::table.find(user_id))
            .filter((users::credits_used + cost).le(users::credits_limit))
            .set((
                users::credits_used.eq(users::credits_used + cost),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(updated == 1)
    }

    async fn release_credits(&self, user_id: Uuid, cost: i32) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table.find(user_id))
            .filter(users::credits_used.ge(cost))
            .set((
                users::credits_used.eq(users::credits_used - cost),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
