use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, delete, dsl::count_star, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::generations},
};
use domain::{
    entities::generations::{GenerationEntity, InsertGenerationEntity},
    repositories::generations::GenerationRepository,
};

pub struct GenerationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl GenerationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl GenerationRepository for GenerationPostgres {
    async fn insert_generations(
        &self,
        new_generations: Vec<InsertGenerationEntity>,
    ) -> Result<Vec<GenerationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = insert_into(generations::table)
            .values(&new_generations)
            .returning(GenerationEntity::as_returning())
            .get_results::<GenerationEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_id(&self, generation_id: Uuid) -> Result<Option<GenerationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let generation = generations::table
            .find(generation_id)
            .select(GenerationEntity::as_select())
            .first::<GenerationEntity>(&mut conn)
            .optional()?;

        Ok(generation)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GenerationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = generations::table
            .filter(generations::user_id.eq(user_id))
            .order((generations::created_at.desc(), generations::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(GenerationEntity::as_select())
            .load::<GenerationEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = generations::table
            .filter(generations::user_id.eq(user_id))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(total)
    }

    async fn latest_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let latest = generations::table
            .filter(generations::user_id.eq(user_id))
            .order(generations::created_at.desc())
            .select(generations::created_at)
            .first::<DateTime<Utc>>(&mut conn)
            .optional()?;

        Ok(latest)
    }

    async fn delete_owned(&self, generation_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(
            generations::table
                .filter(generations::id.eq(generation_id))
                .filter(generations::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        Ok(deleted == 1)
    }
}
