use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::infra::db::postgres::schema::generations;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Serialize, PartialEq)]
#[diesel(table_name = generations)]
pub struct GenerationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub image_url: String,
    pub image_size: String,
    pub style: Option<String>,
    pub width: i32,
    pub height: i32,
    pub seed: Option<i64>,
    pub model_used: String,
    pub credits_used: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = generations)]
pub struct InsertGenerationEntity {
    pub user_id: Uuid,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub image_url: String,
    pub image_size: String,
    pub style: Option<String>,
    pub width: i32,
    pub height: i32,
    pub seed: Option<i64>,
    pub model_used: String,
    pub credits_used: i32,
}
