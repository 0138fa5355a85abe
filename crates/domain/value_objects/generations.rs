use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::generations::GenerationEntity;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;
pub const MAX_IMAGES_PER_CALL: u32 = 4;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GenerateImageModel {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub image_size: Option<String>,
    pub num_images: Option<u32>,
    pub style: Option<String>,
    pub seed: Option<i64>,
    pub model_id: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedImageDto {
    pub url: String,
    pub width: i32,
    pub height: i32,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationResultDto {
    pub images: Vec<GeneratedImageDto>,
    pub seed: Option<i64>,
    pub description: Option<String>,
    pub generations: Vec<GenerationEntity>,
    pub credits_used: i32,
    pub credits_remaining: i32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListGenerationsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListGenerationsQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationSummaryDto {
    pub id: Uuid,
    pub prompt: String,
    pub image_url: String,
    pub width: i32,
    pub height: i32,
    pub model_used: String,
    pub credits_used: i32,
    pub created_at: DateTime<Utc>,
}

impl From<GenerationEntity> for GenerationSummaryDto {
    fn from(value: GenerationEntity) -> Self {
        Self {
            id: value.id,
            prompt: value.prompt,
            image_url: value.image_url,
            width: value.width,
            height: value.height,
            model_used: value.model_used,
            credits_used: value.credits_used,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaginationDto {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationPageDto {
    pub generations: Vec<GenerationSummaryDto>,
    pub pagination: PaginationDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_and_clamps() {
        let query = ListGenerationsQuery::default();
        assert_eq!(query.limit(), 50);
        assert_eq!(query.offset(), 0);

        let query = ListGenerationsQuery {
            limit: Some(10_000),
            offset: Some(-4),
        };
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);

        let query = ListGenerationsQuery {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(query.limit(), 1);
        assert_eq!(query.offset(), 20);
    }
}
