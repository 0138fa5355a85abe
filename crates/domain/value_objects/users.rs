use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::users::UserEntity, value_objects::enums::subscription_tiers::SubscriptionTier,
};

/// Identity of the caller as asserted by a verified identity-provider token.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfileDto {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub tier: SubscriptionTier,
    pub credits_used: i32,
    pub credits_limit: i32,
    pub credits_remaining: i32,
    pub subscription_status: Option<String>,
    pub subscription_period_end: Option<DateTime<Utc>>,
    pub total_generations: i64,
    pub last_generation_at: Option<DateTime<Utc>>,
}

impl UserProfileDto {
    pub fn new(
        user: UserEntity,
        total_generations: i64,
        last_generation_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: user.id,
            tier: user.tier(),
            credits_remaining: user.credits_remaining(),
            email: user.email,
            name: user.name,
            image_url: user.image_url,
            credits_used: user.credits_used,
            credits_limit: user.credits_limit,
            subscription_status: user.subscription_status,
            subscription_period_end: user.subscription_period_end,
            total_generations,
            last_generation_at,
        }
    }
}
