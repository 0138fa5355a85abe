use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::subscription_tiers::{FREE_TIER_CREDITS, SubscriptionTier};
use crate::infra::db::postgres::schema::users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub identity_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub tier: String,
    pub credits_used: i32,
    pub credits_limit: i32,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_period_end: Option<DateTime<Utc>>,
    pub last_credit_reset: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::from_str(&self.tier)
    }

    pub fn credits_remaining(&self) -> i32 {
        (self.credits_limit - self.credits_used).max(0)
    }

    pub fn can_afford(&self, cost: i32) -> bool {
        self.credits_used + cost <= self.credits_limit
    }

    /// `credits_used` after dropping to the free tier: never above the free allowance.
    pub fn downgraded_credits_used(&self) -> i32 {
        self.credits_used.clamp(0, FREE_TIER_CREDITS)
    }
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = users)]
pub struct InsertUserEntity {
    pub identity_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub tier: String,
    pub credits_used: i32,
    pub credits_limit: i32,
}

impl InsertUserEntity {
    /// New accounts start on the free tier with its monthly allowance.
    pub fn free(
        identity_id: String,
        email: String,
        name: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            identity_id,
            email,
            name,
            image_url,
            tier: SubscriptionTier::Free.to_string(),
            credits_used: 0,
            credits_limit: FREE_TIER_CREDITS,
        }
    }
}

/// Profile fields pushed by the identity provider. `None` leaves the column untouched.
#[derive(Debug, Clone, AsChangeset, PartialEq)]
#[diesel(table_name = users)]
pub struct UpdateIdentityProfileEntity {
    pub email: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
