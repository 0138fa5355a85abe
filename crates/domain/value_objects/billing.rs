use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::{
    purchase_types::PurchaseType, subscription_statuses::SubscriptionStatus,
    subscription_tiers::SubscriptionTier,
};

/// Overwrite applied when the processor reports a created or updated subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionChange {
    pub tier: SubscriptionTier,
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub period_end: Option<DateTime<Utc>>,
    pub credits_limit: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequestModel {
    #[serde(rename = "type")]
    pub purchase_type: PurchaseType,
    /// Plan id for subscriptions, package id for credits.
    pub plan_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RedirectDto {
    pub url: String,
}
