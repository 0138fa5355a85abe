use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Credits granted per billing period on the free tier.
pub const FREE_TIER_CREDITS: i32 = 10;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tier = match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        };
        write!(f, "{}", tier)
    }
}

impl SubscriptionTier {
    /// Unknown values fall back to the free tier so a bad row never grants paid credits.
    pub fn from_str(value: &str) -> Self {
        match value {
            "pro" => SubscriptionTier::Pro,
            "enterprise" => SubscriptionTier::Enterprise,
            _ => SubscriptionTier::Free,
        }
    }

    pub fn monthly_credits(&self) -> i32 {
        match self {
            SubscriptionTier::Free => FREE_TIER_CREDITS,
            SubscriptionTier::Pro => 100,
            SubscriptionTier::Enterprise => 500,
        }
    }
}
