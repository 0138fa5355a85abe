use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{credit_purchases::InsertCreditPurchaseEntity, users::UserEntity},
    value_objects::{
        billing::SubscriptionChange, enums::subscription_statuses::SubscriptionStatus,
    },
};

#[automock]
#[async_trait]
pub trait BillingRepository {
    /// Appends the ledger row and raises `credits_limit` in one transaction.
    /// Returns false, changing nothing, when the processor event was already applied.
    async fn grant_purchased_credits(&self, purchase: InsertCreditPurchaseEntity) -> Result<bool>;

    async fn apply_subscription_change(
        &self,
        user_id: Uuid,
        change: SubscriptionChange,
    ) -> Result<()>;

    /// Drops the user to the free tier, capping `credits_used` at the free allowance.
    async fn downgrade_to_free(&self, user_id: Uuid) -> Result<UserEntity>;

    async fn reset_billing_period(&self, user_id: Uuid, credits_limit: i32) -> Result<()>;

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<()>;
}
