use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{Connection, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{credit_purchases, users},
    },
};
use domain::{
    entities::{credit_purchases::InsertCreditPurchaseEntity, users::UserEntity},
    repositories::billing::BillingRepository,
    value_objects::{
        billing::SubscriptionChange,
        enums::{
            subscription_statuses::SubscriptionStatus,
            subscription_tiers::{FREE_TIER_CREDITS, SubscriptionTier},
        },
    },
};

pub struct BillingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BillingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BillingRepository for BillingPostgres {
    async fn grant_purchased_credits(&self, purchase: InsertCreditPurchaseEntity) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let granted = conn.transaction::<bool, diesel::result::Error, _>(|tx| {
            let inserted = insert_into(credit_purchases::table)
                .values(&purchase)
                .on_conflict(credit_purchases::stripe_event_id)
                .do_nothing()
                .execute(tx)?;

            if inserted == 0 {
                return Ok(false);
            }

            let updated = update(users::table.find(purchase.user_id))
                .set((
                    users::credits_limit.eq(users::credits_limit + purchase.credits),
                    users::updated_at.eq(Utc::now()),
                ))
                .execute(tx)?;

            // Roll the ledger row back with the missing user.
            if updated == 0 {
                return Err(diesel::result::Error::NotFound);
            }

            Ok(true)
        })?;

        Ok(granted)
    }

    async fn apply_subscription_change(
        &self,
        user_id: Uuid,
        change: SubscriptionChange,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        update(users::table.find(user_id))
            .set((
                users::tier.eq(change.tier.to_string()),
                users::subscription_id.eq(Some(change.subscription_id)),
                users::subscription_status.eq(Some(change.status.to_string())),
                users::subscription_period_end.eq(change.period_end),
                users::credits_limit.eq(change.credits_limit),
                users::credits_used.eq(0),
                users::last_credit_reset.eq(Some(now)),
                users::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn downgrade_to_free(&self, user_id: Uuid) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = conn.transaction::<UserEntity, diesel::result::Error, _>(|tx| {
            let current = users::table
                .find(user_id)
                .select(UserEntity::as_select())
                .for_update()
                .first::<UserEntity>(tx)?;

            update(users::table.find(user_id))
                .set((
                    users::tier.eq(SubscriptionTier::Free.to_string()),
                    users::subscription_id.eq(None::<String>),
                    users::subscription_status.eq(Some(SubscriptionStatus::Canceled.to_string())),
                    users::subscription_period_end.eq(None::<chrono::DateTime<Utc>>),
                    users::credits_limit.eq(FREE_TIER_CREDITS),
                    users::credits_used.eq(current.downgraded_credits_used()),
                    users::updated_at.eq(Utc::now()),
                ))
                .returning(UserEntity::as_returning())
                .get_result::<UserEntity>(tx)
        })?;

        Ok(user)
    }

    async fn reset_billing_period(&self, user_id: Uuid, credits_limit: i32) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        update(users::table.find(user_id))
            .set((
                users::credits_used.eq(0),
                users::credits_limit.eq(credits_limit),
                users::last_credit_reset.eq(Some(now)),
                users::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table.find(user_id))
            .set((
                users::subscription_status.eq(Some(status.to_string())),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
