//! Runs the billing SQL against a real database.
//!
//! Needs `DATABASE_URL` pointing at a Postgres with `crates/migrations` applied:
//! `cargo test -p crates --test billing_postgres -- --ignored`

use std::sync::Arc;

use crates::{
    domain::{
        entities::{
            credit_purchases::{InsertCreditPurchaseEntity, PURCHASE_STATUS_COMPLETED},
            users::{InsertUserEntity, UserEntity},
        },
        repositories::{billing::BillingRepository, users::UserRepository},
        value_objects::{
            billing::SubscriptionChange,
            enums::{
                subscription_statuses::SubscriptionStatus,
                subscription_tiers::{FREE_TIER_CREDITS, SubscriptionTier},
            },
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::{PgPoolSquad, establish_connection},
            schema::credit_purchases,
        },
        repositories::{billing::BillingPostgres, users::UserPostgres},
    },
};
use diesel::prelude::*;
use uuid::Uuid;

fn pool() -> Arc<PgPoolSquad> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    Arc::new(establish_connection(&database_url, 16).unwrap())
}

async fn new_user(users: &UserPostgres) -> UserEntity {
    let identity_id = format!("user_test_{}", Uuid::new_v4().simple());
    users
        .create_user(InsertUserEntity::free(
            identity_id,
            "billing-test@example.com".to_string(),
            None,
            None,
        ))
        .await
        .unwrap()
}

fn purchase(user_id: Uuid, event_id: &str, credits: i32) -> InsertCreditPurchaseEntity {
    InsertCreditPurchaseEntity {
        user_id,
        credits,
        amount_minor: 999,
        stripe_payment_intent_id: Some("pi_test".to_string()),
        stripe_event_id: event_id.to_string(),
        status: PURCHASE_STATUS_COMPLETED.to_string(),
    }
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn redelivered_purchase_event_grants_credits_once() {
    let db_pool = pool();
    let users = UserPostgres::new(Arc::clone(&db_pool));
    let billing = BillingPostgres::new(Arc::clone(&db_pool));

    let user = new_user(&users).await;
    let event_id = format!("evt_test_{}", Uuid::new_v4().simple());

    assert!(
        billing
            .grant_purchased_credits(purchase(user.id, &event_id, 30))
            .await
            .unwrap()
    );
    assert!(
        !billing
            .grant_purchased_credits(purchase(user.id, &event_id, 30))
            .await
            .unwrap()
    );

    let stored = users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.credits_limit, FREE_TIER_CREDITS + 30);

    let mut conn = db_pool.get().unwrap();
    let ledger_rows: i64 = credit_purchases::table
        .filter(credit_purchases::stripe_event_id.eq(&event_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(ledger_rows, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_reservations_stop_at_the_limit() {
    let db_pool = pool();
    let users = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let user_id = new_user(&users).await.id;

    let attempts: Vec<_> = (0..30)
        .map(|_| {
            let users = Arc::clone(&users);
            tokio::spawn(async move { users.reserve_credits(user_id, 1).await.unwrap() })
        })
        .collect();

    let mut granted = 0;
    for attempt in attempts {
        if attempt.await.unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, FREE_TIER_CREDITS);
    let stored = users.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(stored.credits_used, FREE_TIER_CREDITS);
    assert!(!users.reserve_credits(user_id, 1).await.unwrap());

    users.release_credits(user_id, 3).await.unwrap();
    let stored = users.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(stored.credits_used, FREE_TIER_CREDITS - 3);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn downgrade_caps_used_credits_at_free_allowance() {
    let db_pool = pool();
    let users = UserPostgres::new(Arc::clone(&db_pool));
    let billing = BillingPostgres::new(Arc::clone(&db_pool));

    let user = new_user(&users).await;
    billing
        .apply_subscription_change(
            user.id,
            SubscriptionChange {
                tier: SubscriptionTier::Pro,
                subscription_id: format!("sub_test_{}", Uuid::new_v4().simple()),
                status: SubscriptionStatus::Active,
                period_end: None,
                credits_limit: SubscriptionTier::Pro.monthly_credits(),
            },
        )
        .await
        .unwrap();
    assert!(users.reserve_credits(user.id, 40).await.unwrap());

    let downgraded = billing.downgrade_to_free(user.id).await.unwrap();

    assert_eq!(downgraded.tier, SubscriptionTier::Free.to_string());
    assert_eq!(downgraded.credits_limit, FREE_TIER_CREDITS);
    assert_eq!(downgraded.credits_used, FREE_TIER_CREDITS);
    assert_eq!(downgraded.subscription_status.as_deref(), Some("canceled"));
}
