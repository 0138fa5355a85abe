use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::credit_purchases;

pub const PURCHASE_STATUS_COMPLETED: &str = "completed";

/// One ledger row per processor event; `stripe_event_id` is unique.
#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = credit_purchases)]
pub struct InsertCreditPurchaseEntity {
    pub user_id: Uuid,
    pub credits: i32,
    pub amount_minor: i32,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_event_id: String,
    pub status: String,
}
