use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{
            credit_purchases::{InsertCreditPurchaseEntity, PURCHASE_STATUS_COMPLETED},
            users::UserEntity,
        },
        repositories::{billing::BillingRepository, users::UserRepository},
        value_objects::{
            billing::{CheckoutRequestModel, RedirectDto, SubscriptionChange},
            catalog::BillingCatalog,
            enums::{purchase_types::PurchaseType, subscription_statuses::SubscriptionStatus},
            users::IdentityClaims,
        },
    },
    payments::stripe_client::{CheckoutSessionParams, StripeClient, StripeEvent},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::usecases::user_resolver::UserResolver;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn find_customer_by_email(&self, email: &str) -> AnyResult<Option<String>>;

    async fn create_customer(
        &self,
        email: &str,
        name: Option<String>,
        user_id: Uuid,
    ) -> AnyResult<String>;

    async fn create_checkout_session(&self, params: CheckoutSessionParams) -> AnyResult<String>;

    async fn create_portal_session(&self, customer_id: &str, return_url: &str)
    -> AnyResult<String>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn find_customer_by_email(&self, email: &str) -> AnyResult<Option<String>> {
        self.find_customer_by_email(email).await
    }

    async fn create_customer(
        &self,
        email: &str,
        name: Option<String>,
        user_id: Uuid,
    ) -> AnyResult<String> {
        self.create_customer(email, name.as_deref(), user_id).await
    }

    async fn create_checkout_session(&self, params: CheckoutSessionParams) -> AnyResult<String> {
        self.create_checkout_session(params).await
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AnyResult<String> {
        self.create_portal_session(customer_id, return_url).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("invalid checkout request: {0}")]
    InvalidInput(String),
    #[error("no billing account for this user")]
    CustomerNotFound,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("payment provider request failed")]
    Upstream(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BillingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BillingError::InvalidInput(_) | BillingError::InvalidSignature => {
                StatusCode::BAD_REQUEST
            }
            BillingError::CustomerNotFound => StatusCode::NOT_FOUND,
            BillingError::Upstream(_) => StatusCode::BAD_GATEWAY,
            BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BillingError>;

/// What a webhook delivery did to local state. Logged and returned for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    Duplicate,
    Skipped(&'static str),
    Ignored,
}

pub struct BillingUseCase<U, B, S>
where
    U: UserRepository + Send + Sync + 'static,
    B: BillingRepository + Send + Sync + 'static,
    S: StripeGateway + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    user_resolver: Arc<UserResolver<U>>,
    billing_repo: Arc<B>,
    stripe_client: Arc<S>,
    catalog: BillingCatalog,
    app_url: String,
}

impl<U, B, S> BillingUseCase<U, B, S>
where
    U: UserRepository + Send + Sync + 'static,
    B: BillingRepository + Send + Sync + 'static,
    S: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        user_resolver: Arc<UserResolver<U>>,
        billing_repo: Arc<B>,
        stripe_client: Arc<S>,
        catalog: BillingCatalog,
        app_url: String,
    ) -> Self {
        Self {
            user_repo,
            user_resolver,
            billing_repo,
            stripe_client,
            catalog,
            app_url,
        }
    }

    pub async fn create_checkout_session(
        &self,
        claims: &IdentityClaims,
        checkout_request: CheckoutRequestModel,
    ) -> UseCaseResult<RedirectDto> {
        let purchase_type = checkout_request.purchase_type;
        let offer_id = checkout_request.plan_id.trim().to_string();

        info!(
            identity_id = %claims.subject,
            purchase_type = %purchase_type,
            offer_id = %offer_id,
            "billing: create checkout session requested"
        );

        let (price_id, offer_metadata) = self
            .resolve_offer(purchase_type, &offer_id)
            .map_err(|err| {
                warn!(
                    identity_id = %claims.subject,
                    purchase_type = %purchase_type,
                    offer_id = %offer_id,
                    status = err.status_code().as_u16(),
                    error = %err,
                    "billing: checkout offer rejected"
                );
                err
            })?;

        let user = self.user_resolver.resolve(claims).await?;
        let user_id = user.id;
        let customer_id = self.resolve_customer(&user).await?;

        let mut metadata = HashMap::from([
            ("user_id".to_string(), user_id.to_string()),
            ("type".to_string(), purchase_type.to_string()),
        ]);
        metadata.extend(offer_metadata);

        let params = CheckoutSessionParams {
            price_id: price_id.clone(),
            mode: purchase_type.checkout_mode().to_string(),
            customer_id: customer_id.clone(),
            success_url: format!("{}/dashboard?success=true", self.app_url),
            cancel_url: format!("{}/pricing?canceled=true", self.app_url),
            metadata,
        };

        let url = self
            .stripe_client
            .create_checkout_session(params)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    price_id = %price_id,
                    customer_id = %customer_id,
                    error = ?err,
                    "billing: stripe checkout session creation failed"
                );
                BillingError::Upstream(err)
            })?;

        info!(%user_id, offer_id = %offer_id, "billing: checkout session created");

        Ok(RedirectDto { url })
    }

    pub async fn create_portal_session(&self, claims: &IdentityClaims) -> UseCaseResult<RedirectDto> {
        let user = self.user_resolver.resolve(claims).await?;
        let user_id = user.id;

        let customer_id = user.customer_id.ok_or_else(|| {
            let err = BillingError::CustomerNotFound;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "billing: portal requested without a customer"
            );
            err
        })?;

        let return_url = format!("{}/dashboard", self.app_url);
        let url = self
            .stripe_client
            .create_portal_session(&customer_id, &return_url)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    customer_id = %customer_id,
                    error = ?err,
                    "billing: stripe portal session creation failed"
                );
                BillingError::Upstream(err)
            })?;

        info!(%user_id, "billing: portal session created");
        Ok(RedirectDto { url })
    }

    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<WebhookOutcome> {
        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(
                    error = %err,
                    status = BillingError::InvalidSignature.status_code().as_u16(),
                    "billing: stripe webhook verification failed"
                );
                BillingError::InvalidSignature
            })?;

        info!(
            event_id = %event.id,
            event_type = %event.type_,
            "billing: stripe webhook verified"
        );

        let outcome = match event.type_.as_str() {
            "checkout.session.completed" => self.handle_checkout_completed(&event).await?,
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.handle_subscription_changed(&event).await?
            }
            "customer.subscription.deleted" => self.handle_subscription_deleted(&event).await?,
            "invoice.payment_succeeded" => self.handle_invoice_paid(&event).await?,
            "invoice.payment_failed" => self.handle_invoice_failed(&event).await?,
            _ => {
                debug!(event_type = %event.type_, "billing: unhandled stripe event type");
                WebhookOutcome::Ignored
            }
        };

        info!(
            event_id = %event.id,
            event_type = %event.type_,
            outcome = ?outcome,
            "billing: stripe webhook processed"
        );

        Ok(outcome)
    }

    fn resolve_offer(
        &self,
        purchase_type: PurchaseType,
        offer_id: &str,
    ) -> UseCaseResult<(String, Vec<(String, String)>)> {
        match purchase_type {
            PurchaseType::Subscription => {
                let plan = self.catalog.plan(offer_id).ok_or_else(|| {
                    BillingError::InvalidInput(format!("unknown plan: {offer_id}"))
                })?;
                let price_id = self.catalog.plan_price_id(plan).ok_or_else(|| {
                    BillingError::InvalidInput(format!("plan {offer_id} cannot be purchased"))
                })?;

                Ok((
                    price_id.to_string(),
                    vec![("plan_id".to_string(), plan.id.to_string())],
                ))
            }
            PurchaseType::Credits => {
                let package = self.catalog.package(offer_id).ok_or_else(|| {
                    BillingError::InvalidInput(format!("unknown credit package: {offer_id}"))
                })?;
                let price_id = self.catalog.package_price_id(package).ok_or_else(|| {
                    BillingError::InvalidInput(format!(
                        "credit package {offer_id} cannot be purchased"
                    ))
                })?;

                Ok((
                    price_id.to_string(),
                    vec![
                        ("credits".to_string(), package.credits.to_string()),
                        ("bonus".to_string(), package.bonus.to_string()),
                    ],
                ))
            }
        }
    }

    /// Stored id, else an existing processor customer with the same email, else a new one.
    async fn resolve_customer(&self, user: &UserEntity) -> UseCaseResult<String> {
        if let Some(customer_id) = user.customer_id.clone() {
            return Ok(customer_id);
        }

        let user_id = user.id;

        let existing = if user.email.is_empty() {
            None
        } else {
            self.stripe_client
                .find_customer_by_email(&user.email)
                .await
                .map_err(|err| {
                    error!(%user_id, error = ?err, "billing: stripe customer lookup failed");
                    BillingError::Upstream(err)
                })?
        };

        // A customer id can belong to one local user only.
        let existing = match existing {
            Some(customer_id) => {
                let owner = self
                    .user_repo
                    .find_by_customer_id(&customer_id)
                    .await
                    .map_err(|err| {
                        error!(%user_id, db_error = ?err, "billing: failed to look up customer owner");
                        BillingError::Internal(err)
                    })?;

                match owner {
                    Some(owner) if owner.id != user_id => {
                        warn!(
                            %user_id,
                            owner_id = %owner.id,
                            "billing: stripe customer found by email belongs to another user"
                        );
                        None
                    }
                    _ => Some(customer_id),
                }
            }
            None => None,
        };

        let customer_id = match existing {
            Some(customer_id) => {
                info!(%user_id, "billing: reusing stripe customer found by email");
                customer_id
            }
            None => self
                .stripe_client
                .create_customer(&user.email, user.name.clone(), user_id)
                .await
                .map_err(|err| {
                    error!(%user_id, error = ?err, "billing: stripe customer creation failed");
                    BillingError::Upstream(err)
                })?,
        };

        self.user_repo
            .set_customer_id(user_id, &customer_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "billing: failed to store customer id");
                BillingError::Internal(err)
            })?;

        Ok(customer_id)
    }

    async fn handle_checkout_completed(&self, event: &StripeEvent) -> UseCaseResult<WebhookOutcome> {
        let Some(session) = StripeClient::extract_checkout_session(event) else {
            warn!(event_id = %event.id, "billing: checkout session missing in webhook");
            return Ok(WebhookOutcome::Skipped("missing checkout session"));
        };

        let metadata = session.metadata.unwrap_or_default();

        let purchase_type = metadata.get("type").and_then(|v| PurchaseType::from_str(v));
        if purchase_type != Some(PurchaseType::Credits) {
            debug!(
                event_id = %event.id,
                purchase_type = ?purchase_type,
                "billing: checkout completion handled by subscription events"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let user_id = metadata.get("user_id").and_then(|v| Uuid::parse_str(v).ok());
        let credits = metadata.get("credits").and_then(|v| v.parse::<i32>().ok());
        let bonus = metadata
            .get("bonus")
            .map(|v| v.parse::<i32>().ok())
            .unwrap_or(Some(0));

        let (Some(user_id), Some(credits), Some(bonus)) = (user_id, credits, bonus) else {
            warn!(
                event_id = %event.id,
                metadata = ?metadata,
                "billing: credit checkout missing user_id or credits metadata"
            );
            return Ok(WebhookOutcome::Skipped("missing metadata"));
        };

        if credits <= 0 || bonus < 0 {
            warn!(
                event_id = %event.id,
                credits,
                bonus,
                "billing: credit checkout carries a non-positive grant"
            );
            return Ok(WebhookOutcome::Skipped("invalid credit amount"));
        }

        if self.find_user(user_id).await?.is_none() {
            warn!(event_id = %event.id, %user_id, "billing: credit checkout for unknown user");
            return Ok(WebhookOutcome::Skipped("user not found"));
        }

        let purchase = InsertCreditPurchaseEntity {
            user_id,
            credits: credits + bonus,
            amount_minor: session
                .amount_total
                .and_then(|amount| i32::try_from(amount).ok())
                .unwrap_or(0),
            stripe_payment_intent_id: session.payment_intent,
            stripe_event_id: event.id.clone(),
            status: PURCHASE_STATUS_COMPLETED.to_string(),
        };

        let granted = self
            .billing_repo
            .grant_purchased_credits(purchase)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    %user_id,
                    db_error = ?err,
                    "billing: failed to grant purchased credits"
                );
                BillingError::Internal(err)
            })?;

        if !granted {
            info!(event_id = %event.id, %user_id, "billing: credit grant already applied");
            return Ok(WebhookOutcome::Duplicate);
        }

        info!(
            event_id = %event.id,
            %user_id,
            credits,
            bonus,
            "billing: purchased credits granted"
        );
        Ok(WebhookOutcome::Applied)
    }

    async fn handle_subscription_changed(
        &self,
        event: &StripeEvent,
    ) -> UseCaseResult<WebhookOutcome> {
        let Some(subscription) = StripeClient::extract_subscription(event) else {
            warn!(event_id = %event.id, "billing: subscription missing in webhook");
            return Ok(WebhookOutcome::Skipped("missing subscription"));
        };

        let Some(user) = self.find_user_by_customer(&subscription.customer).await? else {
            warn!(
                event_id = %event.id,
                customer_id = %subscription.customer,
                "billing: subscription event for unknown customer"
            );
            return Ok(WebhookOutcome::Skipped("user not found"));
        };

        let Some(plan) = subscription
            .first_price_id()
            .and_then(|price_id| self.catalog.plan_by_price_id(price_id))
        else {
            warn!(
                event_id = %event.id,
                user_id = %user.id,
                price_id = ?subscription.first_price_id(),
                "billing: subscription price does not match a plan"
            );
            return Ok(WebhookOutcome::Skipped("unknown price"));
        };

        let Some(status) = SubscriptionStatus::from_str(&subscription.status) else {
            warn!(
                event_id = %event.id,
                user_id = %user.id,
                status = %subscription.status,
                "billing: unrecognised subscription status"
            );
            return Ok(WebhookOutcome::Skipped("unknown status"));
        };

        let change = SubscriptionChange {
            tier: plan.tier,
            subscription_id: subscription.id.clone(),
            status,
            period_end: subscription
                .period_end()
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            credits_limit: plan.credits(),
        };

        let user_id = user.id;
        self.billing_repo
            .apply_subscription_change(user_id, change)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    %user_id,
                    db_error = ?err,
                    "billing: failed to apply subscription change"
                );
                BillingError::Internal(err)
            })?;

        info!(
            event_id = %event.id,
            %user_id,
            tier = %plan.tier,
            %status,
            "billing: subscription applied"
        );
        Ok(WebhookOutcome::Applied)
    }

    async fn handle_subscription_deleted(
        &self,
        event: &StripeEvent,
    ) -> UseCaseResult<WebhookOutcome> {
        let Some(subscription) = StripeClient::extract_subscription(event) else {
            warn!(event_id = %event.id, "billing: subscription missing in webhook");
            return Ok(WebhookOutcome::Skipped("missing subscription"));
        };

        let Some(user) = self.find_user_by_customer(&subscription.customer).await? else {
            warn!(
                event_id = %event.id,
                customer_id = %subscription.customer,
                "billing: subscription deletion for unknown customer"
            );
            return Ok(WebhookOutcome::Skipped("user not found"));
        };

        let user_id = user.id;
        let downgraded = self
            .billing_repo
            .downgrade_to_free(user_id)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    %user_id,
                    db_error = ?err,
                    "billing: failed to downgrade user"
                );
                BillingError::Internal(err)
            })?;

        info!(
            event_id = %event.id,
            %user_id,
            credits_used = downgraded.credits_used,
            credits_limit = downgraded.credits_limit,
            "billing: subscription canceled, user moved to free tier"
        );
        Ok(WebhookOutcome::Applied)
    }

    async fn handle_invoice_paid(&self, event: &StripeEvent) -> UseCaseResult<WebhookOutcome> {
        let Some(invoice) = StripeClient::extract_invoice(event) else {
            warn!(event_id = %event.id, "billing: invoice missing in webhook");
            return Ok(WebhookOutcome::Skipped("missing invoice"));
        };

        if invoice.subscription_id().is_none() {
            debug!(event_id = %event.id, "billing: invoice not tied to a subscription");
            return Ok(WebhookOutcome::Ignored);
        }

        let Some(user) = self.find_invoice_user(event, invoice.customer.as_deref()).await? else {
            return Ok(WebhookOutcome::Skipped("user not found"));
        };

        let user_id = user.id;
        let tier = user.tier();
        let credits_limit = self.catalog.plan_for_tier(tier).credits();

        self.billing_repo
            .reset_billing_period(user_id, credits_limit)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    %user_id,
                    db_error = ?err,
                    "billing: failed to reset billing period"
                );
                BillingError::Internal(err)
            })?;

        info!(
            event_id = %event.id,
            %user_id,
            tier = %tier,
            credits_limit,
            "billing: credits reset for new billing period"
        );
        Ok(WebhookOutcome::Applied)
    }

    async fn handle_invoice_failed(&self, event: &StripeEvent) -> UseCaseResult<WebhookOutcome> {
        let Some(invoice) = StripeClient::extract_invoice(event) else {
            warn!(event_id = %event.id, "billing: invoice missing in webhook");
            return Ok(WebhookOutcome::Skipped("missing invoice"));
        };

        let Some(user) = self.find_invoice_user(event, invoice.customer.as_deref()).await? else {
            return Ok(WebhookOutcome::Skipped("user not found"));
        };

        let user_id = user.id;
        self.billing_repo
            .update_subscription_status(user_id, SubscriptionStatus::PastDue)
            .await
            .map_err(|err| {
                error!(
                    event_id = %event.id,
                    %user_id,
                    db_error = ?err,
                    "billing: failed to mark subscription past due"
                );
                BillingError::Internal(err)
            })?;

        warn!(event_id = %event.id, %user_id, "billing: invoice payment failed, marked past_due");
        Ok(WebhookOutcome::Applied)
    }

    async fn find_invoice_user(
        &self,
        event: &StripeEvent,
        customer_id: Option<&str>,
    ) -> UseCaseResult<Option<UserEntity>> {
        let Some(customer_id) = customer_id else {
            warn!(event_id = %event.id, "billing: invoice without customer");
            return Ok(None);
        };

        let user = self.find_user_by_customer(customer_id).await?;
        if user.is_none() {
            warn!(
                event_id = %event.id,
                customer_id,
                "billing: invoice for unknown customer"
            );
        }
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> UseCaseResult<Option<UserEntity>> {
        self.user_repo.find_by_id(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "billing: failed to load user");
            BillingError::Internal(err)
        })
    }

    async fn find_user_by_customer(&self, customer_id: &str) -> UseCaseResult<Option<UserEntity>> {
        self.user_repo
            .find_by_customer_id(customer_id)
            .await
            .map_err(|err| {
                error!(customer_id, db_error = ?err, "billing: failed to load user by customer");
                BillingError::Internal(err)
            })
    }
}
