use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        billing::{BillingUseCase, StripeGateway},
        user_resolver::UserResolver,
    },
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::{billing::BillingRepository, users::UserRepository},
        value_objects::{billing::CheckoutRequestModel, catalog::BillingCatalog},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{billing::BillingPostgres, users::UserPostgres},
    },
    payments::stripe_client::StripeClient,
};
use serde_json::json;
use std::sync::Arc;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
    catalog: BillingCatalog,
    app_url: String,
) -> Router {
    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let billing_repository = BillingPostgres::new(Arc::clone(&db_pool));

    let usecase = BillingUseCase::new(
        Arc::clone(&user_repository),
        Arc::new(UserResolver::new(user_repository)),
        Arc::new(billing_repository),
        stripe_client,
        catalog,
        app_url,
    );

    router(Arc::new(usecase))
}

pub fn router<U, B, S>(usecase: Arc<BillingUseCase<U, B, S>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    B: BillingRepository + Send + Sync + 'static,
    S: StripeGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/checkout", post(create_checkout_session))
        .route("/portal", post(create_portal_session))
        .route("/webhook", post(stripe_webhook))
        .with_state(usecase)
}

pub async fn create_checkout_session<U, B, S>(
    State(usecase): State<Arc<BillingUseCase<U, B, S>>>,
    auth: AuthUser,
    Json(checkout_request): Json<CheckoutRequestModel>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    B: BillingRepository + Send + Sync + 'static,
    S: StripeGateway + Send + Sync + 'static,
{
    let redirect = usecase
        .create_checkout_session(&auth.claims, checkout_request)
        .await?;
    Ok(Json(redirect))
}

pub async fn create_portal_session<U, B, S>(
    State(usecase): State<Arc<BillingUseCase<U, B, S>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    B: BillingRepository + Send + Sync + 'static,
    S: StripeGateway + Send + Sync + 'static,
{
    let redirect = usecase.create_portal_session(&auth.claims).await?;
    Ok(Json(redirect))
}

/// Reads the raw body; the signature covers the exact bytes Stripe sent.
pub async fn stripe_webhook<U, B, S>(
    State(usecase): State<Arc<BillingUseCase<U, B, S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    B: BillingRepository + Send + Sync + 'static,
    S: StripeGateway + Send + Sync + 'static,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing stripe-signature header".to_string()))?;

    usecase.handle_stripe_webhook(&body, signature).await?;

    Ok(Json(json!({ "received": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::IdentityKeys, usecases::billing::MockStripeGateway};
    use axum::{
        Extension,
        body::Body,
        http::{Request, StatusCode},
    };
    use crates::{
        domain::repositories::{billing::MockBillingRepository, users::MockUserRepository},
        payments::stripe_client::{StripeEvent, StripeEventData},
    };
    use tower::ServiceExt;

    fn app(stripe: MockStripeGateway) -> Router {
        let user_repo = Arc::new(MockUserRepository::new());
        let usecase = BillingUseCase::new(
            Arc::clone(&user_repo),
            Arc::new(UserResolver::new(user_repo)),
            Arc::new(MockBillingRepository::new()),
            Arc::new(stripe),
            BillingCatalog::default(),
            "https://app.example.com".to_string(),
        );
        Router::new()
            .nest("/api/v1/billing", router(Arc::new(usecase)))
            .layer(Extension(Arc::new(IdentityKeys::from_secret("unused"))))
    }

    #[tokio::test]
    async fn webhook_without_signature_header_is_rejected() {
        let mut stripe = MockStripeGateway::new();
        stripe.expect_verify_webhook_signature().never();

        let response = app(stripe)
            .oneshot(
                Request::post("/api/v1/billing/webhook")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_passes_raw_body_to_verification() {
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_verify_webhook_signature()
            .withf(|payload, signature| payload == b"{\"id\":\"evt_1\"}" && signature == "t=1,v1=ab")
            .times(1)
            .returning(|_, _| {
                Ok(StripeEvent {
                    id: "evt_1".to_string(),
                    type_: "customer.created".to_string(),
                    created: None,
                    livemode: None,
                    data: StripeEventData {
                        object: serde_json::json!({}),
                    },
                })
            });

        let response = app(stripe)
            .oneshot(
                Request::post("/api/v1/billing/webhook")
                    .header("stripe-signature", "t=1,v1=ab")
                    .body(Body::from("{\"id\":\"evt_1\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn checkout_requires_token() {
        let response = app(MockStripeGateway::new())
            .oneshot(
                Request::post("/api/v1/billing/checkout")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"credits","plan_id":"credits-10"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
