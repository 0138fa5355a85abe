use crate::{
    axum_http::error_responses::AppError, usecases::identity_webhook::IdentityWebhookUseCase,
};
use axum::{
    Json, Router, body::Bytes, extract::State, http::HeaderMap, response::IntoResponse,
    routing::post,
};
use crates::{
    domain::repositories::users::UserRepository,
    identity::svix::{IdentityWebhookVerifier, SvixHeaders},
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
};
use serde_json::json;
use std::sync::Arc;

pub fn routes(db_pool: Arc<PgPoolSquad>, verifier: Arc<IdentityWebhookVerifier>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let usecase = IdentityWebhookUseCase::new(Arc::new(user_repository), verifier);

    router(Arc::new(usecase))
}

pub fn router<U>(usecase: Arc<IdentityWebhookUseCase<U>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/identity", post(identity_webhook))
        .with_state(usecase)
}

pub async fn identity_webhook<U>(
    State(usecase): State<Arc<IdentityWebhookUseCase<U>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let svix_headers = SvixHeaders {
        id: header_value(&headers, "svix-id")?,
        timestamp: header_value(&headers, "svix-timestamp")?,
        signature: header_value(&headers, "svix-signature")?,
    };

    usecase.handle(svix_headers, &body).await?;

    Ok(Json(json!({ "received": true })))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("missing {name} header")))
}
