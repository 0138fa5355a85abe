use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{
    config::{config_loader, stage::Stage},
    usecases::{
        billing::BillingError, generations::GenerationError,
        identity_webhook::IdentityWebhookError, users::UserError,
    },
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InsufficientCredits(String),

    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response_for(self, stage: Stage) -> Response {
        let status = self.status_code();

        let (message, details) = match self {
            AppError::Upstream { message, source } => {
                error!(error = ?source, status = status.as_u16(), "http: upstream failure");
                let details = (!stage.is_production()).then(|| format!("{source:#}"));
                (message, details)
            }
            AppError::Internal(err) => {
                error!(error = ?err, status = status.as_u16(), "http: internal error");
                // Don't leak internal error detail to client
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_for(config_loader::get_stage())
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidInput(msg) => AppError::BadRequest(msg),
            err @ GenerationError::InsufficientCredits { .. } => {
                AppError::InsufficientCredits(err.to_string())
            }
            GenerationError::Upstream(source) => AppError::Upstream {
                message: "Image generation failed".to_string(),
                source,
            },
            GenerationError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidInput(msg) => AppError::BadRequest(msg),
            err @ BillingError::InvalidSignature => AppError::BadRequest(err.to_string()),
            err @ BillingError::CustomerNotFound => AppError::NotFound(err.to_string()),
            BillingError::Upstream(source) => AppError::Upstream {
                message: "Payment provider request failed".to_string(),
                source,
            },
            BillingError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            err @ UserError::GenerationNotFound => AppError::NotFound(err.to_string()),
            err @ UserError::Forbidden => AppError::Forbidden(err.to_string()),
            UserError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<IdentityWebhookError> for AppError {
    fn from(err: IdentityWebhookError) -> Self {
        match err {
            IdentityWebhookError::Internal(err) => AppError::Internal(err),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn usecase_errors_keep_their_status() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                GenerationError::InvalidInput("prompt is required".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                GenerationError::InsufficientCredits {
                    required: 3,
                    remaining: 1,
                }
                .into(),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                GenerationError::Upstream(anyhow::anyhow!("fal down")).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (BillingError::CustomerNotFound.into(), StatusCode::NOT_FOUND),
            (BillingError::InvalidSignature.into(), StatusCode::BAD_REQUEST),
            (UserError::Forbidden.into(), StatusCode::FORBIDDEN),
            (UserError::GenerationNotFound.into(), StatusCode::NOT_FOUND),
            (
                IdentityWebhookError::InvalidSignature.into(),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::Internal(anyhow::anyhow!("db down")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[tokio::test]
    async fn upstream_details_are_hidden_in_production() {
        let err = AppError::from(GenerationError::Upstream(anyhow::anyhow!("fal returned 503")));
        let response = err.into_response_for(Stage::Production);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_json(response).await;
        assert_eq!(body["code"], 502);
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn upstream_details_are_echoed_outside_production() {
        let err = AppError::from(BillingError::Upstream(anyhow::anyhow!("stripe timeout")));
        let body = body_json(err.into_response_for(Stage::Development)).await;

        assert_eq!(body["message"], "Payment provider request failed");
        assert_eq!(body["details"], "stripe timeout");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused"));
        let body = body_json(err.into_response_for(Stage::Local)).await;

        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("details").is_none());
    }
}
