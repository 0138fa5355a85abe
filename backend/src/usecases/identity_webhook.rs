use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        entities::users::{InsertUserEntity, UpdateIdentityProfileEntity, UserEntity},
        repositories::users::UserRepository,
    },
    identity::svix::{IdentityUserData, IdentityWebhookVerifier, SvixHeaders},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum IdentityWebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IdentityWebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            IdentityWebhookError::InvalidSignature | IdentityWebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            IdentityWebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, IdentityWebhookError>;

pub struct IdentityWebhookUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    verifier: Arc<IdentityWebhookVerifier>,
}

impl<U> IdentityWebhookUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, verifier: Arc<IdentityWebhookVerifier>) -> Self {
        Self {
            user_repo,
            verifier,
        }
    }

    /// Returns the synced user for `user.created` / `user.updated`, `None` for other events.
    pub async fn handle(
        &self,
        headers: SvixHeaders<'_>,
        payload: &[u8],
    ) -> UseCaseResult<Option<UserEntity>> {
        let event = self.verifier.verify(headers, payload).map_err(|err| {
            warn!(
                svix_id = headers.id,
                error = %err,
                status = IdentityWebhookError::InvalidSignature.status_code().as_u16(),
                "identity_webhook: verification failed"
            );
            IdentityWebhookError::InvalidSignature
        })?;

        info!(
            svix_id = headers.id,
            event_type = %event.type_,
            "identity_webhook: event verified"
        );

        match event.type_.as_str() {
            "user.created" | "user.updated" => {
                let data: IdentityUserData = serde_json::from_value(event.data).map_err(|err| {
                    warn!(svix_id = headers.id, error = %err, "identity_webhook: malformed user data");
                    IdentityWebhookError::InvalidPayload("malformed user data".to_string())
                })?;

                let user = self.sync_user(&data).await?;
                Ok(Some(user))
            }
            _ => {
                debug!(event_type = %event.type_, "identity_webhook: unhandled event type");
                Ok(None)
            }
        }
    }

    async fn sync_user(&self, data: &IdentityUserData) -> UseCaseResult<UserEntity> {
        let email = data.primary_email().map(str::to_string);
        let name = data.display_name();

        let insert_user_entity = InsertUserEntity::free(
            data.id.clone(),
            email.clone().unwrap_or_default(),
            Some(name.clone()),
            data.image_url.clone(),
        );

        let profile = UpdateIdentityProfileEntity {
            email,
            name: Some(name),
            image_url: data.image_url.clone(),
            updated_at: Utc::now(),
        };

        let user = self
            .user_repo
            .upsert_identity_profile(insert_user_entity, profile)
            .await
            .map_err(|err| {
                error!(
                    identity_id = %data.id,
                    db_error = ?err,
                    "identity_webhook: failed to upsert user"
                );
                IdentityWebhookError::Internal(err)
            })?;

        info!(
            identity_id = %data.id,
            user_id = %user.id,
            "identity_webhook: user synced"
        );

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::user_resolver::tests::sample_user;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use crates::domain::{
        repositories::users::MockUserRepository,
        value_objects::enums::subscription_tiers::FREE_TIER_CREDITS,
    };
    use hmac::{Hmac, Mac};
    use serde_json::json;
    use sha2::Sha256;

    const KEY: &[u8] = b"identity-webhook-key";

    fn verifier() -> Arc<IdentityWebhookVerifier> {
        let secret = format!("whsec_{}", STANDARD.encode(KEY));
        Arc::new(IdentityWebhookVerifier::new(&secret).unwrap())
    }

    fn sign(id: &str, timestamp: &str, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(KEY).unwrap();
        mac.update(format!("{id}.{timestamp}.{payload}").as_bytes());
        format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
    }

    async fn deliver(
        usecase: &IdentityWebhookUseCase<MockUserRepository>,
        payload: &str,
        signature: Option<String>,
    ) -> UseCaseResult<Option<UserEntity>> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = signature.unwrap_or_else(|| sign("msg_1", &timestamp, payload));

        usecase
            .handle(
                SvixHeaders {
                    id: "msg_1",
                    timestamp: &timestamp,
                    signature: &signature,
                },
                payload.as_bytes(),
            )
            .await
    }

    #[tokio::test]
    async fn created_user_is_upserted_on_free_tier() {
        let stored = sample_user(0, FREE_TIER_CREDITS);

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_upsert_identity_profile()
            .withf(|insert, profile| {
                insert.identity_id == "user_2abc"
                    && insert.email == "ada@example.com"
                    && insert.name.as_deref() == Some("Ada Lovelace")
                    && insert.tier == "free"
                    && insert.credits_limit == FREE_TIER_CREDITS
                    && profile.email.as_deref() == Some("ada@example.com")
                    && profile.image_url.as_deref() == Some("https://img/ada.png")
            })
            .times(1)
            .returning(move |_, _| Ok(stored.clone()));

        let usecase = IdentityWebhookUseCase::new(Arc::new(user_repo), verifier());
        let payload = json!({
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "email_addresses": [{ "email_address": "ada@example.com" }],
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img/ada.png"
            }
        })
        .to_string();

        let synced = deliver(&usecase, &payload, None).await.unwrap();
        assert!(synced.is_some());
    }

    #[tokio::test]
    async fn update_without_email_keeps_stored_email() {
        let stored = sample_user(0, FREE_TIER_CREDITS);

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_upsert_identity_profile()
            .withf(|_, profile| profile.email.is_none() && profile.name.as_deref() == Some("New User"))
            .times(1)
            .returning(move |_, _| Ok(stored.clone()));

        let usecase = IdentityWebhookUseCase::new(Arc::new(user_repo), verifier());
        let payload = json!({
            "type": "user.updated",
            "data": { "id": "user_2abc", "email_addresses": [] }
        })
        .to_string();

        deliver(&usecase, &payload, None).await.unwrap();
    }

    #[tokio::test]
    async fn bad_signature_is_rejected() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_upsert_identity_profile().never();

        let usecase = IdentityWebhookUseCase::new(Arc::new(user_repo), verifier());
        let payload = json!({ "type": "user.created", "data": { "id": "user_2abc" } }).to_string();

        let err = deliver(&usecase, &payload, Some("v1,AAAA".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityWebhookError::InvalidSignature));
    }

    #[tokio::test]
    async fn other_events_are_acknowledged() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_upsert_identity_profile().never();

        let usecase = IdentityWebhookUseCase::new(Arc::new(user_repo), verifier());
        let payload = json!({ "type": "session.created", "data": { "id": "sess_1" } }).to_string();

        let synced = deliver(&usecase, &payload, None).await.unwrap();
        assert!(synced.is_none());
    }
}
