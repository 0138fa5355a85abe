use std::sync::Arc;

use anyhow::Result;
use crates::domain::{
    entities::users::{InsertUserEntity, UserEntity},
    repositories::users::UserRepository,
    value_objects::users::IdentityClaims,
};
use tracing::{error, info};

/// Maps a verified identity to the local user row, creating it on first sight.
pub struct UserResolver<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
}

impl<U> UserResolver<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn resolve(&self, claims: &IdentityClaims) -> Result<UserEntity> {
        let subject = claims.subject.as_str();

        if let Some(user) = self
            .user_repo
            .find_by_identity_id(subject)
            .await
            .map_err(|err| {
                error!(
                    identity_id = subject,
                    db_error = ?err,
                    "user_resolver: failed to load user by identity id"
                );
                err
            })?
        {
            return Ok(user);
        }

        info!(identity_id = subject, "user_resolver: creating user on first request");

        let insert_user_entity = InsertUserEntity::free(
            subject.to_string(),
            claims.email.clone().unwrap_or_default(),
            claims.name.clone(),
            claims.image_url.clone(),
        );

        let user = self
            .user_repo
            .create_user(insert_user_entity)
            .await
            .map_err(|err| {
                error!(
                    identity_id = subject,
                    db_error = ?err,
                    "user_resolver: failed to create user"
                );
                err
            })?;

        Ok(user)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use crates::domain::{
        repositories::users::MockUserRepository,
        value_objects::enums::subscription_tiers::FREE_TIER_CREDITS,
    };
    use uuid::Uuid;

    pub(crate) fn sample_claims() -> IdentityClaims {
        IdentityClaims {
            subject: "user_2abc".to_string(),
            email: Some("ada@example.com".to_string()),
            name: Some("Ada Lovelace".to_string()),
            image_url: None,
        }
    }

    pub(crate) fn sample_user(credits_used: i32, credits_limit: i32) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id: Uuid::new_v4(),
            identity_id: "user_2abc".to_string(),
            email: "ada@example.com".to_string(),
            name: Some("Ada Lovelace".to_string()),
            image_url: None,
            tier: "free".to_string(),
            credits_used,
            credits_limit,
            customer_id: None,
            subscription_id: None,
            subscription_status: None,
            subscription_period_end: None,
            last_credit_reset: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn returns_existing_user() {
        let user = sample_user(3, 10);
        let expected = user.clone();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_identity_id()
            .withf(|identity_id| identity_id == "user_2abc")
            .returning(move |_| Ok(Some(user.clone())));
        user_repo.expect_create_user().never();

        let resolver = UserResolver::new(Arc::new(user_repo));
        let resolved = resolver.resolve(&sample_claims()).await.unwrap();

        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn creates_free_user_when_missing() {
        let created = sample_user(0, FREE_TIER_CREDITS);
        let expected = created.clone();

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_identity_id()
            .returning(|_| Ok(None));
        user_repo
            .expect_create_user()
            .withf(|insert| {
                insert.identity_id == "user_2abc"
                    && insert.email == "ada@example.com"
                    && insert.tier == "free"
                    && insert.credits_used == 0
                    && insert.credits_limit == FREE_TIER_CREDITS
            })
            .times(1)
            .returning(move |_| Ok(created.clone()));

        let resolver = UserResolver::new(Arc::new(user_repo));
        let resolved = resolver.resolve(&sample_claims()).await.unwrap();

        assert_eq!(resolved, expected);
    }
}
