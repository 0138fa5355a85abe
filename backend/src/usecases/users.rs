use std::sync::Arc;

use crates::domain::{
    repositories::{generations::GenerationRepository, users::UserRepository},
    value_objects::{
        generations::{GenerationPageDto, GenerationSummaryDto, ListGenerationsQuery, PaginationDto},
        users::{IdentityClaims, UserProfileDto},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::user_resolver::UserResolver;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("generation not found")]
    GenerationNotFound,
    #[error("generation belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UserError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            UserError::GenerationNotFound => StatusCode::NOT_FOUND,
            UserError::Forbidden => StatusCode::FORBIDDEN,
            UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UserError>;

pub struct UserUseCase<U, G>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
{
    user_resolver: Arc<UserResolver<U>>,
    generation_repo: Arc<G>,
}

impl<U, G> UserUseCase<U, G>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
{
    pub fn new(user_resolver: Arc<UserResolver<U>>, generation_repo: Arc<G>) -> Self {
        Self {
            user_resolver,
            generation_repo,
        }
    }

    pub async fn profile(&self, claims: &IdentityClaims) -> UseCaseResult<UserProfileDto> {
        let user = self.user_resolver.resolve(claims).await?;
        let user_id = user.id;

        let total_generations = self
            .generation_repo
            .count_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to count generations");
                UserError::Internal(err)
            })?;

        let last_generation_at = self
            .generation_repo
            .latest_created_at(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to load latest generation");
                UserError::Internal(err)
            })?;

        Ok(UserProfileDto::new(user, total_generations, last_generation_at))
    }

    pub async fn list_generations(
        &self,
        claims: &IdentityClaims,
        query: ListGenerationsQuery,
    ) -> UseCaseResult<GenerationPageDto> {
        let user = self.user_resolver.resolve(claims).await?;
        let user_id = user.id;
        let limit = query.limit();
        let offset = query.offset();

        let generations = self
            .generation_repo
            .list_by_user(user_id, limit, offset)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to list generations");
                UserError::Internal(err)
            })?;

        let total = self
            .generation_repo
            .count_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to count generations");
                UserError::Internal(err)
            })?;

        Ok(GenerationPageDto {
            generations: generations
                .into_iter()
                .map(GenerationSummaryDto::from)
                .collect(),
            pagination: PaginationDto {
                total,
                limit,
                offset,
                has_more: offset + limit < total,
            },
        })
    }

    pub async fn delete_generation(
        &self,
        claims: &IdentityClaims,
        generation_id: Uuid,
    ) -> UseCaseResult<()> {
        let user = self.user_resolver.resolve(claims).await?;
        let user_id = user.id;

        let generation = self
            .generation_repo
            .find_by_id(generation_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %generation_id,
                    db_error = ?err,
                    "users: failed to load generation"
                );
                UserError::Internal(err)
            })?
            .ok_or(UserError::GenerationNotFound)?;

        if generation.user_id != user_id {
            let err = UserError::Forbidden;
            warn!(
                %user_id,
                %generation_id,
                status = err.status_code().as_u16(),
                "users: attempted to delete another user's generation"
            );
            return Err(err);
        }

        let deleted = self
            .generation_repo
            .delete_owned(generation_id, user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %generation_id,
                    db_error = ?err,
                    "users: failed to delete generation"
                );
                UserError::Internal(err)
            })?;

        if !deleted {
            return Err(UserError::GenerationNotFound);
        }

        info!(%user_id, %generation_id, "users: generation deleted");
        Ok(())
    }
}
