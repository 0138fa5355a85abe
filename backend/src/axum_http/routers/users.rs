use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{user_resolver::UserResolver, users::UserUseCase},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use crates::{
    domain::{
        repositories::{generations::GenerationRepository, users::UserRepository},
        value_objects::generations::ListGenerationsQuery,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{generations::GenerationPostgres, users::UserPostgres},
    },
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let generation_repository = GenerationPostgres::new(Arc::clone(&db_pool));

    let usecase = UserUseCase::new(
        Arc::new(UserResolver::new(Arc::new(user_repository))),
        Arc::new(generation_repository),
    );

    router(Arc::new(usecase))
}

pub fn router<U, G>(usecase: Arc<UserUseCase<U, G>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(profile))
        .route("/generations", get(list_generations))
        .route("/generations/:generation_id", delete(delete_generation))
        .with_state(usecase)
}

pub async fn profile<U, G>(
    State(usecase): State<Arc<UserUseCase<U, G>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
{
    let profile = usecase.profile(&auth.claims).await?;
    Ok(Json(profile))
}

pub async fn list_generations<U, G>(
    State(usecase): State<Arc<UserUseCase<U, G>>>,
    auth: AuthUser,
    Query(query): Query<ListGenerationsQuery>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
{
    let page = usecase.list_generations(&auth.claims, query).await?;
    Ok(Json(page))
}

pub async fn delete_generation<U, G>(
    State(usecase): State<Arc<UserUseCase<U, G>>>,
    auth: AuthUser,
    Path(generation_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
{
    let generation_id = Uuid::parse_str(&generation_id)
        .map_err(|_| AppError::BadRequest("generation id must be a valid UUID".to_string()))?;

    info!(
        identity_id = auth.subject(),
        %generation_id,
        "users: delete generation request received"
    );

    usecase.delete_generation(&auth.claims, generation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
