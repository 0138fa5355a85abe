use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        generations::{GenerationUseCase, ImageGenerator},
        user_resolver::UserResolver,
    },
};
use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use crates::{
    domain::{
        repositories::{generations::GenerationRepository, users::UserRepository},
        value_objects::generations::GenerateImageModel,
    },
    generation::fal_client::FalClient,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{generations::GenerationPostgres, users::UserPostgres},
    },
};
use std::sync::Arc;
use tracing::info;

pub fn routes(db_pool: Arc<PgPoolSquad>, fal_client: Arc<FalClient>) -> Router {
    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let generation_repository = GenerationPostgres::new(Arc::clone(&db_pool));

    let usecase = GenerationUseCase::new(
        Arc::clone(&user_repository),
        Arc::new(UserResolver::new(user_repository)),
        Arc::new(generation_repository),
        fal_client,
    );

    router(Arc::new(usecase))
}

pub fn router<U, G, Img>(usecase: Arc<GenerationUseCase<U, G, Img>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
    Img: ImageGenerator + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(generate))
        .with_state(usecase)
}

pub async fn generate<U, G, Img>(
    State(usecase): State<Arc<GenerationUseCase<U, G, Img>>>,
    auth: AuthUser,
    Json(generate_image_model): Json<GenerateImageModel>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
    Img: ImageGenerator + Send + Sync + 'static,
{
    info!(
        identity_id = auth.subject(),
        model_id = ?generate_image_model.model_id,
        "generations: generate request received"
    );

    let result = usecase
        .generate(&auth.claims, generate_image_model)
        .await?;

    Ok(Json(result))
}
