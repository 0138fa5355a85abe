use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::{
    domain::{
        entities::generations::InsertGenerationEntity,
        repositories::{generations::GenerationRepository, users::UserRepository},
        value_objects::{
            enums::image_sizes::ImageSize,
            generations::{
                GenerateImageModel, GeneratedImageDto, GenerationResultDto, MAX_IMAGES_PER_CALL,
            },
            image_models::{DEFAULT_MODEL_KEY, ImageModel},
            users::IdentityClaims,
        },
    },
    generation::fal_client::{FalClient, FalImageRequest, FalImageResult},
};
use thiserror::Error;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::user_resolver::UserResolver;

const DEFAULT_DIMENSION: i32 = 1024;
const TEXT_TO_IMAGE_GUIDANCE_SCALE: f32 = 3.5;
const TEXT_TO_IMAGE_INFERENCE_STEPS: u32 = 4;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, endpoint: &str, request: FalImageRequest)
    -> AnyResult<FalImageResult>;
}

#[async_trait]
impl ImageGenerator for FalClient {
    async fn generate(
        &self,
        endpoint: &str,
        request: FalImageRequest,
    ) -> AnyResult<FalImageResult> {
        self.run(endpoint, &request).await
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    InvalidInput(String),
    #[error("insufficient credits: {required} required, {remaining} remaining")]
    InsufficientCredits { required: i32, remaining: i32 },
    #[error("image generation failed")]
    Upstream(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GenerationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            GenerationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GenerationError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            GenerationError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GenerationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, GenerationError>;

/// A validated generation request, resolved against the model catalog.
#[derive(Debug, Clone, PartialEq)]
struct GenerationPlan {
    model: &'static ImageModel,
    endpoint: &'static str,
    image_size: ImageSize,
    request: FalImageRequest,
}

/// Credits taken for one in-flight upstream call. Unless kept, they go back to the
/// user, including when the request future is dropped before the call returns.
struct CreditReservation<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    user_id: Uuid,
    cost: i32,
    settled: bool,
}

impl<U> CreditReservation<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    fn new(user_repo: Arc<U>, user_id: Uuid, cost: i32) -> Self {
        Self {
            user_repo,
            user_id,
            cost,
            settled: false,
        }
    }

    fn keep(mut self) {
        self.settled = true;
    }

    async fn release(mut self) {
        self.settled = true;
        // Runs on its own task so a cancelled caller cannot stop it halfway.
        if let Some(task) = self.spawn_release() {
            if let Err(err) = task.await {
                error!(user_id = %self.user_id, error = ?err, "generations: release task failed");
            }
        }
    }

    fn spawn_release(&self) -> Option<JoinHandle<()>> {
        let user_repo = Arc::clone(&self.user_repo);
        let (user_id, cost) = (self.user_id, self.cost);

        let Ok(runtime) = Handle::try_current() else {
            error!(%user_id, cost, "generations: no runtime to release reserved credits");
            return None;
        };

        Some(runtime.spawn(async move {
            match user_repo.release_credits(user_id, cost).await {
                Ok(()) => info!(%user_id, cost, "generations: reserved credits released"),
                Err(err) => error!(
                    %user_id,
                    cost,
                    db_error = ?err,
                    "generations: failed to release reserved credits"
                ),
            }
        }))
    }
}

impl<U> Drop for CreditReservation<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        warn!(
            user_id = %self.user_id,
            cost = self.cost,
            "generations: request dropped during upstream call"
        );
        self.spawn_release();
    }
}

pub struct GenerationUseCase<U, G, Img>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
    Img: ImageGenerator + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    user_resolver: Arc<UserResolver<U>>,
    generation_repo: Arc<G>,
    image_generator: Arc<Img>,
}

impl<U, G, Img> GenerationUseCase<U, G, Img>
where
    U: UserRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
    Img: ImageGenerator + Send + Sync + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        user_resolver: Arc<UserResolver<U>>,
        generation_repo: Arc<G>,
        image_generator: Arc<Img>,
    ) -> Self {
        Self {
            user_repo,
            user_resolver,
            generation_repo,
            image_generator,
        }
    }

    pub async fn generate(
        &self,
        claims: &IdentityClaims,
        generate_image_model: GenerateImageModel,
    ) -> UseCaseResult<GenerationResultDto> {
        let plan = Self::plan_request(&generate_image_model).map_err(|err| {
            warn!(
                identity_id = %claims.subject,
                status = err.status_code().as_u16(),
                error = %err,
                "generations: invalid request"
            );
            err
        })?;

        let user = self.user_resolver.resolve(claims).await?;
        let user_id = user.id;
        let cost = plan.model.credits;

        info!(
            %user_id,
            model = plan.model.key,
            endpoint = plan.endpoint,
            cost,
            credits_used = user.credits_used,
            credits_limit = user.credits_limit,
            "generations: generation requested"
        );

        if !user.can_afford(cost) {
            let err = GenerationError::InsufficientCredits {
                required: cost,
                remaining: user.credits_remaining(),
            };
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "generations: insufficient credits"
            );
            return Err(err);
        }

        let reserved = self
            .user_repo
            .reserve_credits(user_id, cost)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "generations: failed to reserve credits");
                GenerationError::Internal(err)
            })?;

        if !reserved {
            let remaining = self
                .user_repo
                .find_by_id(user_id)
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "generations: failed to reload user");
                    GenerationError::Internal(err)
                })?
                .map_or(0, |current| current.credits_remaining());

            let err = GenerationError::InsufficientCredits {
                required: cost,
                remaining,
            };
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "generations: credit reservation lost to a concurrent request"
            );
            return Err(err);
        }

        let reservation = CreditReservation::new(Arc::clone(&self.user_repo), user_id, cost);

        let result = match self
            .image_generator
            .generate(plan.endpoint, plan.request.clone())
            .await
        {
            Ok(result) => {
                reservation.keep();
                result
            }
            Err(err) => {
                error!(
                    %user_id,
                    endpoint = plan.endpoint,
                    error = ?err,
                    "generations: upstream generation failed"
                );
                reservation.release().await;
                return Err(GenerationError::Upstream(err));
            }
        };

        let seed = result.seed.or(plan.request.seed);
        let images: Vec<GeneratedImageDto> = result
            .images
            .iter()
            .map(|image| GeneratedImageDto {
                url: image.url.clone(),
                width: image.width.unwrap_or(DEFAULT_DIMENSION),
                height: image.height.unwrap_or(DEFAULT_DIMENSION),
                content_type: image.content_type.clone(),
            })
            .collect();

        let rows = images
            .iter()
            .map(|image| InsertGenerationEntity {
                user_id,
                prompt: generate_image_model.prompt.trim().to_string(),
                negative_prompt: generate_image_model.negative_prompt.clone(),
                image_url: image.url.clone(),
                image_size: plan.image_size.to_string(),
                style: generate_image_model.style.clone(),
                width: image.width,
                height: image.height,
                seed,
                model_used: plan.model.key.to_string(),
                credits_used: cost,
            })
            .collect();

        // Credits stay charged if this insert fails.
        let generations = self
            .generation_repo
            .insert_generations(rows)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "generations: failed to persist generations");
                GenerationError::Internal(err)
            })?;

        let credits_remaining = (user.credits_limit - user.credits_used - cost).max(0);

        info!(
            %user_id,
            image_count = generations.len(),
            cost,
            credits_remaining,
            "generations: generation completed"
        );

        Ok(GenerationResultDto {
            images,
            seed,
            description: result.description,
            generations,
            credits_used: cost,
            credits_remaining,
        })
    }

    fn plan_request(model: &GenerateImageModel) -> UseCaseResult<GenerationPlan> {
        let prompt = model.prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::InvalidInput(
                "prompt is required".to_string(),
            ));
        }

        let model_key = model
            .model_id
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(DEFAULT_MODEL_KEY);
        let image_model = ImageModel::find(model_key).ok_or_else(|| {
            GenerationError::InvalidInput(format!("unknown model: {model_key}"))
        })?;

        let image_size = match model.image_size.as_deref() {
            Some(value) => ImageSize::from_str(value).ok_or_else(|| {
                GenerationError::InvalidInput(format!("unsupported image size: {value}"))
            })?,
            None => ImageSize::default(),
        };

        let num_images = model.num_images.unwrap_or(1);
        if num_images == 0 || num_images > MAX_IMAGES_PER_CALL {
            return Err(GenerationError::InvalidInput(format!(
                "num_images must be between 1 and {MAX_IMAGES_PER_CALL}"
            )));
        }

        let source_images: Vec<String> = model
            .image_urls
            .iter()
            .flatten()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        let style = model
            .style
            .as_deref()
            .map(str::trim)
            .filter(|style| !style.is_empty());
        let upstream_prompt = match style {
            Some(style) => format!("{prompt}, {style} style"),
            None => prompt.to_string(),
        };

        let negative_prompt = model
            .negative_prompt
            .clone()
            .filter(|negative| !negative.trim().is_empty());

        if source_images.is_empty() {
            return Ok(GenerationPlan {
                model: image_model,
                endpoint: image_model.endpoint,
                image_size,
                request: FalImageRequest {
                    prompt: upstream_prompt,
                    negative_prompt,
                    image_size: Some(image_size.to_string()),
                    num_images: Some(num_images),
                    guidance_scale: Some(TEXT_TO_IMAGE_GUIDANCE_SCALE),
                    num_inference_steps: Some(TEXT_TO_IMAGE_INFERENCE_STEPS),
                    seed: model.seed,
                    image_urls: None,
                },
            });
        }

        let edit_endpoint = image_model.edit_endpoint.ok_or_else(|| {
            GenerationError::InvalidInput(format!(
                "model {} does not accept source images",
                image_model.key
            ))
        })?;

        Ok(GenerationPlan {
            model: image_model,
            endpoint: edit_endpoint,
            image_size,
            request: FalImageRequest {
                prompt: upstream_prompt,
                negative_prompt,
                num_images: Some(num_images),
                seed: model.seed,
                image_urls: Some(source_images),
                ..Default::default()
            },
        })
    }
}
