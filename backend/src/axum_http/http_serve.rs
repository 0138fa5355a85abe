use crate::{
    auth::IdentityKeys,
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    domain::value_objects::catalog::BillingCatalog, generation::fal_client::FalClient,
    identity::svix::IdentityWebhookVerifier, infra::db::postgres::postgres_connection::PgPoolSquad,
    payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let identity_keys = Arc::new(IdentityKeys::from_config(&config.identity)?);
    let identity_verifier = Arc::new(IdentityWebhookVerifier::new(
        &config.identity.webhook_secret,
    )?);
    let stripe_client = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
    ));
    let fal_client = Arc::new(
        FalClient::new(config.fal.api_key.clone(), &config.fal.base_url)
            .context("failed to build fal client")?,
    );
    let catalog = BillingCatalog::new(config.stripe.prices.clone());

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/generate",
            routers::generations::routes(Arc::clone(&db_pool), fal_client),
        )
        .nest(
            "/api/v1/billing",
            routers::billing::routes(
                Arc::clone(&db_pool),
                stripe_client,
                catalog.clone(),
                config.app.url.clone(),
            ),
        )
        .nest(
            "/api/v1/webhooks",
            routers::identity_webhook::routes(Arc::clone(&db_pool), identity_verifier),
        )
        .nest("/api/v1/user", routers::users::routes(Arc::clone(&db_pool)))
        .nest("/api/v1/catalog", routers::catalog::routes(catalog))
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(identity_keys))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static("stripe-signature"),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
