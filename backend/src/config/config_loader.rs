use anyhow::{Context, Result};
use crates::{
    domain::value_objects::catalog::PriceIds, generation::fal_client::DEFAULT_FAL_BASE_URL,
};

use super::{
    config_model::{App, BackendServer, Database, DotEnvyConfig, Fal, Identity, Stripe},
    stage::Stage,
};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match optional("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .context("DATABASE_MAX_CONNECTIONS is invalid")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        },
    };

    let identity = Identity {
        jwt_secret: optional("IDENTITY_JWT_SECRET"),
        jwt_public_key: optional("IDENTITY_JWT_PUBLIC_KEY"),
        webhook_secret: required("IDENTITY_WEBHOOK_SECRET")?,
    };

    if identity.jwt_secret.is_none() && identity.jwt_public_key.is_none() {
        anyhow::bail!("IDENTITY_JWT_SECRET or IDENTITY_JWT_PUBLIC_KEY must be set");
    }

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        prices: PriceIds {
            pro: optional("STRIPE_PRO_PRICE_ID"),
            enterprise: optional("STRIPE_ENTERPRISE_PRICE_ID"),
            credits_10: optional("STRIPE_CREDITS_10_PRICE_ID"),
            credits_25: optional("STRIPE_CREDITS_25_PRICE_ID"),
            credits_50: optional("STRIPE_CREDITS_50_PRICE_ID"),
            credits_100: optional("STRIPE_CREDITS_100_PRICE_ID"),
        },
    };

    let fal = Fal {
        api_key: required("FAL_KEY")?,
        base_url: optional("FAL_BASE_URL").unwrap_or_else(|| DEFAULT_FAL_BASE_URL.to_string()),
    };

    let app = App {
        url: required("APP_URL")?.trim_end_matches('/').to_string(),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        identity,
        stripe,
        fal,
        app,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is invalid"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
