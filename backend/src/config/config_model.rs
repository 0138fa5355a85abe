use crates::domain::value_objects::catalog::PriceIds;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub identity: Identity,
    pub stripe: Stripe,
    pub fal: Fal,
    pub app: App,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

/// Exactly one of `jwt_secret` (HS256) or `jwt_public_key` (RS256 PEM) is used;
/// the public key wins when both are set.
#[derive(Debug, Clone)]
pub struct Identity {
    pub jwt_secret: Option<String>,
    pub jwt_public_key: Option<String>,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub prices: PriceIds,
}

#[derive(Debug, Clone)]
pub struct Fal {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct App {
    pub url: String,
}
