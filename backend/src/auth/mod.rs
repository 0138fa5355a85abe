use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use crates::domain::value_objects::users::IdentityClaims;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{axum_http::error_responses::AppError, config::config_model::Identity};

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityTokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "picture")]
    pub image_url: Option<String>,
    pub exp: usize,
}

/// Verification material for identity-provider session tokens.
pub struct IdentityKeys {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl IdentityKeys {
    pub fn from_config(identity: &Identity) -> Result<Self> {
        if let Some(pem) = identity.jwt_public_key.as_deref() {
            // Env files usually carry the PEM on one line with literal `\n`.
            let pem = pem.replace("\\n", "\n");
            let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .context("IDENTITY_JWT_PUBLIC_KEY is not a valid RSA PEM")?;
            return Ok(Self {
                decoding_key,
                algorithm: Algorithm::RS256,
            });
        }

        let secret = identity
            .jwt_secret
            .as_deref()
            .context("IDENTITY_JWT_SECRET is invalid")?;

        Ok(Self::from_secret(secret))
    }

    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
        }
    }

    pub fn validate(&self, token: &str) -> Result<IdentityTokenClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_aud = false;

        let token_data = decode::<IdentityTokenClaims>(token, &self.decoding_key, &validation)
            .context("JWT validation failed")?;

        if token_data.claims.sub.trim().is_empty() {
            anyhow::bail!("token subject is empty");
        }

        Ok(token_data.claims)
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: IdentityClaims,
}

impl AuthUser {
    pub fn subject(&self) -> &str {
        &self.claims.subject
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<Arc<IdentityKeys>>()
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("identity keys are not configured"))
            })?;

        let auth_str = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let claims = keys.validate(token).map_err(|err| {
            warn!(error = %err, "auth: rejected identity token");
            AppError::Unauthorized
        })?;

        debug!(subject = %claims.sub, "auth: identity token accepted");

        Ok(AuthUser {
            claims: IdentityClaims {
                subject: claims.sub,
                email: claims.email,
                name: claims.name,
                image_url: claims.image_url,
            },
        })
    }
}

#[cfg(test)]
mod tests;
