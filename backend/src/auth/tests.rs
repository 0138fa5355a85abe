use super::*;
use axum::http::Request;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";

fn sample_claims(exp: usize) -> IdentityTokenClaims {
    IdentityTokenClaims {
        sub: "user_2abcdef".to_string(),
        email: Some("test@example.com".to_string()),
        name: Some("Test User".to_string()),
        image_url: None,
        exp,
    }
}

fn sign(claims: &IdentityTokenClaims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_identity_jwt_success() {
    let keys = IdentityKeys::from_secret(SECRET);
    let my_claims = sample_claims(9999999999);

    let token = sign(&my_claims, SECRET);

    let claims = keys.validate(&token).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_identity_jwt_expired() {
    let keys = IdentityKeys::from_secret(SECRET);
    let token = sign(&sample_claims(1), SECRET);

    assert!(keys.validate(&token).is_err());
}

#[test]
fn test_validate_identity_jwt_invalid_signature() {
    let keys = IdentityKeys::from_secret(SECRET);
    let token = sign(&sample_claims(9999999999), "wrongsecret");

    assert!(keys.validate(&token).is_err());
}

#[test]
fn test_validate_identity_jwt_empty_subject() {
    let keys = IdentityKeys::from_secret(SECRET);
    let mut claims = sample_claims(9999999999);
    claims.sub = " ".to_string();
    let token = sign(&claims, SECRET);

    assert!(keys.validate(&token).is_err());
}

#[test]
fn test_from_config_prefers_secret_when_no_public_key() {
    let identity = Identity {
        jwt_secret: Some(SECRET.to_string()),
        jwt_public_key: None,
        webhook_secret: "whsec_dGVzdA==".to_string(),
    };

    let keys = IdentityKeys::from_config(&identity).unwrap();
    let token = sign(&sample_claims(9999999999), SECRET);
    assert!(keys.validate(&token).is_ok());
}

#[test]
fn test_from_config_rejects_invalid_pem() {
    let identity = Identity {
        jwt_secret: None,
        jwt_public_key: Some("not a pem".to_string()),
        webhook_secret: "whsec_dGVzdA==".to_string(),
    };

    assert!(IdentityKeys::from_config(&identity).is_err());
}

async fn extract(authorization: Option<String>) -> Result<AuthUser, AppError> {
    let mut builder = Request::builder().uri("/api/v1/user");
    if let Some(value) = authorization {
        builder = builder.header(axum::http::header::AUTHORIZATION, value);
    }
    let request = builder
        .extension(Arc::new(IdentityKeys::from_secret(SECRET)))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();

    AuthUser::from_request_parts(&mut parts, &()).await
}

#[tokio::test]
async fn test_extractor_accepts_bearer_token() {
    let token = sign(&sample_claims(9999999999), SECRET);

    let auth = extract(Some(format!("Bearer {token}"))).await.unwrap();

    assert_eq!(auth.subject(), "user_2abcdef");
    assert_eq!(auth.claims.name.as_deref(), Some("Test User"));
}

#[tokio::test]
async fn test_extractor_rejects_missing_or_malformed_header() {
    assert!(matches!(extract(None).await, Err(AppError::Unauthorized)));
    assert!(matches!(
        extract(Some("Token abc".to_string())).await,
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        extract(Some("Bearer not-a-jwt".to_string())).await,
        Err(AppError::Unauthorized)
    ));
}
