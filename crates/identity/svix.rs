//! Verification of identity-provider webhooks delivered through Svix.
//!
//! Svix signs `"{svix-id}.{svix-timestamp}.{body}"` with HMAC-SHA256 using the
//! base64 key that follows the `whsec_` prefix of the endpoint secret. The
//! `svix-signature` header carries one or more space separated `v1,<base64>` entries.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SVIX_TOLERANCE_SECS: i64 = 300;

pub const DEFAULT_DISPLAY_NAME: &str = "New User";

#[derive(Debug, Clone, Copy)]
pub struct SvixHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

pub struct IdentityWebhookVerifier {
    key: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IdentityEmailAddress {
    pub id: Option<String>,
    pub email_address: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IdentityUserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<IdentityEmailAddress>,
    pub primary_email_address_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,
}

impl IdentityUserData {
    /// The primary address when flagged, otherwise the first one listed.
    pub fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref().and_then(|primary_id| {
            self.email_addresses
                .iter()
                .find(|address| address.id.as_deref() == Some(primary_id))
        });

        primary
            .or_else(|| self.email_addresses.first())
            .map(|address| address.email_address.as_str())
    }

    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().filter(|v| !v.trim().is_empty());
        let last = self.last_name.as_deref().filter(|v| !v.trim().is_empty());

        match (first, last) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => self
                .username
                .clone()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        }
    }
}

impl IdentityWebhookVerifier {
    pub fn new(secret: &str) -> Result<Self> {
        let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .context("identity webhook secret is not valid base64")?;
        Ok(Self { key })
    }

    pub fn verify(&self, headers: SvixHeaders<'_>, payload: &[u8]) -> Result<IdentityEvent> {
        self.verify_at(headers, payload, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        headers: SvixHeaders<'_>,
        payload: &[u8],
        now: i64,
    ) -> Result<IdentityEvent> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .context("svix-timestamp is not a unix timestamp")?;

        if (now - timestamp).abs() > SVIX_TOLERANCE_SECS {
            anyhow::bail!("svix-timestamp outside tolerance");
        }

        let mut mac = HmacSha256::new_from_slice(&self.key)?;
        mac.update(headers.id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|encoded| STANDARD.decode(encoded).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

        if !matched {
            anyhow::bail!("invalid svix signature");
        }

        let event: IdentityEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_760_000_000;

    fn secret() -> String {
        format!("whsec_{}", STANDARD.encode(b"identity-test-key"))
    }

    fn sign(id: &str, timestamp: i64, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(b"identity-test-key").unwrap();
        mac.update(format!("{id}.{timestamp}.{payload}").as_bytes());
        format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn payload() -> String {
        json!({
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "email_addresses": [{ "id": "idn_1", "email_address": "ada@example.com" }],
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img/ada.png"
            }
        })
        .to_string()
    }

    #[test]
    fn verifies_signed_event() {
        let verifier = IdentityWebhookVerifier::new(&secret()).unwrap();
        let payload = payload();
        let signature = format!("v1,bm90LWl0 {}", sign("msg_1", NOW, &payload));
        let timestamp = NOW.to_string();

        let event = verifier
            .verify_at(
                SvixHeaders {
                    id: "msg_1",
                    timestamp: &timestamp,
                    signature: &signature,
                },
                payload.as_bytes(),
                NOW,
            )
            .unwrap();

        assert_eq!(event.type_, "user.created");
        let user: IdentityUserData = serde_json::from_value(event.data).unwrap();
        assert_eq!(user.primary_email(), Some("ada@example.com"));
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn rejects_signature_for_other_message_id() {
        let verifier = IdentityWebhookVerifier::new(&secret()).unwrap();
        let payload = payload();
        let signature = sign("msg_1", NOW, &payload);
        let timestamp = NOW.to_string();

        let result = verifier.verify_at(
            SvixHeaders {
                id: "msg_2",
                timestamp: &timestamp,
                signature: &signature,
            },
            payload.as_bytes(),
            NOW,
        );

        assert!(result.is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = IdentityWebhookVerifier::new(&secret()).unwrap();
        let payload = payload();
        let signed_at = NOW - SVIX_TOLERANCE_SECS - 10;
        let signature = sign("msg_1", signed_at, &payload);
        let timestamp = signed_at.to_string();

        let result = verifier.verify_at(
            SvixHeaders {
                id: "msg_1",
                timestamp: &timestamp,
                signature: &signature,
            },
            payload.as_bytes(),
            NOW,
        );

        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_base64_secret() {
        assert!(IdentityWebhookVerifier::new("whsec_***").is_err());
    }

    #[test]
    fn display_name_fallbacks() {
        let mut user: IdentityUserData = serde_json::from_value(json!({
            "id": "user_1",
            "first_name": "Grace"
        }))
        .unwrap();
        assert_eq!(user.display_name(), "Grace");
        assert_eq!(user.primary_email(), None);

        user.first_name = None;
        assert_eq!(user.display_name(), DEFAULT_DISPLAY_NAME);

        user.username = Some("ghopper".to_string());
        assert_eq!(user.display_name(), "ghopper");
    }

    #[test]
    fn primary_email_prefers_flagged_address() {
        let user: IdentityUserData = serde_json::from_value(json!({
            "id": "user_1",
            "primary_email_address_id": "idn_2",
            "email_addresses": [
                { "id": "idn_1", "email_address": "old@example.com" },
                { "id": "idn_2", "email_address": "new@example.com" }
            ]
        }))
        .unwrap();

        assert_eq!(user.primary_email(), Some("new@example.com"));
    }
}
