use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

pub const DEFAULT_FAL_BASE_URL: &str = "https://fal.run";

/// Synchronous generations can take a while on the slower models.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the fal.ai synchronous run endpoint.
pub struct FalClient {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct FalImageRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_images: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FalImage {
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FalImageResult {
    #[serde(default)]
    pub images: Vec<FalImage>,
    pub seed: Option<i64>,
    pub has_nsfw_concepts: Option<Vec<bool>>,
    pub prompt: Option<String>,
    pub description: Option<String>,
}

impl FalImageResult {
    /// Edit endpoints sometimes wrap the result in a `data` envelope.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let inner = match value.get("data") {
            Some(data) if data.get("images").is_some() => data.clone(),
            _ => value,
        };

        let result: FalImageResult =
            serde_json::from_value(inner).context("unexpected fal response shape")?;

        if result.images.is_empty() {
            anyhow::bail!("fal response contained no images");
        }

        Ok(result)
    }
}

impl FalClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = Url::parse(base_url).context("invalid fal base url")?;

        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }

    /// Runs `endpoint` (e.g. `fal-ai/flux/schnell`) and waits for the images.
    pub async fn run(&self, endpoint: &str, request: &FalImageRequest) -> Result<FalImageResult> {
        let url = self
            .base_url
            .join(endpoint)
            .with_context(|| format!("invalid fal endpoint {endpoint}"))?;

        debug!(%endpoint, "fal: submitting generation");

        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .with_context(|| format!("fal request to {endpoint} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(
                %endpoint,
                status = %status,
                response_body = %body,
                "fal api request failed"
            );
            anyhow::bail!("fal request to {} failed with status {}", endpoint, status);
        }

        let value: serde_json::Value = resp.json().await?;
        FalImageResult::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flat_result() {
        let result = FalImageResult::from_value(json!({
            "images": [{ "url": "https://cdn/a.png", "width": 1024, "height": 768, "content_type": "image/png" }],
            "seed": 42,
            "has_nsfw_concepts": [false],
            "prompt": "a cat"
        }))
        .unwrap();

        assert_eq!(result.images.len(), 1);
        assert_eq!(result.images[0].height, Some(768));
        assert_eq!(result.seed, Some(42));
    }

    #[test]
    fn unwraps_data_envelope() {
        let result = FalImageResult::from_value(json!({
            "data": {
                "images": [{ "url": "https://cdn/edit.jpg" }],
                "description": "edited"
            }
        }))
        .unwrap();

        assert_eq!(result.images[0].url, "https://cdn/edit.jpg");
        assert_eq!(result.images[0].width, None);
        assert_eq!(result.description.as_deref(), Some("edited"));
    }

    #[test]
    fn rejects_result_without_images() {
        assert!(FalImageResult::from_value(json!({ "images": [] })).is_err());
        assert!(FalImageResult::from_value(json!({ "description": "nothing" })).is_err());
    }

    #[test]
    fn request_omits_unset_fields() {
        let request = FalImageRequest {
            prompt: "a cat".to_string(),
            num_images: Some(1),
            ..Default::default()
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({ "prompt": "a cat", "num_images": 1 }));
    }
}
