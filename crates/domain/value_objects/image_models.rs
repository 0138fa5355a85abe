use serde::Serialize;

/// A generation model the service can bill for.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ImageModel {
    pub key: &'static str,
    /// Provider endpoint for text-to-image calls.
    pub endpoint: &'static str,
    /// Provider endpoint for calls that carry source images. `None` when the model cannot edit.
    pub edit_endpoint: Option<&'static str>,
    pub name: &'static str,
    pub description: &'static str,
    /// Credits charged per call.
    pub credits: i32,
}

pub const DEFAULT_MODEL_KEY: &str = "flux-schnell";

pub const IMAGE_MODELS: [ImageModel; 4] = [
    ImageModel {
        key: "flux-schnell",
        endpoint: "fal-ai/flux/schnell",
        edit_endpoint: None,
        name: "FLUX Schnell",
        description: "Fast, high-quality image generation",
        credits: 1,
    },
    ImageModel {
        key: "flux-dev",
        endpoint: "fal-ai/flux/dev",
        edit_endpoint: None,
        name: "FLUX Dev",
        description: "Higher quality, slower generation",
        credits: 2,
    },
    ImageModel {
        key: "stable-diffusion",
        endpoint: "fal-ai/stable-diffusion-v3-medium",
        edit_endpoint: None,
        name: "Stable Diffusion v3",
        description: "Versatile image generation",
        credits: 1,
    },
    ImageModel {
        key: "nano-banana",
        endpoint: "fal-ai/nano-banana",
        edit_endpoint: Some("fal-ai/nano-banana/edit"),
        name: "Nano Banana",
        description: "Advanced image editing and transformation",
        credits: 3,
    },
];

impl ImageModel {
    pub fn find(key: &str) -> Option<&'static ImageModel> {
        IMAGE_MODELS.iter().find(|model| model.key == key)
    }

    pub fn supports_editing(&self) -> bool {
        self.edit_endpoint.is_some()
    }
}
