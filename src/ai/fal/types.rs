//! fal.ai request/response payloads.

use serde::{Deserialize, Serialize};

/// Text-to-image arguments.
#[derive(Debug, Serialize)]
pub struct TextToImageRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_images: Option<u32>,
}

/// Image-to-image arguments; every source URL is passed to the model.
#[derive(Debug, Serialize)]
pub struct EditImageRequest {
    pub prompt: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}
