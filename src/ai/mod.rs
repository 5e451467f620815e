//! AI service integration for menu text and image generation
//!
//! Menu text comes from an OpenAI-compatible chat completion endpoint
//! (NVIDIA); food photos and menu layouts come from fal.ai image models.

pub mod fal;
pub mod mock;
pub mod nvidia;

pub use fal::{FalImageClient, FalModels};
pub use mock::{MockChatClient, MockImageClient};
pub use nvidia::NvidiaChatClient;

use crate::Result;
use async_trait::async_trait;

/// Single-turn text completion.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Returns the raw assistant content, reasoning blocks included.
    ///
    /// Rate limiting is reported as [`crate::Error::RateLimited`] so callers
    /// can retry it separately from other failures.
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model(&self) -> &str;
}

/// Image generation. Every operation returns the URL of the first image
/// produced; nothing is retried.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Square photo of a single dish.
    async fn generate_food_image(&self, prompt: &str) -> Result<String>;

    /// Text-only menu composition.
    async fn generate_menu_image(&self, prompt: &str) -> Result<String>;

    /// Menu composition from existing food photos.
    async fn compose_menu_image(&self, prompt: &str, image_urls: &[String]) -> Result<String>;

    /// Apply an edit instruction to an existing image.
    async fn edit_image(&self, image_url: &str, instruction: &str) -> Result<String>;
}
