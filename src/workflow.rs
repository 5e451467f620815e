//! Rendering steps shared by the one-shot `/api/generate` endpoint and the
//! variant sessions: attach food photos, then compose the menu image.

use crate::ai::ImageGenerationService;
use crate::models::{image_urls, MenuItem};
use crate::{prompts, Result};
use tracing::{info, warn};

/// Generates a photo for every item that lacks one. A failed generation
/// leaves the item with an empty URL; nothing is retried.
pub async fn attach_food_images(images: &dyn ImageGenerationService, items: &mut [MenuItem]) {
    info!("Processing {} menu items...", items.len());

    for item in items.iter_mut() {
        if item.has_image() {
            info!("Using provided image for: {}", item.name);
            continue;
        }

        info!("Generating image for: {}", item.name);
        let prompt = prompts::food_photo_prompt(&item.name, &item.description);
        let url = match images.generate_food_image(&prompt).await {
            Ok(url) => {
                info!("Generated image for {}: {}", item.name, url);
                url
            }
            Err(e) => {
                warn!("Error generating image for {}: {}", item.name, e);
                String::new()
            }
        };
        item.image_url = Some(url);
    }
}

/// A planned menu render: the prompt plus the food photos it references.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuRender {
    pub prompt: String,
    pub source_images: Vec<String>,
}

impl MenuRender {
    /// Multi-image composition when any item has a photo, text-only otherwise.
    pub fn plan(restaurant_name: &str, items: &[MenuItem], style: &str) -> Self {
        let source_images = image_urls(items);
        let prompt = if source_images.is_empty() {
            prompts::menu_layout_prompt(restaurant_name, items, style)
        } else {
            prompts::menu_composition_prompt(restaurant_name, items, style)
        };

        Self {
            prompt,
            source_images,
        }
    }

    pub fn is_composition(&self) -> bool {
        !self.source_images.is_empty()
    }

    pub async fn execute(&self, images: &dyn ImageGenerationService) -> Result<String> {
        if self.is_composition() {
            info!(
                "Composing menu from {} food photos",
                self.source_images.len()
            );
            images
                .compose_menu_image(&self.prompt, &self.source_images)
                .await
        } else {
            info!("Generating text-only menu image");
            images.generate_menu_image(&self.prompt).await
        }
    }
}
