use super::client::FalHttpClient;
use super::types::{EditImageRequest, ImageResponse, TextToImageRequest};
use crate::ai::ImageGenerationService;
use crate::models::Config;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Model endpoints used for each image operation.
#[derive(Debug, Clone)]
pub struct FalModels {
    pub food: String,
    pub menu: String,
    pub edit: String,
}

impl FalModels {
    pub fn from_config(config: &Config) -> Self {
        Self {
            food: config.food_image_model.clone(),
            menu: config.menu_image_model.clone(),
            edit: config.menu_edit_model.clone(),
        }
    }
}

pub struct FalImageClient {
    http: FalHttpClient,
    models: FalModels,
}

impl FalImageClient {
    pub fn new(api_key: String, base_url: String, models: FalModels) -> Self {
        Self::new_with_client(api_key, base_url, models, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        base_url: String,
        models: FalModels,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: FalHttpClient::new_with_client(
                api_key,
                base_url,
                Duration::from_secs(180),
                client,
            ),
            models,
        }
    }

    async fn first_url<Req: serde::Serialize>(&self, model: &str, arguments: &Req) -> Result<String> {
        let response: ImageResponse = self.http.run(model, arguments).await?;
        response
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::AiProvider(format!("No image returned by {}", model)))
    }
}

#[async_trait]
impl ImageGenerationService for FalImageClient {
    async fn generate_food_image(&self, prompt: &str) -> Result<String> {
        let request = TextToImageRequest {
            prompt: prompt.to_string(),
            image_size: Some("square".to_string()),
            num_images: Some(1),
        };
        self.first_url(&self.models.food, &request).await
    }

    async fn generate_menu_image(&self, prompt: &str) -> Result<String> {
        let request = TextToImageRequest {
            prompt: prompt.to_string(),
            image_size: None,
            num_images: None,
        };
        self.first_url(&self.models.menu, &request).await
    }

    async fn compose_menu_image(&self, prompt: &str, image_urls: &[String]) -> Result<String> {
        if image_urls.is_empty() {
            return Err(Error::Generic(
                "Menu composition requires at least one source image".to_string(),
            ));
        }

        let request = EditImageRequest {
            prompt: prompt.to_string(),
            image_urls: image_urls.to_vec(),
        };
        self.first_url(&self.models.edit, &request).await
    }

    async fn edit_image(&self, image_url: &str, instruction: &str) -> Result<String> {
        let request = EditImageRequest {
            prompt: instruction.to_string(),
            image_urls: vec![image_url.to_string()],
        };
        self.first_url(&self.models.edit, &request).await
    }
}
