//! Service wiring for the menu server.

use crate::ai::{
    ChatService, FalImageClient, FalModels, ImageGenerationService, NvidiaChatClient,
};
use crate::models::Config;
use crate::server::{self, AppState};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Owns the shared handler state and serves it over HTTP.
pub struct App {
    state: AppState,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub chat: Arc<dyn ChatService>,
    pub images: Arc<dyn ImageGenerationService>,
    pub retry_delay: Duration,
}

impl App {
    pub fn with_services(services: AppServices) -> Self {
        Self {
            state: AppState::new(services.chat, services.images, services.retry_delay),
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &Config) -> Self {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Menu model: {}", config.menu_model);
        let chat = NvidiaChatClient::new_with_client(
            config.nvidia_api_key.clone(),
            config.nvidia_base_url.clone(),
            config.menu_model.clone(),
            http_client.clone(),
        );

        let models = FalModels::from_config(config);
        info!(
            "Image models: food={}, menu={}, edit={}",
            models.food, models.menu, models.edit
        );
        let images = FalImageClient::new_with_client(
            config.fal_key.clone(),
            config.fal_base_url.clone(),
            models,
            http_client,
        );

        Self::with_services(AppServices {
            chat: Arc::new(chat),
            images: Arc::new(images),
            retry_delay: config.retry_delay,
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub async fn serve(self, bind: &str, port: u16) -> anyhow::Result<()> {
        server::run_serve(self.state, bind, port).await
    }
}
