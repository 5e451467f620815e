use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://fal.run";

/// Thin client for fal.ai's synchronous `POST /{model}` endpoint.
pub struct FalHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    timeout: Duration,
}

impl FalHttpClient {
    pub fn new_with_client(
        api_key: String,
        base_url: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Runs `model` with `arguments` and waits for the result.
    pub async fn run<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        arguments: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{}", self.base_url, model.trim_start_matches('/'));
        tracing::debug!("Submitting fal.ai request to {}", model);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(arguments)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to fal.ai: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            tracing::error!("fal.ai error (status {}): {}", status, error_text);
            let message = format!("fal.ai error (status {}): {}", status, error_text);
            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                Error::RateLimited(message)
            } else {
                Error::AiProvider(message)
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse fal.ai response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse fal.ai response: {}", e))
        })
    }
}
