use super::client::NvidiaHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::ChatService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

const TEMPERATURE: f32 = 0.6;
const TOP_P: f32 = 0.95;
const MAX_TOKENS: u32 = 32768;

pub struct NvidiaChatClient {
    http: NvidiaHttpClient,
    model: String,
}

impl NvidiaChatClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self::new_with_client(api_key, base_url, model, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        base_url: String,
        model: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            // Reasoning models can think for a long while before answering.
            http: NvidiaHttpClient::new_with_client(
                api_key,
                base_url,
                Duration::from_secs(300),
                client,
            ),
            model,
        }
    }
}

#[async_trait]
impl ChatService for NvidiaChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_TOKENS,
        };

        let response = self.http.chat_completion(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::AiProvider("No response from NVIDIA chat API".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "nvidia/llama-3.3-nemotron-super-49b-v1.5";

    fn make_client(server: &MockServer, api_key: &str) -> NvidiaChatClient {
        NvidiaChatClient::new(api_key.to_string(), server.uri(), MODEL.to_string())
    }

    #[tokio::test]
    async fn test_complete_parses_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "<think>burgers</think>{\"restaurantName\": \"Bun Voyage\"}"
                    },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, "test-key");

        let content = client.complete("a burger joint").await.unwrap();
        assert_eq!(content, "<think>burgers</think>{\"restaurantName\": \"Bun Voyage\"}");
    }

    #[tokio::test]
    async fn test_complete_sends_sampling_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains(format!("\"model\":\"{}\"", MODEL)))
            .and(body_string_contains("\"top_p\":0.95"))
            .and(body_string_contains("\"max_tokens\":32768"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "{}" },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        make_client(&server, "key").complete("tacos").await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_rate_limited_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
            .mount(&server)
            .await;

        let err = make_client(&server, "key").complete("tacos").await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_ai_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = make_client(&server, "key").complete("tacos").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = make_client(&server, "key").complete("tacos").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
