//! Menu text generation
//!
//! Turns a free-text restaurant concept into a [`Menu`] via the chat model.
//! Rate limits are retried with a linear backoff; any other failure, or a
//! response that does not look like a menu, yields [`Menu::fallback`].

use crate::ai::ChatService;
use crate::models::Menu;
use crate::{prompts, Error, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("valid think-block regex"));

/// Generates menus from a chat model, never failing outward.
pub struct MenuGenerator {
    chat: Arc<dyn ChatService>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl MenuGenerator {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self {
            chat,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Base delay; the wait before attempt `n + 1` is `n * retry_delay`.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn model(&self) -> &str {
        self.chat.model()
    }

    /// Menu for `user_prompt`, or the fallback menu on any failure.
    pub async fn generate_menu(&self, user_prompt: &str) -> Menu {
        match self.try_generate_menu(user_prompt).await {
            Ok(menu) => {
                info!(
                    "Generated menu '{}' with {} items",
                    menu.restaurant_name,
                    menu.items.len()
                );
                menu
            }
            Err(e) => {
                warn!("Menu generation failed, using fallback menu: {}", e);
                Menu::fallback()
            }
        }
    }

    /// Like [`generate_menu`](Self::generate_menu) but surfaces the failure.
    pub async fn try_generate_menu(&self, user_prompt: &str) -> Result<Menu> {
        let prompt = prompts::menu_generation_prompt(user_prompt);
        let content = self.complete_with_retry(&prompt).await?;
        debug!(
            "Menu model response (first 200 chars): {}",
            content.chars().take(200).collect::<String>()
        );
        parse_menu_response(&content)
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String> {
        let delay = self.retry_delay;
        let max_attempts = self.max_attempts;
        let strategy = (1..max_attempts).map(move |n| delay * n);

        let mut attempt = 0;
        RetryIf::spawn(
            strategy,
            || self.chat.complete(prompt),
            |e: &Error| {
                attempt += 1;
                if e.is_rate_limited() {
                    warn!(
                        "Menu model rate limited (attempt {}/{})",
                        attempt, max_attempts
                    );
                    true
                } else {
                    false
                }
            },
        )
        .await
    }
}

/// Splits a `<think>...</think>` reasoning block from the final answer.
/// Every block is removed from the answer.
pub fn extract_reasoning(content: &str) -> (Option<String>, String) {
    match THINK_BLOCK.captures(content) {
        Some(captures) => {
            let reasoning = captures
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let answer = THINK_BLOCK.replace_all(content, "").trim().to_string();
            (Some(reasoning), answer)
        }
        None => (None, content.to_string()),
    }
}

/// Strips a markdown code fence wrapped around a JSON payload.
pub fn clean_json(content: &str) -> &str {
    let mut json = content.trim();
    if let Some(rest) = json.strip_prefix("```json") {
        json = rest;
    } else if let Some(rest) = json.strip_prefix("```") {
        json = rest;
    }
    if let Some(rest) = json.strip_suffix("```") {
        json = rest;
    }
    json.trim()
}

/// Structural check before decoding: an object with `restaurantName` and a
/// non-empty `items` array whose first entry has category, name and price.
pub fn validate_menu_value(value: &serde_json::Value) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidMenu("response is not a JSON object".to_string()))?;

    if !object.contains_key("restaurantName") {
        return Err(Error::InvalidMenu("missing 'restaurantName' field".to_string()));
    }

    let items = object
        .get("items")
        .and_then(|items| items.as_array())
        .ok_or_else(|| Error::InvalidMenu("missing or invalid 'items' field".to_string()))?;

    let first = items
        .first()
        .ok_or_else(|| Error::InvalidMenu("no menu items".to_string()))?;

    for field in ["category", "name", "price"] {
        if first.get(field).is_none() {
            return Err(Error::InvalidMenu(format!(
                "menu item missing required field '{}'",
                field
            )));
        }
    }

    Ok(())
}

/// Cleans, validates and decodes raw model output into a [`Menu`]. Only the
/// first item is checked strictly; later items take field defaults.
pub fn parse_menu_response(content: &str) -> Result<Menu> {
    let (reasoning, answer) = extract_reasoning(content);
    if let Some(reasoning) = reasoning {
        debug!(
            "Model reasoning (first 150 chars): {}",
            reasoning.chars().take(150).collect::<String>()
        );
    }

    let cleaned = clean_json(&answer);
    if cleaned.is_empty() {
        return Err(Error::InvalidMenu("empty response".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| Error::InvalidMenu(format!("invalid JSON: {}", e)))?;
    validate_menu_value(&value)?;

    serde_json::from_value(value).map_err(|e| Error::InvalidMenu(format!("bad menu shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockChatClient;
    use pretty_assertions::assert_eq;

    const VALID_MENU: &str = r#"{"restaurantName": "Bun Voyage", "items": [
        {"category": "Burgers", "name": "Classic", "price": 11, "description": "Cheddar, pickles"},
        {"category": "Sides", "name": "Onion Rings", "price": 5}
    ]}"#;

    fn generator(chat: MockChatClient) -> MenuGenerator {
        MenuGenerator::new(Arc::new(chat)).with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_extract_reasoning_splits_think_block() {
        let (reasoning, answer) =
            extract_reasoning("<think>\nburgers are popular\n</think>\n\n{\"a\": 1}");
        assert_eq!(reasoning.as_deref(), Some("burgers are popular"));
        assert_eq!(answer, "{\"a\": 1}");
    }

    #[test]
    fn test_extract_reasoning_without_block_returns_content() {
        let (reasoning, answer) = extract_reasoning("{\"a\": 1}");
        assert!(reasoning.is_none());
        assert_eq!(answer, "{\"a\": 1}");
    }

    #[test]
    fn test_clean_json_strips_fences() {
        assert_eq!(clean_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(clean_json("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(clean_json("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_menu_response_handles_reasoning_and_fences() {
        let content = format!("<think>plan the menu</think>```json\n{}\n```", VALID_MENU);
        let menu = parse_menu_response(&content).unwrap();

        assert_eq!(menu.restaurant_name, "Bun Voyage");
        assert_eq!(menu.items.len(), 2);
        assert_eq!(menu.items[1].description, "");
    }

    #[test]
    fn test_later_items_decode_with_defaults() {
        let content = r#"{"restaurantName": "Bun Voyage", "items": [
            {"category": "Burgers", "name": "Classic", "price": 11},
            {"category": "Specials", "name": "Chef's Pick", "price": "market"},
            {"name": "Shake"}
        ]}"#;
        let menu = parse_menu_response(content).unwrap();

        assert_eq!(menu.items.len(), 3);
        assert_eq!(menu.items[1].price, 0.0);
        assert_eq!(menu.items[2].price, 0.0);
        assert_eq!(menu.items[2].category, "Items");
        assert_eq!(menu.items[2].description, "");
    }

    #[tokio::test]
    async fn test_generate_menu_keeps_menu_with_unpriced_item() {
        let chat = MockChatClient::new().with_response(
            r#"{"restaurantName": "Bun Voyage", "items": [
                {"category": "Burgers", "name": "Classic", "price": 11},
                {"category": "Burgers", "name": "Mystery Burger", "description": "Ask your server"}
            ]}"#
            .to_string(),
        );
        let menu = generator(chat).generate_menu("a burger joint").await;

        assert_eq!(menu.restaurant_name, "Bun Voyage");
        assert_eq!(menu.items[1].name, "Mystery Burger");
        assert_eq!(menu.items[1].price, 0.0);
    }

    #[test]
    fn test_validation_rejects_incomplete_menus() {
        let cases = [
            "",
            "not json at all",
            "[1, 2, 3]",
            r#"{"items": [{"category": "A", "name": "B", "price": 1}]}"#,
            r#"{"restaurantName": "X"}"#,
            r#"{"restaurantName": "X", "items": []}"#,
            r#"{"restaurantName": "X", "items": [{"name": "B", "price": 1}]}"#,
            r#"{"restaurantName": "X", "items": [{"category": "A", "name": "B"}]}"#,
        ];

        for case in cases {
            let result = parse_menu_response(case);
            assert!(
                matches!(result, Err(Error::InvalidMenu(_))),
                "expected InvalidMenu for {:?}",
                case
            );
        }
    }

    #[tokio::test]
    async fn test_generate_menu_returns_parsed_menu() {
        let chat = MockChatClient::new().with_response(VALID_MENU.to_string());
        let menu = generator(chat).generate_menu("a burger joint").await;

        assert_eq!(menu.restaurant_name, "Bun Voyage");
    }

    #[tokio::test]
    async fn test_generate_menu_falls_back_when_client_always_fails() {
        let chat = MockChatClient::new().with_failure("connection reset");
        let spy = chat.clone();

        let menu = generator(chat).generate_menu("a burger joint").await;

        assert_eq!(menu, Menu::fallback());
        assert_eq!(menu.items.len(), 3);
        assert_eq!(spy.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_response_falls_back_without_retry() {
        let chat = MockChatClient::new().with_response("Sorry, I can't help.".to_string());
        let spy = chat.clone();

        let menu = generator(chat).generate_menu("a burger joint").await;

        assert_eq!(menu, Menu::fallback());
        assert_eq!(spy.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_until_success() {
        let chat = MockChatClient::new()
            .with_rate_limit()
            .with_rate_limit()
            .with_response(VALID_MENU.to_string());
        let spy = chat.clone();

        let menu = generator(chat).generate_menu("a burger joint").await;

        assert_eq!(menu.restaurant_name, "Bun Voyage");
        assert_eq!(spy.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_three_attempts() {
        let chat = MockChatClient::new().with_rate_limit();
        let spy = chat.clone();

        let menu = generator(chat).generate_menu("a burger joint").await;

        assert_eq!(menu, Menu::fallback());
        assert_eq!(spy.get_call_count(), DEFAULT_MAX_ATTEMPTS as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backoff_is_linear() {
        let chat = MockChatClient::new().with_rate_limit();
        let generator = MenuGenerator::new(Arc::new(chat)).with_retry_delay(Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        generator.generate_menu("a burger joint").await;

        // 2s after the first attempt, 4s after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6), "waited {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "waited {:?}", elapsed);
    }
}
