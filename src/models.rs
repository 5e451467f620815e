//! Data models and structures
//!
//! Defines menus, variant renders, and generation sessions, plus runtime
//! configuration for the remote text and image services.

use crate::ai::{fal, nvidia};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Visual styles rendered for a session, in variant order.
pub const VARIANT_STYLES: [&str; 3] = ["elegant", "modern", "vintage"];

pub const DEFAULT_CATEGORY: &str = "Items";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Accepts `12`, `12.5`, `"12.5"` and `"$12.50"`. Anything else, including
/// an empty string or `null`, reads as 0.
fn deserialize_price<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Number(f64),
        Text(String),
        Other(de::IgnoredAny),
    }

    Ok(match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(n) => n,
        RawPrice::Text(text) => text
            .trim()
            .trim_start_matches('$')
            .trim()
            .parse()
            .unwrap_or(0.0),
        RawPrice::Other(_) => 0.0,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default = "default_category")]
    pub category: String,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MenuItem {
    pub fn new(category: &str, name: &str, price: f64, description: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            price,
            description: description.to_string(),
            image_url: None,
        }
    }

    /// True when a non-empty image URL is attached.
    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub restaurant_name: String,
    pub items: Vec<MenuItem>,
}

impl Menu {
    /// Fixed menu substituted whenever menu text generation fails.
    pub fn fallback() -> Self {
        Self {
            restaurant_name: "The Restaurant".to_string(),
            items: vec![
                MenuItem::new("Appetizers", "Soup of the Day", 6.0, "Fresh daily soup"),
                MenuItem::new(
                    "Main Course",
                    "Grilled Chicken",
                    16.0,
                    "Herb-marinated chicken breast",
                ),
                MenuItem::new("Desserts", "Cheesecake", 7.0, "Classic New York style"),
            ],
        }
    }
}

/// Image URLs of items that carry a food photo, in item order.
pub fn image_urls(items: &[MenuItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| item.has_image())
        .filter_map(|item| item.image_url.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    Pending,
    Generating,
    Ready,
    Error,
}

impl VariantStatus {
    fn rank(self) -> u8 {
        match self {
            VariantStatus::Pending => 0,
            VariantStatus::Generating => 1,
            VariantStatus::Ready | VariantStatus::Error => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, VariantStatus::Ready | VariantStatus::Error)
    }

    /// Status only ever moves forward; terminal states are final.
    pub fn can_transition_to(self, next: VariantStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// One styled rendering of a session's menu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: u8,
    pub style: String,
    pub status: VariantStatus,
    pub image_url: Option<String>,
    pub prompt: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Variant {
    pub fn pending(id: u8, style: &str) -> Self {
        Self {
            id,
            style: style.to_string(),
            status: VariantStatus::Pending,
            image_url: None,
            prompt: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn generating(id: u8, style: &str) -> Self {
        Self {
            status: VariantStatus::Generating,
            ..Self::pending(id, style)
        }
    }

    pub fn ready(id: u8, style: &str, image_url: String, prompt: String) -> Self {
        Self {
            status: VariantStatus::Ready,
            image_url: Some(image_url),
            prompt: Some(prompt),
            ..Self::pending(id, style)
        }
    }

    pub fn failed(id: u8, style: &str, prompt: Option<String>, error: String) -> Self {
        Self {
            status: VariantStatus::Error,
            prompt,
            error: Some(error),
            ..Self::pending(id, style)
        }
    }
}

/// Server-side record tying one generation request to its three variants.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub user_prompt: String,
    pub menu: Arc<Menu>,
    pub created_at: DateTime<Utc>,
    pub variants: [Variant; 3],
}

impl Session {
    /// New session with variant 1 generating and the others pending.
    pub fn new(user_prompt: &str, menu: Arc<Menu>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_prompt: user_prompt.to_string(),
            menu,
            created_at: Utc::now(),
            variants: [
                Variant::generating(1, VARIANT_STYLES[0]),
                Variant::pending(2, VARIANT_STYLES[1]),
                Variant::pending(3, VARIANT_STYLES[2]),
            ],
        }
    }

    pub fn variant(&self, id: u8) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn all_ready(&self) -> bool {
        self.variants
            .iter()
            .all(|v| v.status == VariantStatus::Ready)
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub nvidia_api_key: String,
    pub nvidia_base_url: String,
    pub menu_model: String,
    pub fal_key: String,
    pub fal_base_url: String,
    pub food_image_model: String,
    pub menu_image_model: String,
    pub menu_edit_model: String,
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| crate::Error::Config(format!("{} not set", key)))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let retry_delay_ms = match lookup("MENU_RETRY_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                crate::Error::Config(format!("MENU_RETRY_DELAY_MS is not a number: {}", raw))
            })?,
            None => 2000,
        };

        Ok(Self {
            nvidia_api_key: required("NVIDIA_API_KEY")?,
            nvidia_base_url: or_default("NVIDIA_BASE_URL", nvidia::client::DEFAULT_BASE_URL),
            menu_model: or_default("MENU_MODEL", "nvidia/llama-3.3-nemotron-super-49b-v1.5"),
            fal_key: required("FAL_KEY")?,
            fal_base_url: or_default("FAL_BASE_URL", fal::client::DEFAULT_BASE_URL),
            food_image_model: or_default("FOOD_IMAGE_MODEL", "fal-ai/beta-image-232"),
            menu_image_model: or_default(
                "MENU_IMAGE_MODEL",
                "fal-ai/alpha-image-232/text-to-image",
            ),
            menu_edit_model: or_default("MENU_EDIT_MODEL", "fal-ai/alpha-image-232/edit-image"),
            retry_delay: Duration::from_millis(retry_delay_ms),
        })
    }
}
