use super::{ChatService, ImageGenerationService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const DEFAULT_MENU_JSON: &str = r#"{
    "restaurantName": "Mock Bistro",
    "items": [
        {"category": "Starters", "name": "Tomato Soup", "price": 7, "description": "Roasted tomatoes"},
        {"category": "Mains", "name": "Steak Frites", "price": 24, "description": "Hanger steak, fries"},
        {"category": "Desserts", "name": "Creme Brulee", "price": 9, "description": "Vanilla custard"}
    ]
}"#;

#[derive(Debug, Clone)]
enum MockReply {
    Content(String),
    RateLimited,
    Failure(String),
}

/// Scripted chat service. Replies are returned in order and cycle.
#[derive(Clone)]
pub struct MockChatClient {
    replies: Arc<Mutex<Vec<MockReply>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Content(response));
        self
    }

    pub fn with_rate_limit(self) -> Self {
        self.replies.lock().unwrap().push(MockReply::RateLimited);
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Failure(message.to_string()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(DEFAULT_MENU_JSON.to_string());
        }

        match &replies[(*count - 1) % replies.len()] {
            MockReply::Content(text) => Ok(text.clone()),
            MockReply::RateLimited => Err(Error::RateLimited("mock rate limit".to_string())),
            MockReply::Failure(message) => Err(Error::AiProvider(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Image service that hands out predictable URLs and counts each operation.
///
/// Menu renders (text-only and composed) share one 1-based call counter,
/// which `with_render_failure_on` / `with_render_panic_on` refer to.
#[derive(Clone)]
pub struct MockImageClient {
    base_url: String,
    fail_food: bool,
    fail_edit: bool,
    failing_renders: HashSet<usize>,
    panicking_renders: HashSet<usize>,
    food_calls: Arc<Mutex<usize>>,
    menu_calls: Arc<Mutex<usize>>,
    compose_calls: Arc<Mutex<usize>>,
    edit_calls: Arc<Mutex<usize>>,
    render_calls: Arc<Mutex<usize>>,
    compose_sources: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockImageClient {
    pub fn new() -> Self {
        Self {
            base_url: "https://mock-images.example.com".to_string(),
            fail_food: false,
            fail_edit: false,
            failing_renders: HashSet::new(),
            panicking_renders: HashSet::new(),
            food_calls: Arc::new(Mutex::new(0)),
            menu_calls: Arc::new(Mutex::new(0)),
            compose_calls: Arc::new(Mutex::new(0)),
            edit_calls: Arc::new(Mutex::new(0)),
            render_calls: Arc::new(Mutex::new(0)),
            compose_sources: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_food_failure(mut self) -> Self {
        self.fail_food = true;
        self
    }

    pub fn with_edit_failure(mut self) -> Self {
        self.fail_edit = true;
        self
    }

    pub fn with_render_failure_on(mut self, call: usize) -> Self {
        self.failing_renders.insert(call);
        self
    }

    pub fn with_render_panic_on(mut self, call: usize) -> Self {
        self.panicking_renders.insert(call);
        self
    }

    pub fn get_food_call_count(&self) -> usize {
        *self.food_calls.lock().unwrap()
    }

    pub fn get_menu_call_count(&self) -> usize {
        *self.menu_calls.lock().unwrap()
    }

    pub fn get_compose_call_count(&self) -> usize {
        *self.compose_calls.lock().unwrap()
    }

    pub fn get_edit_call_count(&self) -> usize {
        *self.edit_calls.lock().unwrap()
    }

    /// Source URL lists passed to each composition call, in call order.
    pub fn get_compose_sources(&self) -> Vec<Vec<String>> {
        self.compose_sources.lock().unwrap().clone()
    }

    fn bump(counter: &Mutex<usize>) -> usize {
        let mut count = counter.lock().unwrap();
        *count += 1;
        *count
    }

    fn render(&self, kind: &str) -> Result<String> {
        let call = Self::bump(&self.render_calls);

        if self.panicking_renders.contains(&call) {
            panic!("mock render {} panicked", call);
        }
        if self.failing_renders.contains(&call) {
            return Err(Error::AiProvider(format!("mock render {} failed", call)));
        }
        Ok(format!("{}/{}/{}.png", self.base_url, kind, call))
    }
}

impl Default for MockImageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageClient {
    async fn generate_food_image(&self, _prompt: &str) -> Result<String> {
        let call = Self::bump(&self.food_calls);
        if self.fail_food {
            return Err(Error::AiProvider("mock food image failed".to_string()));
        }
        Ok(format!("{}/food/{}.png", self.base_url, call))
    }

    async fn generate_menu_image(&self, _prompt: &str) -> Result<String> {
        Self::bump(&self.menu_calls);
        self.render("menu")
    }

    async fn compose_menu_image(&self, _prompt: &str, image_urls: &[String]) -> Result<String> {
        Self::bump(&self.compose_calls);
        self.compose_sources
            .lock()
            .unwrap()
            .push(image_urls.to_vec());
        self.render("composed")
    }

    async fn edit_image(&self, _image_url: &str, _instruction: &str) -> Result<String> {
        let call = Self::bump(&self.edit_calls);
        if self.fail_edit {
            return Err(Error::AiProvider("mock edit failed".to_string()));
        }
        Ok(format!("{}/edited/{}.png", self.base_url, call))
    }
}
