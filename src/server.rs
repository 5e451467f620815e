//! HTTP endpoints.

use crate::ai::{ChatService, ImageGenerationService};
use crate::menu::MenuGenerator;
use crate::models::{Menu, MenuItem, Session, Variant, VariantStatus};
use crate::prompts::DEFAULT_STYLE;
use crate::store::SessionStore;
use crate::variants::{VariantOrchestrator, VariantRun};
use crate::workflow::{attach_food_images, MenuRender};
use crate::Error;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

const DEFAULT_SURPRISE_PROMPT: &str = "a burger joint";
const DEFAULT_RESTAURANT_NAME: &str = "Restaurant";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub menus: Arc<MenuGenerator>,
    pub images: Arc<dyn ImageGenerationService>,
    pub variants: Arc<VariantOrchestrator>,
}

impl AppState {
    pub fn new(
        chat: Arc<dyn ChatService>,
        images: Arc<dyn ImageGenerationService>,
        retry_delay: Duration,
    ) -> Self {
        let menus = Arc::new(MenuGenerator::new(chat).with_retry_delay(retry_delay));
        let variants = Arc::new(VariantOrchestrator::new(
            Arc::clone(&menus),
            Arc::clone(&images),
            SessionStore::new(),
        ));

        Self {
            menus,
            images,
            variants,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::AiProvider(_) | Error::RateLimited(_) | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub items: Vec<MenuItem>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: String,
    pub prompt: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub edit_instruction: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    pub image_url: String,
}

/// A variant together with the menu it renders.
#[derive(Debug, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: Variant,
    #[serde(flatten)]
    pub menu: Arc<Menu>,
}

#[derive(Debug, Serialize)]
pub struct StatusOnly {
    pub status: VariantStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVariantsResponse {
    pub session_id: Uuid,
    pub variant1: VariantView,
    pub variant2: StatusOnly,
    pub variant3: StatusOnly,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStatusResponse {
    pub session_id: Uuid,
    pub variant1: VariantView,
    pub variant2: VariantView,
    pub variant3: VariantView,
    pub all_ready: bool,
}

impl From<Session> for VariantStatusResponse {
    fn from(session: Session) -> Self {
        let all_ready = session.all_ready();
        let [variant1, variant2, variant3] = session.variants;
        let view = |variant| VariantView {
            variant,
            menu: Arc::clone(&session.menu),
        };

        Self {
            session_id: session.session_id,
            variant1: view(variant1),
            variant2: view(variant2),
            variant3: view(variant3),
            all_ready,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/surprise", post(surprise))
        .route("/api/generate", post(generate_menu))
        .route("/api/edit", post(edit_menu))
        .route("/api/generate-variants", post(generate_variants))
        .route(
            "/api/check-variant-status/{session_id}",
            get(check_variant_status),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("menucraft listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("menucraft shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "operational",
        model: state.menus.model().to_string(),
    })
}

async fn surprise(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<Menu>, AppError> {
    let Json(request) = payload?;
    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SURPRISE_PROMPT.to_string());

    Ok(Json(state.menus.generate_menu(&prompt).await))
}

async fn generate_menu(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload?;
    let restaurant_name = request
        .restaurant_name
        .unwrap_or_else(|| DEFAULT_RESTAURANT_NAME.to_string());
    let style = request.style.unwrap_or_else(|| DEFAULT_STYLE.to_string());
    let mut items = request.items;

    attach_food_images(state.images.as_ref(), &mut items).await;

    let render = MenuRender::plan(&restaurant_name, &items, &style);
    info!(
        "Generating menu with prompt (first 200 chars): {}",
        render.prompt.chars().take(200).collect::<String>()
    );
    let image_url = render.execute(state.images.as_ref()).await?;

    Ok(Json(GenerateResponse {
        image_url,
        prompt: render.prompt,
        items,
    }))
}

async fn edit_menu(
    State(state): State<AppState>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<EditResponse>, AppError> {
    let Json(request) = payload?;
    let image_url = request
        .image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("imageUrl is required"))?;
    let instruction = request
        .edit_instruction
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("editInstruction is required"))?;

    info!("Editing menu: {}", instruction);
    let edited = state.images.edit_image(&image_url, &instruction).await?;

    Ok(Json(EditResponse { image_url: edited }))
}

async fn generate_variants(
    State(state): State<AppState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<StartVariantsResponse>, AppError> {
    let Json(request) = payload?;
    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("prompt is required"))?;

    let VariantRun {
        session_id,
        variant1,
        handle: _,
    } = state.variants.start(&prompt).await;

    let session = state.variants.check_status(&session_id).await?;

    Ok(Json(StartVariantsResponse {
        session_id,
        variant1: VariantView {
            variant: variant1,
            menu: session.menu,
        },
        variant2: StatusOnly {
            status: VariantStatus::Generating,
        },
        variant3: StatusOnly {
            status: VariantStatus::Generating,
        },
    }))
}

async fn check_variant_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<VariantStatusResponse>, AppError> {
    // Anything that is not a UUID cannot name a session.
    let session_id = Uuid::parse_str(&session_id)
        .map_err(|_| AppError::not_found(format!("Session not found: {}", session_id)))?;

    let session = state.variants.check_status(&session_id).await?;
    Ok(Json(session.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockChatClient, MockImageClient};
    use axum::body::Body;
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn test_state(chat: MockChatClient, images: MockImageClient) -> AppState {
        AppState::new(Arc::new(chat), Arc::new(images), Duration::from_millis(1))
    }

    async fn send(state: AppState, request: Request<Body>) -> Response {
        build_router(state).oneshot(request).await.unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health_reports_model() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let resp = send(state, get("/health")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "operational");
        assert_eq!(json["model"], "mock-model");
    }

    #[tokio::test]
    async fn test_surprise_returns_menu() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let resp = send(state, post_json("/api/surprise", serde_json::json!({"prompt": "bistro"}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["restaurantName"], "Mock Bistro");
        assert_eq!(json["items"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_surprise_falls_back_when_model_fails() {
        let state = test_state(
            MockChatClient::new().with_failure("down"),
            MockImageClient::new(),
        );

        let resp = send(state, post_json("/api/surprise", serde_json::json!({}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["restaurantName"], "The Restaurant");
    }

    #[tokio::test]
    async fn test_generate_attaches_images_and_composes() {
        let images = MockImageClient::new().with_base_url("https://img.test".to_string());
        let spy = images.clone();
        let state = test_state(MockChatClient::new(), images);

        let body = serde_json::json!({
            "restaurantName": "Patty Palace",
            "style": "vintage",
            "items": [
                {"category": "Mains", "name": "Smash Burger", "price": 12, "description": "Two patties"},
                {"category": "Sides", "name": "Fries", "price": 4, "imageUrl": "https://own.test/fries.png"}
            ]
        });
        let resp = send(state, post_json("/api/generate", body)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["imageUrl"], "https://img.test/composed/1.png");
        assert_eq!(json["items"][0]["imageUrl"], "https://img.test/food/1.png");
        assert_eq!(json["items"][1]["imageUrl"], "https://own.test/fries.png");
        assert!(json["prompt"].as_str().unwrap().contains("Patty Palace"));
        assert_eq!(spy.get_food_call_count(), 1);
        assert_eq!(spy.get_compose_call_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_reports_render_failure_as_bad_gateway() {
        let state = test_state(
            MockChatClient::new(),
            MockImageClient::new().with_render_failure_on(1),
        );

        let body = serde_json::json!({"items": [{"name": "Soup", "price": 5}]});
        let resp = send(state, post_json("/api/generate", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_edit_returns_new_image() {
        let images = MockImageClient::new().with_base_url("https://img.test".to_string());
        let spy = images.clone();
        let state = test_state(MockChatClient::new(), images);

        let body = serde_json::json!({
            "imageUrl": "https://img.test/menu/1.png",
            "editInstruction": "use a darker background"
        });
        let resp = send(state, post_json("/api/edit", body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["imageUrl"], "https://img.test/edited/1.png");
        assert_eq!(spy.get_edit_call_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_accepts_items_without_price() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let body = serde_json::json!({
            "restaurantName": "X",
            "items": [
                {"name": "Soup", "description": "hot"},
                {"name": "Bread", "price": ""}
            ]
        });
        let resp = send(state, post_json("/api/generate", body)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["items"][0]["price"], 0.0);
        assert_eq!(json["items"][1]["price"], 0.0);
        assert_eq!(json["items"][0]["category"], "Items");
        assert!(json["prompt"].as_str().unwrap().contains("- Soup $0 - hot"));
    }

    #[tokio::test]
    async fn test_edit_failure_is_bad_gateway() {
        let images = MockImageClient::new().with_edit_failure();
        let spy = images.clone();
        let state = test_state(MockChatClient::new(), images);

        let body = serde_json::json!({
            "imageUrl": "https://img.test/menu/1.png",
            "editInstruction": "add a border"
        });
        let resp = send(state, post_json("/api/edit", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("mock edit failed"));
        assert_eq!(spy.get_edit_call_count(), 1);
    }

    #[tokio::test]
    async fn test_edit_requires_fields() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let resp = send(
            state,
            post_json("/api/edit", serde_json::json!({"imageUrl": "https://img.test/a.png"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "editInstruction is required");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-variants")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = send(state, request).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_variants_immediate_response() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let resp = send(
            state,
            post_json("/api/generate-variants", serde_json::json!({"prompt": "a burger joint"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert!(Uuid::parse_str(json["sessionId"].as_str().unwrap()).is_ok());
        let status = json["variant1"]["status"].as_str().unwrap();
        assert!(status == "ready" || status == "error");
        assert_eq!(json["variant1"]["style"], "elegant");
        assert_eq!(json["variant1"]["restaurantName"], "Mock Bistro");
        assert_eq!(json["variant2"], serde_json::json!({"status": "generating"}));
        assert_eq!(json["variant3"], serde_json::json!({"status": "generating"}));
    }

    #[tokio::test]
    async fn test_generate_variants_requires_prompt() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let resp = send(
            state,
            post_json("/api/generate-variants", serde_json::json!({"prompt": "  "})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_status_after_background_completes() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let run = state.variants.start("a burger joint").await;
        run.handle.await.unwrap();

        let uri = format!("/api/check-variant-status/{}", run.session_id);
        let resp = send(state, get(&uri)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["sessionId"], run.session_id.to_string());
        assert_eq!(json["allReady"], true);
        for key in ["variant1", "variant2", "variant3"] {
            assert_eq!(json[key]["status"], "ready");
            assert_eq!(json[key]["restaurantName"], json["variant1"]["restaurantName"]);
            assert_eq!(json[key]["items"], json["variant1"]["items"]);
        }
        assert_eq!(json["variant3"]["style"], "vintage");
    }

    #[tokio::test]
    async fn test_check_status_with_failed_variant_is_not_all_ready() {
        let state = test_state(
            MockChatClient::new(),
            MockImageClient::new().with_render_failure_on(3),
        );

        let run = state.variants.start("a burger joint").await;
        run.handle.await.unwrap();

        let uri = format!("/api/check-variant-status/{}", run.session_id);
        let json = body_json(send(state, get(&uri)).await).await;
        assert_eq!(json["allReady"], false);
        assert_eq!(json["variant3"]["status"], "error");
        assert!(json["variant3"]["error"].is_string());
    }

    #[tokio::test]
    async fn test_check_status_unknown_session_is_not_found() {
        let state = test_state(MockChatClient::new(), MockImageClient::new());

        let uri = format!("/api/check-variant-status/{}", Uuid::new_v4());
        let resp = send(state.clone(), get(&uri)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(state, get("/api/check-variant-status/not-a-uuid")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("not-a-uuid"));
    }
}
