//! Variant generation sessions
//!
//! One request produces a menu, renders the first style synchronously and
//! leaves the remaining styles to a background task that writes into the
//! [`SessionStore`]. Pollers read the store; they never wait on the task.

use crate::ai::ImageGenerationService;
use crate::menu::MenuGenerator;
use crate::models::{Menu, Session, Variant, VARIANT_STYLES};
use crate::store::SessionStore;
use crate::workflow::{attach_food_images, MenuRender};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// Result of starting a session. `handle` completes once the background
/// variants have been written; dropping it detaches the task.
pub struct VariantRun {
    pub session_id: Uuid,
    pub variant1: Variant,
    pub handle: JoinHandle<()>,
}

pub struct VariantOrchestrator {
    menus: Arc<MenuGenerator>,
    images: Arc<dyn ImageGenerationService>,
    store: SessionStore,
}

impl VariantOrchestrator {
    pub fn new(
        menus: Arc<MenuGenerator>,
        images: Arc<dyn ImageGenerationService>,
        store: SessionStore,
    ) -> Self {
        Self {
            menus,
            images,
            store,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn start(&self, user_prompt: &str) -> VariantRun {
        info!("Starting variant generation for: {}", user_prompt);

        let mut menu = self.menus.generate_menu(user_prompt).await;
        attach_food_images(self.images.as_ref(), &mut menu.items).await;
        let menu = Arc::new(menu);

        let session = Session::new(user_prompt, Arc::clone(&menu));
        let session_id = session.session_id;
        self.store.insert(session).await;
        info!("Created session {}", session_id);

        let variant1 = render_isolated(
            Arc::clone(&self.images),
            Arc::clone(&menu),
            session_id,
            1,
            VARIANT_STYLES[0],
        )
        .await;
        self.store
            .update_variant(&session_id, variant1.clone())
            .await;

        for (id, style) in background_styles() {
            self.store
                .update_variant(&session_id, Variant::generating(id, style))
                .await;
        }

        let handle = tokio::spawn(render_background_variants(
            Arc::clone(&self.images),
            menu,
            self.store.clone(),
            session_id,
        ));

        VariantRun {
            session_id,
            variant1,
            handle,
        }
    }

    /// Current state of a session, without waiting on pending renders.
    pub async fn check_status(&self, session_id: &Uuid) -> Result<Session> {
        self.store
            .get(session_id)
            .await
            .ok_or(Error::SessionNotFound(*session_id))
    }
}

fn background_styles() -> impl Iterator<Item = (u8, &'static str)> {
    VARIANT_STYLES
        .into_iter()
        .enumerate()
        .skip(1)
        .map(|(index, style)| (index as u8 + 1, style))
}

/// Renders one styled variant; failures become an `error` variant.
pub async fn render_variant(
    images: &dyn ImageGenerationService,
    menu: &Menu,
    id: u8,
    style: &str,
) -> Variant {
    info!("Rendering variant {} ({})", id, style);
    let render = MenuRender::plan(&menu.restaurant_name, &menu.items, style);

    match render.execute(images).await {
        Ok(image_url) => {
            info!("Variant {} ({}) ready: {}", id, style, image_url);
            Variant::ready(id, style, image_url, render.prompt)
        }
        Err(e) => {
            error!("Variant {} ({}) failed: {}", id, style, e);
            Variant::failed(id, style, Some(render.prompt), e.to_string())
        }
    }
}

/// Runs one render in its own task so a panic only marks that variant as
/// failed.
async fn render_isolated(
    images: Arc<dyn ImageGenerationService>,
    menu: Arc<Menu>,
    session_id: Uuid,
    id: u8,
    style: &'static str,
) -> Variant {
    let render =
        tokio::spawn(async move { render_variant(images.as_ref(), &menu, id, style).await });

    match render.await {
        Ok(variant) => variant,
        Err(e) => {
            error!(
                "Variant {} ({}) task aborted in session {}: {}",
                id, style, session_id, e
            );
            Variant::failed(id, style, None, format!("render task failed: {}", e))
        }
    }
}

/// Renders the remaining styles one after another.
async fn render_background_variants(
    images: Arc<dyn ImageGenerationService>,
    menu: Arc<Menu>,
    store: SessionStore,
    session_id: Uuid,
) {
    for (id, style) in background_styles() {
        let variant =
            render_isolated(Arc::clone(&images), Arc::clone(&menu), session_id, id, style).await;
        store.update_variant(&session_id, variant).await;
    }

    info!("Background variants finished for session {}", session_id);
}
