//! Backend for an AI menu designer
//!
//! Turns a short restaurant concept into structured menu content, photographs
//! each dish, and renders styled menu images. Variant sessions render one
//! style up front and the rest in the background for polling clients.

pub mod ai;
pub mod app;
pub mod error;
pub mod menu;
pub mod models;
pub mod prompts;
pub mod server;
pub mod store;
pub mod variants;
pub mod workflow;

pub use error::{Error, Result};
