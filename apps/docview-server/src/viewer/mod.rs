//! Viewer Module
//!
//! Client-side lifecycle of a viewing interaction: load the viewer's static
//! prerequisites, obtain a viewing session, construct the presentation
//! control exactly once, and republish its events.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docview_server::viewer::{
//!     HttpResourceLoader, ViewerBridge, ViewerOptions, ViewerPrerequisites, ViewingClient,
//! };
//!
//! let bridge = ViewerBridge::new(factory, ViewerOptions::new("/pas-proxy", "/viewer-assets"));
//! let loader = HttpResourceLoader::new("http://localhost:8888");
//! let client = ViewingClient::new("http://localhost:8888");
//!
//! bridge
//!     .run(&loader, &ViewerPrerequisites::standard("/viewer-assets"), client.begin_viewing("example.pdf"))
//!     .await;
//!
//! let control = bridge.ready().await?;
//! control.change_to_next_page();
//! ```

mod bootstrap;
mod bridge;
mod client;
mod control;
mod types;

pub use bootstrap::{load_prerequisites, HttpResourceLoader, ResourceLoader};
pub use bridge::ViewerBridge;
pub use client::ViewingClient;
pub use control::{ViewerControl, ViewerFactory};
pub use types::{
    AnnotationsMode, RedactionReason, RedactionReasons, ResourceKind, UiElements, ViewerError,
    ViewerEvent, ViewerOptions, ViewerPrerequisites, ViewerResource, ViewerStatus,
    DEFAULT_ASSETS_BASE,
};
