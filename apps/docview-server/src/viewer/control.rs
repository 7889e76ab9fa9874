//! Presentation control seam
//!
//! The control itself belongs to the presentation layer. This crate only
//! ever sees it through these traits.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::types::{ViewerError, ViewerEvent, ViewerOptions};

/// Capabilities of a constructed viewer control.
///
/// `page_number` and `scale_factor` are plain reads; callers that need
/// live values should re-read them when a [`ViewerEvent::PageChanged`]
/// arrives.
pub trait ViewerControl: Send + Sync {
    fn change_to_next_page(&self);

    fn change_to_prev_page(&self);

    fn page_number(&self) -> u32;

    fn scale_factor(&self) -> f64;

    /// Subscribe to events emitted after this call
    fn subscribe(&self) -> broadcast::Receiver<ViewerEvent>;
}

/// Builds a control for a viewing session
pub trait ViewerFactory: Send + Sync {
    fn construct(&self, options: &ViewerOptions) -> Result<Arc<dyn ViewerControl>, ViewerError>;
}
