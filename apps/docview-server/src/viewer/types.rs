//! Viewer Types
//!
//! Resources, construction options, events and errors shared by the
//! bootstrap and bridge.

use serde::{Deserialize, Serialize};

/// Where the viewer's static assets are served from
pub const DEFAULT_ASSETS_BASE: &str = "/viewer-assets";

/// Kind of static resource the viewer depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Stylesheet,
}

/// One static dependency of the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerResource {
    pub kind: ResourceKind,
    pub url: String,
}

impl ViewerResource {
    pub fn script(url: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Script,
            url: url.into(),
        }
    }

    pub fn stylesheet(url: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Stylesheet,
            url: url.into(),
        }
    }
}

/// Load plan: an unordered set, then a strictly ordered tail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerPrerequisites {
    pub parallel: Vec<ViewerResource>,
    pub ordered: Vec<ViewerResource>,
}

impl ViewerPrerequisites {
    /// The stock asset set shipped with the viewer
    pub fn standard(assets_base: &str) -> Self {
        let base = assets_base.trim_end_matches('/');
        Self {
            parallel: vec![
                ViewerResource::script(format!("{}/js/viewercontrol.js", base)),
                ViewerResource::script(format!("{}/js/viewerCustomizations.js", base)),
                ViewerResource::script(format!("{}/js/jquery-3.4.1.min.js", base)),
                ViewerResource::script(format!("{}/js/underscore.min.js", base)),
                ViewerResource::stylesheet(format!("{}/css/viewer.css", base)),
                ViewerResource::stylesheet(format!("{}/css/normalize.min.css", base)),
            ],
            // jquery.hotkeys needs jQuery; viewer.js needs everything
            ordered: vec![
                ViewerResource::script(format!("{}/js/jquery.hotkeys.min.js", base)),
                ViewerResource::script(format!("{}/js/viewer.js", base)),
            ],
        }
    }
}

/// Notifications emitted by the presentation control
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    ViewerReady,
    PageChanged { page_number: u32 },
}

/// Observable lifecycle of a viewer bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerStatus {
    /// Waiting for prerequisites and/or a session id
    Loading,
    PrerequisitesFailed(String),
    SessionFailed(String),
    ConstructionFailed(String),
    /// Control built, waiting for its ready event
    Constructed,
    Ready,
}

impl ViewerStatus {
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            ViewerStatus::PrerequisitesFailed(_)
                | ViewerStatus::SessionFailed(_)
                | ViewerStatus::ConstructionFailed(_)
        )
    }
}

// ============================================================================
// Construction Options
// ============================================================================

/// Options handed to the presentation control at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerOptions {
    /// Viewing session id
    #[serde(rename = "documentID")]
    pub document_id: String,
    /// Base path for document content requests (the proxy base path)
    pub image_handler_url: String,
    pub viewer_assets_path: String,
    pub resource_path: String,
    pub annotations_mode: AnnotationsMode,
    pub redaction_reasons: RedactionReasons,
    pub ui_elements: UiElements,
    pub immediate_action_menu_mode: String,
    pub attachment_viewing_mode: String,
}

impl ViewerOptions {
    /// Options for a proxy base path and asset base; the document id is
    /// filled in once a session exists.
    pub fn new(image_handler_url: impl Into<String>, viewer_assets_path: impl Into<String>) -> Self {
        let viewer_assets_path = viewer_assets_path.into();
        Self {
            document_id: String::new(),
            image_handler_url: image_handler_url.into(),
            resource_path: format!("{}/viewer-assets", viewer_assets_path.trim_end_matches('/')),
            viewer_assets_path,
            annotations_mode: AnnotationsMode::LayeredAnnotations,
            redaction_reasons: RedactionReasons::default(),
            ui_elements: UiElements::default(),
            immediate_action_menu_mode: "hover".to_string(),
            attachment_viewing_mode: "ThisViewer".to_string(),
        }
    }

    pub fn for_session(&self, viewing_session_id: &str) -> Self {
        Self {
            document_id: viewing_session_id.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationsMode {
    /// JSON-persisted annotation layers
    LayeredAnnotations,
    /// XML markup
    LegacyAnnotations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionReasons {
    pub enable_redaction_reason_selection: bool,
    pub enable_freeform_redaction_reasons: bool,
    pub enable_multiple_redaction_reasons: bool,
    pub reasons: Vec<RedactionReason>,
}

impl Default for RedactionReasons {
    fn default() -> Self {
        Self {
            enable_redaction_reason_selection: true,
            enable_freeform_redaction_reasons: true,
            enable_multiple_redaction_reasons: true,
            reasons: vec![
                RedactionReason::new("1.a", Some("Client Privilege")),
                RedactionReason::new("1.b", Some("Privacy Information")),
                RedactionReason::new("1.c", None),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionReason {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RedactionReason {
    pub fn new(reason: &str, description: Option<&str>) -> Self {
        Self {
            reason: reason.to_string(),
            description: description.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiElements {
    pub attachments: bool,
    pub advanced_search: bool,
}

impl Default for UiElements {
    fn default() -> Self {
        Self {
            attachments: true,
            advanced_search: true,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ViewerError {
    #[error("Failed to load {resource}: {reason}")]
    ResourceLoad { resource: String, reason: String },

    #[error("Viewer prerequisites failed: {0}")]
    PrerequisitesFailed(String),

    #[error("The request to the application server to create a new viewing session responded with: \"{status} {reason}\"")]
    BeginViewing { status: u16, reason: String },

    #[error("Viewing session request failed: {0}")]
    Request(String),

    #[error("Viewer construction failed: {0}")]
    Construction(String),

    #[error("Viewer control already handed out")]
    AlreadyTaken,

    #[error("Viewer never became ready: {0}")]
    NotReady(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_prerequisites() {
        let plan = ViewerPrerequisites::standard("/viewer-assets/");
        assert_eq!(plan.parallel.len(), 6);
        assert_eq!(
            plan.ordered,
            vec![
                ViewerResource::script("/viewer-assets/js/jquery.hotkeys.min.js"),
                ViewerResource::script("/viewer-assets/js/viewer.js"),
            ]
        );
        assert_eq!(
            plan.parallel
                .iter()
                .filter(|r| r.kind == ResourceKind::Stylesheet)
                .count(),
            2
        );
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let options = ViewerOptions::new("/pas-proxy", DEFAULT_ASSETS_BASE).for_session("abc123");
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["documentID"], "abc123");
        assert_eq!(json["imageHandlerUrl"], "/pas-proxy");
        assert_eq!(json["resourcePath"], "/viewer-assets/viewer-assets");
        assert_eq!(json["annotationsMode"], "LayeredAnnotations");
        assert_eq!(json["redactionReasons"]["reasons"][2], serde_json::json!({"reason": "1.c"}));
        assert_eq!(json["uiElements"]["advancedSearch"], true);
        assert_eq!(json["attachmentViewingMode"], "ThisViewer");
    }
}
