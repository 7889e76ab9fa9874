//! Viewing session orchestration
//!
//! Beginning a viewing session is one logical operation in two stages:
//!
//! 1. Resolve the document locally and ask the backend for a session. The
//!    client's response carries the backend-issued id and is gated on this
//!    stage only.
//! 2. Stream the document into the session. This starts once the response
//!    body has been handed off to the transport (or dropped), and its outcome
//!    goes to the log, never to the caller.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::backend::{BackendError, DocumentService};
use crate::documents::{DocumentStore, SourceDocument};
use crate::error::Result;

/// Per-request progress of a viewing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Received,
    SessionRequested,
    SessionGranted,
    Uploading,
    UploadComplete,
    UploadFailed,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStage::Received => "received",
            SessionStage::SessionRequested => "session_requested",
            SessionStage::SessionGranted => "session_granted",
            SessionStage::Uploading => "uploading",
            SessionStage::UploadComplete => "upload_complete",
            SessionStage::UploadFailed => "upload_failed",
        };
        f.write_str(name)
    }
}

/// A session the backend granted, paired with the document it is waiting for
#[derive(Debug, Clone)]
pub struct ViewingSession {
    pub viewing_session_id: String,
    pub document: SourceDocument,
}

/// Body returned to the client by `POST /beginViewing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginViewingResponse {
    pub viewing_session_id: String,
}

/// Terminal state of the upload stage
#[derive(Debug)]
pub enum UploadOutcome {
    Complete,
    Failed(BackendError),
}

impl UploadOutcome {
    pub fn stage(&self) -> SessionStage {
        match self {
            UploadOutcome::Complete => SessionStage::UploadComplete,
            UploadOutcome::Failed(_) => SessionStage::UploadFailed,
        }
    }
}

/// Held by the response body; dropping it releases the upload stage.
pub struct ResponseGuard {
    _tx: oneshot::Sender<()>,
}

/// Resolves once the matching [`ResponseGuard`] is gone.
pub struct ResponseSent {
    rx: oneshot::Receiver<()>,
}

impl ResponseSent {
    pub async fn wait(self) {
        // The sender is only ever dropped, so an Err here is the signal
        let _ = self.rx.await;
    }
}

/// Create a linked guard/signal pair
pub fn response_signal() -> (ResponseGuard, ResponseSent) {
    let (tx, rx) = oneshot::channel();
    (ResponseGuard { _tx: tx }, ResponseSent { rx })
}

impl ResponseGuard {
    /// Wrap a payload in a body that drops this guard after the payload has
    /// been taken by the transport, or when the body itself is dropped.
    pub fn into_body(self, payload: Bytes) -> Body {
        let data = stream::once(async move { Ok::<_, Infallible>(payload) });
        let release = stream::once(async move {
            drop(self);
            None::<std::result::Result<Bytes, Infallible>>
        })
        .filter_map(|item| async move { item });

        Body::from_stream(data.chain(release))
    }
}

/// Coordinates session creation and source upload
#[derive(Clone)]
pub struct SessionOrchestrator {
    documents: DocumentStore,
    backend: Arc<dyn DocumentService>,
}

impl SessionOrchestrator {
    pub fn new(documents: DocumentStore, backend: Arc<dyn DocumentService>) -> Self {
        Self { documents, backend }
    }

    /// Stage one: resolve the document, then allocate a backend session.
    ///
    /// A document that does not resolve fails here without any backend call.
    pub async fn create_session(&self, document_ref: &str) -> Result<ViewingSession> {
        tracing::debug!(document = %document_ref, stage = %SessionStage::Received, "Begin viewing");

        let document = self.documents.resolve(document_ref).await?;

        tracing::debug!(
            document = %document.name,
            size = document.size,
            stage = %SessionStage::SessionRequested,
            "Requesting viewing session"
        );
        let viewing_session_id = self.backend.create_viewing_session(&document.name).await?;

        tracing::info!(
            viewing_session_id = %viewing_session_id,
            document = %document.name,
            stage = %SessionStage::SessionGranted,
            "Viewing session created"
        );

        Ok(ViewingSession {
            viewing_session_id,
            document,
        })
    }

    /// Stage two: stream the source document into the session.
    pub async fn upload_source(&self, session: &ViewingSession) -> UploadOutcome {
        tracing::debug!(
            viewing_session_id = %session.viewing_session_id,
            document = %session.document.name,
            stage = %SessionStage::Uploading,
            "Uploading source document"
        );

        let outcome = match self
            .backend
            .upload_source(&session.viewing_session_id, &session.document)
            .await
        {
            Ok(()) => UploadOutcome::Complete,
            Err(e) => UploadOutcome::Failed(e),
        };

        match &outcome {
            UploadOutcome::Complete => tracing::info!(
                viewing_session_id = %session.viewing_session_id,
                document = %session.document.name,
                bytes = session.document.size,
                stage = %outcome.stage(),
                "Source document uploaded"
            ),
            UploadOutcome::Failed(BackendError::Rejected { status, body, .. }) => tracing::error!(
                viewing_session_id = %session.viewing_session_id,
                document = %session.document.name,
                status = %status,
                body = %String::from_utf8_lossy(body),
                stage = %outcome.stage(),
                "Backend rejected source upload"
            ),
            UploadOutcome::Failed(e) => tracing::error!(
                viewing_session_id = %session.viewing_session_id,
                document = %session.document.name,
                error = %e,
                stage = %outcome.stage(),
                "Source upload failed"
            ),
        }

        outcome
    }

    /// Run the upload stage in the background once `sent` resolves.
    pub fn spawn_upload(&self, session: ViewingSession, sent: ResponseSent) -> JoinHandle<UploadOutcome> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            sent.wait().await;
            orchestrator.upload_source(&session).await
        })
    }
}
