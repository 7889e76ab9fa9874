//! Viewing session routes
//!
//! Endpoints:
//! - POST /beginViewing?document={name} - Create a viewing session for a document

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::session::{response_signal, BeginViewingResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BeginViewingQuery {
    pub document: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/beginViewing", post(begin_viewing))
}

/// POST /beginViewing
///
/// Responds with the new viewing session id as soon as the backend grants
/// it. The source upload starts after this response body has gone out.
async fn begin_viewing(
    State(state): State<AppState>,
    Query(query): Query<BeginViewingQuery>,
) -> Result<Response> {
    let orchestrator = state.orchestrator();
    let session = orchestrator.create_session(&query.document).await?;

    let payload = serde_json::to_vec(&BeginViewingResponse {
        viewing_session_id: session.viewing_session_id.clone(),
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let (guard, sent) = response_signal();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(guard.into_body(Bytes::from(payload)))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    orchestrator.spawn_upload(session, sent);

    Ok(response)
}
