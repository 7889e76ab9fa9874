//! Backend proxy route
//!
//! Mounted under the proxy base path; every method and subpath is forwarded.

use axum::{
    extract::{Request, State},
    response::Response,
    routing::{any, MethodRouter},
};

use crate::state::AppState;

/// Service forwarding every request through the authenticated proxy
pub fn service(state: AppState) -> MethodRouter {
    any(forward).with_state(state)
}

async fn forward(State(state): State<AppState>, request: Request) -> Response {
    state.proxy().forward(request).await
}
