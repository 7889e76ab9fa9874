//! Router assembly

use axum::{http::Uri, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::routes;
use crate::state::AppState;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let proxy_base_path = state.proxy().base_path().to_string();
    let static_dir = state.config().server.static_dir.clone();

    // CORS stays off the proxy so preflights reach the backend untouched
    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1/health", routes::health::router())
        .merge(routes::viewing::router())
        .layer(cors)
        .nest_service(&proxy_base_path, routes::proxy::service(state.clone()));

    let router = match static_dir {
        Some(dir) => {
            tracing::info!("Serving static assets from {}", dir.display());
            router.fallback_service(ServeDir::new(dir))
        }
        None => router.fallback(not_found),
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
