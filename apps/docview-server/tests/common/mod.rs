#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method},
    response::Response,
    Router,
};
use parking_lot::Mutex;
use tempfile::TempDir;

use docview_server::app::build_router;
use docview_server::config::{Config, Secret};
use docview_server::state::AppState;

pub const API_KEY: &str = "test-api-key";
pub const SECRET_KEY: &str = "test-secret";
pub const EXAMPLE_PDF: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";

/// A request as the stub backend saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Response + Send + Sync>;

#[derive(Clone)]
struct StubState {
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

/// In-process stand-in for the document service
pub struct StubBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubBackend {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Response + Send + Sync + 'static,
    {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            calls: calls.clone(),
            responder: Arc::new(responder),
        };
        let router = Router::new().fallback(record).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, calls }
    }

    /// Stub that grants session `abc123` and accepts every upload
    pub async fn document_service() -> Self {
        Self::start(|request| match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/ViewingSession") => Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(r#"{"viewingSessionId":"abc123"}"#.into())
                .unwrap(),
            _ => Response::builder().status(204).body(Default::default()).unwrap(),
        })
        .await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().clone()
    }

    /// Wait until at least `count` requests were recorded
    pub async fn wait_for_calls(&self, count: usize) -> Vec<RecordedRequest> {
        for _ in 0..500 {
            if self.calls.lock().len() >= count {
                return self.calls();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} backend calls, saw {:?}",
            count,
            self.calls().iter().map(|c| &c.path).collect::<Vec<_>>()
        );
    }
}

async fn record(State(stub): State<StubState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let recorded = RecordedRequest {
        method: parts.method,
        path: parts
            .uri
            .path_and_query()
            .map(|p| p.to_string())
            .unwrap_or_default(),
        headers: parts.headers,
        body,
    };

    if recorded.path.starts_with("/slow") {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    let response = (stub.responder)(&recorded);
    stub.calls.lock().push(recorded);
    response
}

/// Documents directory holding `example.pdf`
pub fn documents_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("example.pdf"), EXAMPLE_PDF).unwrap();
    dir
}

pub fn config(backend_url: &str, documents: &Path) -> Config {
    let mut config = Config::default();
    config.backend.base_url = backend_url.to_string();
    config.backend.api_key = Some(Secret::new(API_KEY));
    config.backend.secret_key = Some(Secret::new(SECRET_KEY));
    config.backend.timeout_secs = 1;
    config.documents.root = documents.to_path_buf();
    config
}

pub fn app(config: Config) -> Router {
    build_router(AppState::new(config).unwrap())
}

/// Serve the app on a real socket, returning its base URL
pub async fn serve(config: Config) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(config);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
