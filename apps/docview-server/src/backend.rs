//! Document service client
//!
//! The backend owns every viewing session. This module only knows how to ask
//! it for a new session and how to hand it the source bytes afterwards.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;
use crate::documents::{DocumentError, SourceDocument};

/// Header carrying the session secret on orchestrator calls
pub const SECRET_KEY_HEADER: &str = "Accusoft-Secret";

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status
    #[error("Backend responded with {status}")]
    Rejected {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    #[error("Backend request timed out: {0}")]
    Timeout(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected backend response: {0}")]
    InvalidResponse(String),

    #[error("Failed to read source document: {0}")]
    Source(#[from] DocumentError),

    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout(e.to_string())
        } else {
            BackendError::Unreachable(e.to_string())
        }
    }
}

/// Document service operations used by the orchestrator
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Allocate a viewing session whose source will be uploaded later.
    /// Returns the backend-issued viewing session id.
    async fn create_viewing_session(&self, display_name: &str) -> Result<String, BackendError>;

    /// Stream the source document into an existing session.
    async fn upload_source(
        &self,
        viewing_session_id: &str,
        document: &SourceDocument,
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    source: SessionSource<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    viewing_session_id: String,
}

/// HTTP client for the application services API
#[derive(Clone)]
pub struct PasClient {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
    request_timeout: Duration,
}

impl PasClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let request_timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;

        let mut auth_headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            auth_headers.insert(
                header_name(&config.api_key_header)?,
                header_value(api_key.expose())?,
            );
        }
        if let Some(secret) = &config.secret_key {
            auth_headers.insert(
                header_name(SECRET_KEY_HEADER)?,
                header_value(secret.expose())?,
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_headers,
            request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl DocumentService for PasClient {
    async fn create_viewing_session(&self, display_name: &str) -> Result<String, BackendError> {
        let request = CreateSessionRequest {
            source: SessionSource {
                kind: "upload",
                display_name,
            },
        };

        let response = self
            .client
            .post(self.url("/ViewingSession"))
            .headers(self.auth_headers.clone())
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        let response = check_response(response).await?;
        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("viewing session body: {}", e)))?;

        Ok(created.viewing_session_id)
    }

    async fn upload_source(
        &self,
        viewing_session_id: &str,
        document: &SourceDocument,
    ) -> Result<(), BackendError> {
        let stream = document.open_stream().await?;
        let path = format!(
            "/ViewingSession/u{}/SourceFile",
            urlencoding::encode(viewing_session_id)
        );

        let response = self
            .client
            .put(self.url(&path))
            .headers(self.auth_headers.clone())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, document.size)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`BackendError::Rejected`], keeping
/// status, content type and body exactly as the backend sent them.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(status = %status, error = %e, "Failed to read backend rejection body");
            Bytes::new()
        }
    };

    Err(BackendError::Rejected {
        status,
        content_type,
        body,
    })
}

fn header_name(name: &str) -> Result<HeaderName, BackendError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| BackendError::Config(format!("header name {:?}: {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue, BackendError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| BackendError::Config("credential is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}
