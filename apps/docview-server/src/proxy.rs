//! Authenticated reverse proxy to the document service
//!
//! Everything the viewer asks for under the proxy base path is forwarded to
//! the backend with the server-held credential attached. Bodies are streamed
//! in both directions; nothing is buffered. Dropping the response (client
//! disconnect) drops the upstream response and releases its connection.

use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{OriginalUri, Request},
    http::{header, HeaderMap, HeaderName, HeaderValue, Uri},
    response::{IntoResponse, Response},
};
use futures::{stream, Stream, StreamExt};
use tokio::sync::oneshot;

use crate::backend::BackendError;
use crate::config::Config;
use crate::error::AppError;

/// Forced on every proxied response so proxied content cannot run injected script
pub const CONTENT_SECURITY_POLICY: &str = "script-src 'self'";

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Clone)]
pub struct AuthenticatedProxy {
    client: reqwest::Client,
    target_base_url: String,
    base_path: String,
    credential_header: HeaderName,
    credential: Option<HeaderValue>,
    response_timeout: Duration,
}

impl AuthenticatedProxy {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let response_timeout = Duration::from_secs(config.backend.timeout_secs);

        // Transparent: redirects go back to the caller untouched
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(response_timeout)
            .build()?;

        let credential_header = HeaderName::from_bytes(config.backend.api_key_header.as_bytes())
            .map_err(|e| BackendError::Config(e.to_string()))?;

        let credential = config
            .backend
            .api_key
            .as_ref()
            .map(|key| {
                HeaderValue::from_str(key.expose()).map(|mut value| {
                    value.set_sensitive(true);
                    value
                })
            })
            .transpose()
            .map_err(|_| BackendError::Config("API key is not a valid header value".to_string()))?;

        Ok(Self {
            client,
            target_base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            base_path: config.proxy.base_path.clone(),
            credential_header,
            credential,
            response_timeout,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Map a client-visible URI to the backend URL, or `None` when the
    /// URI is not under the proxy base path.
    pub fn target_url(&self, uri: &Uri) -> Option<String> {
        let rest = uri.path().strip_prefix(self.base_path.as_str())?;
        if !(rest.is_empty() || rest.starts_with('/')) {
            return None;
        }

        let mut target = format!("{}{}", self.target_base_url, rest);
        if let Some(query) = uri.query() {
            target.push('?');
            target.push_str(query);
        }
        Some(target)
    }

    /// Forward one request to the backend and stream the answer back.
    pub async fn forward(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();

        // Nested routers rewrite the URI; the client-visible one is kept aside
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or(parts.uri);

        let Some(target) = self.target_url(&uri) else {
            return AppError::NotFound(format!("{} is not under {}", uri.path(), self.base_path))
                .into_response();
        };

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        // Callers never get to supply the credential themselves
        headers.remove(&self.credential_header);
        if let Some(credential) = &self.credential {
            headers.insert(self.credential_header.clone(), credential.clone());
        }

        let mut upstream = self
            .client
            .request(parts.method.clone(), &target)
            .headers(headers);
        let body_sent = if body.size_hint().exact() != Some(0) {
            let (stream, sent) = signal_on_end(body);
            upstream = upstream.body(reqwest::Body::wrap_stream(stream));
            Some(sent)
        } else {
            None
        };

        tracing::debug!(method = %parts.method, target = %target, "Proxying request");

        // The response timer starts once the request body is out
        let headers_deadline = async {
            if let Some(sent) = body_sent {
                let _ = sent.await;
            }
            tokio::time::sleep(self.response_timeout).await;
        };

        let response = tokio::select! {
            result = upstream.send() => match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(method = %parts.method, target = %target, error = %e, "Proxy request failed");
                    return AppError::Backend(e.into()).into_response();
                }
            },
            _ = headers_deadline => {
                tracing::warn!(method = %parts.method, target = %target, "Proxy request timed out");
                return AppError::Backend(BackendError::Timeout(format!(
                    "no response within {:?}",
                    self.response_timeout
                )))
                .into_response();
            }
        };

        tracing::debug!(
            method = %parts.method,
            target = %target,
            status = %response.status(),
            "Proxy response"
        );

        self.relay(response)
    }

    fn relay(&self, upstream: reqwest::Response) -> Response {
        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(&self.credential_header);
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        );

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

/// Stream `body` and resolve the receiver once it has been read to the end
/// or dropped by the client library.
fn signal_on_end(
    body: Body,
) -> (
    impl Stream<Item = Result<Bytes, axum::Error>> + Send + 'static,
    oneshot::Receiver<()>,
) {
    let (tx, rx) = oneshot::channel::<()>();
    let release = stream::once(async move {
        drop(tx);
        None::<Result<Bytes, axum::Error>>
    })
    .filter_map(|item| async move { item });

    (body.into_data_stream().chain(release), rx)
}

/// Remove hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
