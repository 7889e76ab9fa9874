//! Viewing Client
//!
//! Asks the application server to begin viewing a document.

use super::types::ViewerError;
use crate::session::BeginViewingResponse;

pub struct ViewingClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViewingClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `POST /beginViewing?document={name}`, returning the viewing session id
    pub async fn begin_viewing(&self, document: &str) -> Result<String, ViewerError> {
        let response = self
            .client
            .post(format!("{}/beginViewing", self.base_url))
            .query(&[("document", document)])
            .send()
            .await
            .map_err(|e| ViewerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::BeginViewing {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body: BeginViewingResponse = response
            .json()
            .await
            .map_err(|e| ViewerError::Request(format!("invalid response body: {}", e)))?;

        Ok(body.viewing_session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_viewing_error_message() {
        let err = ViewerError::BeginViewing {
            status: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The request to the application server to create a new viewing session responded with: \"404 Not Found\""
        );
    }
}
