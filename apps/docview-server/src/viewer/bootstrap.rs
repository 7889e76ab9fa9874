//! Viewer Bootstrap
//!
//! Loads the viewer's static dependencies: the parallel set first, then the
//! ordered tail one resource at a time. Any failure ends the bootstrap.

use async_trait::async_trait;
use futures::future::try_join_all;

use super::types::{ViewerError, ViewerPrerequisites, ViewerResource};

/// Loads a single viewer resource
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn load(&self, resource: &ViewerResource) -> Result<(), ViewerError>;
}

/// Load every prerequisite in `plan`.
///
/// Errors are reported as [`ViewerError::PrerequisitesFailed`].
pub async fn load_prerequisites<L>(loader: &L, plan: &ViewerPrerequisites) -> Result<(), ViewerError>
where
    L: ResourceLoader + ?Sized,
{
    let result = async {
        try_join_all(plan.parallel.iter().map(|resource| loader.load(resource))).await?;

        for resource in &plan.ordered {
            loader.load(resource).await?;
        }
        Ok::<_, ViewerError>(())
    }
    .await;

    result.map_err(|e| {
        tracing::warn!(error = %e, "Viewer prerequisites failed");
        match e {
            ViewerError::PrerequisitesFailed(_) => e,
            other => ViewerError::PrerequisitesFailed(other.to_string()),
        }
    })
}

/// Checks that each resource can be fetched from the application server
pub struct HttpResourceLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResourceLoader {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ResourceLoader for HttpResourceLoader {
    async fn load(&self, resource: &ViewerResource) -> Result<(), ViewerError> {
        let url = format!("{}{}", self.base_url, resource.url);
        let failed = |reason: String| ViewerError::ResourceLoad {
            resource: resource.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        // Drain so the connection can be reused
        response.bytes().await.map_err(|e| failed(e.to_string()))?;

        tracing::debug!(resource = %resource.url, "Loaded viewer resource");
        Ok(())
    }
}
