//! Application state management

use std::sync::Arc;

use crate::backend::{BackendError, DocumentService, PasClient};
use crate::config::Config;
use crate::documents::DocumentStore;
use crate::proxy::AuthenticatedProxy;
use crate::session::SessionOrchestrator;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize backend client: {0}")]
    Backend(#[from] BackendError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    orchestrator: SessionOrchestrator,
    proxy: AuthenticatedProxy,
}

impl AppState {
    /// Create application state talking to the configured backend
    pub fn new(config: Config) -> Result<Self, StateError> {
        let backend = Arc::new(PasClient::new(&config.backend)?);
        Self::with_backend(config, backend)
    }

    /// Create application state with a specific document service
    pub fn with_backend(config: Config, backend: Arc<dyn DocumentService>) -> Result<Self, StateError> {
        let documents = DocumentStore::new(config.documents.root.clone());
        let orchestrator = SessionOrchestrator::new(documents, backend);
        let proxy = AuthenticatedProxy::new(&config)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
                proxy,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session orchestrator
    pub fn orchestrator(&self) -> &SessionOrchestrator {
        &self.inner.orchestrator
    }

    /// Get the backend proxy
    pub fn proxy(&self) -> &AuthenticatedProxy {
        &self.inner.proxy
    }
}
