//! Client core for the article generator service.
//!
//! [`ArticleClient`] wires the pieces together: a credential store, the
//! request gateway that injects the stored bearer token, the session
//! controller that owns login state, and the orchestrator that turns a query
//! into an article, its SEO metadata, and a rendered HTML document.

use std::sync::Arc;

pub mod config;
pub mod credential_store;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod handoff;
pub mod session;
pub mod types;

pub use config::{ClientConfig, ConfigError};
pub use credential_store::{
    CredentialStore, CredentialStoreError, FileCredentialStore, MemoryCredentialStore,
};
pub use error::ClientError;
pub use gateway::{GatewayError, RequestGateway};
pub use generation::{GenerationOrchestrator, GenerationRequest, GenerationStrategy};
pub use handoff::{AppRoute, Landing, Navigation, Screen, navigate};
pub use session::{SessionController, SessionPhase, SessionState};
pub use types::{
    Article, ArticleSection, GenerationResult, RenderedDocument, SeoMetadata, UserProfile,
};

/// One client process worth of state. Cheap to clone; clones share the
/// same session.
#[derive(Debug, Clone)]
pub struct ArticleClient {
    config: ClientConfig,
    session: SessionController,
    orchestrator: GenerationOrchestrator,
}

impl ArticleClient {
    #[must_use]
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        let gateway = RequestGateway::new(&config, store.clone());
        let session = SessionController::new(gateway.clone(), store);
        let orchestrator = GenerationOrchestrator::new(gateway, session.clone(), config.strategy);
        Self {
            config,
            session,
            orchestrator,
        }
    }

    /// Builds the client and silently restores any session left in the
    /// store by a previous run.
    pub async fn initialize(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        let client = Self::new(config, store);
        let state = client.session.restore().await;
        tracing::debug!(
            phase = state.phase.as_str(),
            base_url = %client.config.base_url,
            "client initialized"
        );
        client
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionController {
        &self.session
    }

    #[must_use]
    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    /// What the submission surface does on submit: generate, then hand the
    /// result to the display surface in a single navigation.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<Navigation, ClientError> {
        let result = self.orchestrator.generate(request).await?;
        Ok(Navigation::to_article(result))
    }
}
