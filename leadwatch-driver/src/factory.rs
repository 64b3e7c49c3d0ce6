use leadwatch_core::{
    CoordinationClient, FatalErrorHandler, LeaderRetrievalEventHandler, Result, RetrievalConfig,
};
use std::sync::Arc;
use tracing::debug;

use crate::LeaderRetrievalDriver;

/// Creates drivers for one client and configuration.
#[derive(Clone)]
pub struct LeaderRetrievalDriverFactory {
    client: Arc<dyn CoordinationClient>,
    config: RetrievalConfig,
}

impl LeaderRetrievalDriverFactory {
    pub fn new(client: Arc<dyn CoordinationClient>, config: RetrievalConfig) -> Self {
        Self { client, config }
    }

    /// Factory with the default configuration (`/leader`, clear on suspended
    /// connection).
    pub fn with_defaults(client: Arc<dyn CoordinationClient>) -> Self {
        Self::new(client, RetrievalConfig::default())
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Validate the configuration, wait for a connected session and start a
    /// driver on the configured path.
    pub async fn create_driver(
        &self,
        listener: Arc<dyn LeaderRetrievalEventHandler>,
        fatal_errors: Arc<dyn FatalErrorHandler>,
    ) -> Result<LeaderRetrievalDriver> {
        self.config.validate()?;

        debug!(
            timeout_ms = self.config.connection_timeout_ms,
            "Waiting for coordination session"
        );
        self.client
            .block_until_connected(self.config.connection_timeout())
            .await?;

        LeaderRetrievalDriver::start(
            self.client.clone(),
            self.config.retrieval_path.clone(),
            listener,
            self.config.effective_policy(),
            fatal_errors,
        )
        .await
    }
}
