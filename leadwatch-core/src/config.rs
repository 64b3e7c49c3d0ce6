use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ClearancePolicy, Result, RetrievalError};

pub const DEFAULT_RETRIEVAL_PATH: &str = "/leader";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Path of the leader record
    pub retrieval_path: String,
    pub clearance_policy: ClearancePolicy,
    /// Overrides `clearance_policy` with `OnLostConnection` when set
    pub tolerate_suspended_connections: bool,
    /// How long the factory waits for a connected session
    pub connection_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retrieval_path: DEFAULT_RETRIEVAL_PATH.to_string(),
            clearance_policy: ClearancePolicy::OnSuspendedConnection,
            tolerate_suspended_connections: false,
            connection_timeout_ms: 15_000,
        }
    }
}

impl RetrievalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_retrieval_path(mut self, path: impl Into<String>) -> Self {
        self.retrieval_path = path.into();
        self
    }

    pub fn with_clearance_policy(mut self, policy: ClearancePolicy) -> Self {
        self.clearance_policy = policy;
        self
    }

    pub fn with_tolerate_suspended_connections(mut self, tolerate: bool) -> Self {
        self.tolerate_suspended_connections = tolerate;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn effective_policy(&self) -> ClearancePolicy {
        if self.tolerate_suspended_connections {
            ClearancePolicy::from_tolerate_suspended_connections(true)
        } else {
            self.clearance_policy
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_path(&self.retrieval_path)?;
        if self.connection_timeout_ms == 0 {
            return Err(RetrievalError::config("connection timeout must be positive"));
        }
        Ok(())
    }
}

/// Check that `path` is an absolute coordination path such as `/a/b`.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(RetrievalError::config(format!(
            "path '{}' must start with '/'",
            path
        )));
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(RetrievalError::config(format!(
            "path '{}' must not end with '/'",
            path
        )));
    }
    if path[1..].split('/').any(str::is_empty) {
        return Err(RetrievalError::config(format!(
            "path '{}' contains an empty segment",
            path
        )));
    }
    Ok(())
}
