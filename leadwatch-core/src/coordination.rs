use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{Result, SessionState, SubscriptionId, WatchId};

/// Kind of change observed on a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Created,
    DataChanged,
    Deleted,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEventKind::Created => write!(f, "CREATED"),
            WatchEventKind::DataChanged => write!(f, "DATA_CHANGED"),
            WatchEventKind::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A fired one-shot watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchEventKind,
}

/// Callback for a one-shot watch. Invoked at most once, on a client thread.
pub type NodeWatcher = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// Callback for connection-state changes. Invoked on a client thread, in the
/// order the client observed the changes.
pub type SessionListener = Arc<dyn Fn(SessionState) + Send + Sync>;

/// The subset of a ZooKeeper-class client that leader retrieval relies on.
///
/// Implementations own connection management, retries and session renewal.
/// Watches are one-shot: a watch fires once for the next create, data change
/// or delete of its path and is then gone. A session change (reconnect after
/// suspension, or a new session after loss) may invalidate all watches.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Data stored at `path`, or `None` if the node does not exist.
    async fn get_data(&self, path: &str) -> Result<Option<Bytes>>;

    async fn set_data(&self, path: &str, data: Bytes) -> Result<()>;

    /// Create `path` with `data`, creating missing parents with empty data.
    async fn create_with_parents(&self, path: &str, data: Bytes) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Register a one-shot watch for create, data change and delete of `path`.
    /// The path does not need to exist.
    async fn watch(&self, path: &str, watcher: NodeWatcher) -> Result<WatchId>;

    /// Remove a watch that has not fired yet. Removing an unknown or already
    /// fired watch is not an error.
    async fn remove_watch(&self, id: WatchId) -> Result<()>;

    async fn subscribe_connection_state(&self, listener: SessionListener)
        -> Result<SubscriptionId>;

    async fn unsubscribe_connection_state(&self, id: SubscriptionId) -> Result<()>;

    /// Wait until the session is connected, failing with a timeout error after
    /// `timeout`.
    async fn block_until_connected(&self, timeout: Duration) -> Result<()>;

    fn session_state(&self) -> SessionState;
}
