//! In-memory coordination service.
//!
//! A single-session stand-in for a ZooKeeper-class client: hierarchical
//! nodes, one-shot watches, connection-state subscriptions, and fault
//! injection for suspension, reconnection and session loss.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use leadwatch_core::{
    codec::{LeaderRecordCodec, LengthPrefixedCodec},
    CoordinationClient, LeaderInformation, NodeWatcher, Result, RetrievalError, SessionListener,
    SessionState, SubscriptionId, WatchEvent, WatchEventKind, WatchId,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub struct CoordinatorStats {
    pub watches_registered: u64,
    pub watches_fired: u64,
    pub watches_invalidated: u64,
    pub reads: u64,
    pub session_events: u64,
}

pub struct InMemoryCoordinationService {
    nodes: DashMap<String, Bytes>,
    watches: Mutex<HashMap<WatchId, (String, NodeWatcher)>>,
    listeners: Mutex<HashMap<SubscriptionId, SessionListener>>,
    state_tx: watch::Sender<SessionState>,
    next_watch_id: AtomicU64,
    reject_subscriptions: AtomicBool,
    stats: Mutex<CoordinatorStats>,
}

impl InMemoryCoordinationService {
    /// A service whose session is already connected.
    pub fn new() -> Self {
        Self::with_state(SessionState::Connected)
    }

    /// A service that has not connected yet; see [`connect`](Self::connect).
    pub fn new_disconnected() -> Self {
        Self::with_state(SessionState::Suspended)
    }

    fn with_state(state: SessionState) -> Self {
        let (state_tx, _) = watch::channel(state);
        Self {
            nodes: DashMap::new(),
            watches: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            state_tx,
            next_watch_id: AtomicU64::new(1),
            reject_subscriptions: AtomicBool::new(false),
            stats: Mutex::new(CoordinatorStats::default()),
        }
    }

    // Fault injection

    /// Establish the initial connection.
    pub fn connect(&self) {
        self.transition(SessionState::Connected, SessionState::Connected);
    }

    /// The connection to the ensemble is interrupted; the session may still
    /// be alive.
    pub fn suspend(&self) {
        self.transition(SessionState::Suspended, SessionState::Suspended);
    }

    /// The connection is back. Watches of the interrupted connection are
    /// invalidated.
    pub fn reconnect(&self) {
        self.invalidate_watches();
        self.transition(SessionState::Connected, SessionState::Reconnected);
    }

    /// Reconnect to the same session without dropping its watches, so
    /// watches registered before the disruption can still fire.
    pub fn reconnect_keeping_watches(&self) {
        self.transition(SessionState::Connected, SessionState::Reconnected);
    }

    /// Suspend and immediately reconnect, like a restarted server.
    pub fn restart(&self) {
        self.suspend();
        self.reconnect();
    }

    /// The session expired. All watches are gone.
    pub fn expire_session(&self) {
        self.invalidate_watches();
        self.transition(SessionState::Lost, SessionState::Lost);
    }

    /// Make connection-state subscriptions and watch registrations fail.
    pub fn reject_subscriptions(&self, reject: bool) {
        self.reject_subscriptions.store(reject, Ordering::Release);
    }

    // Server-side writes, performed by another party. They succeed whatever
    // the state of this session is.

    /// Create or overwrite `path`, creating parents as needed.
    pub fn put_raw(&self, path: &str, data: impl Into<Bytes>) {
        self.create_parents(path);
        let kind = match self.nodes.insert(path.to_string(), data.into()) {
            Some(_) => WatchEventKind::DataChanged,
            None => WatchEventKind::Created,
        };
        self.fire(path, kind);
    }

    /// Delete `path` if it exists.
    pub fn remove(&self, path: &str) {
        if self.nodes.remove(path).is_some() {
            self.fire(path, WatchEventKind::Deleted);
        }
    }

    pub fn raw_data(&self, path: &str) -> Option<Bytes> {
        self.nodes.get(path).map(|entry| entry.value().clone())
    }

    pub fn active_watch_count(&self) -> usize {
        self.watches.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats.lock().clone()
    }

    fn create_parents(&self, path: &str) {
        let mut parent = String::new();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            parent.push('/');
            parent.push_str(segment);
            if !self.nodes.contains_key(&parent) {
                self.nodes.insert(parent.clone(), Bytes::new());
                self.fire(&parent, WatchEventKind::Created);
            }
        }
    }

    /// Fire the one-shot watches on `path`. While the session is down the
    /// watches stay registered until the session change invalidates them.
    fn fire(&self, path: &str, kind: WatchEventKind) {
        if !self.session_state().is_connected() {
            debug!(path, %kind, "Session down, not delivering watch event");
            return;
        }

        let fired: Vec<NodeWatcher> = {
            let mut watches = self.watches.lock();
            let ids: Vec<WatchId> = watches
                .iter()
                .filter(|(_, (watched, _))| watched == path)
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| watches.remove(id))
                .map(|(_, watcher)| watcher)
                .collect()
        };

        if fired.is_empty() {
            return;
        }
        self.stats.lock().watches_fired += fired.len() as u64;

        for watcher in fired {
            watcher(WatchEvent {
                path: path.to_string(),
                kind,
            });
        }
    }

    fn invalidate_watches(&self) {
        let invalidated = {
            let mut watches = self.watches.lock();
            let count = watches.len();
            watches.clear();
            count
        };
        self.stats.lock().watches_invalidated += invalidated as u64;
    }

    fn transition(&self, stored: SessionState, announced: SessionState) {
        self.state_tx.send_replace(stored);
        info!(state = ?announced, "Coordination session state changed");

        let listeners: Vec<SessionListener> = self.listeners.lock().values().cloned().collect();
        self.stats.lock().session_events += 1;
        for listener in listeners {
            listener(announced);
        }
    }

    fn ensure_connected(&self, operation: &str) -> Result<()> {
        let state = self.session_state();
        if state.is_connected() {
            Ok(())
        } else {
            Err(RetrievalError::not_connected(format!(
                "{} while session is {:?}",
                operation, state
            )))
        }
    }
}

impl Default for InMemoryCoordinationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationClient for InMemoryCoordinationService {
    async fn exists(&self, path: &str) -> Result<bool> {
        self.ensure_connected("exists")?;
        Ok(self.nodes.contains_key(path))
    }

    async fn get_data(&self, path: &str) -> Result<Option<Bytes>> {
        self.ensure_connected("get_data")?;
        self.stats.lock().reads += 1;
        Ok(self.raw_data(path))
    }

    async fn set_data(&self, path: &str, data: Bytes) -> Result<()> {
        self.ensure_connected("set_data")?;
        match self.nodes.get_mut(path) {
            Some(mut entry) => *entry.value_mut() = data,
            None => {
                return Err(RetrievalError::NoNode {
                    path: path.to_string(),
                })
            }
        }
        self.fire(path, WatchEventKind::DataChanged);
        Ok(())
    }

    async fn create_with_parents(&self, path: &str, data: Bytes) -> Result<()> {
        self.ensure_connected("create")?;
        if self.nodes.contains_key(path) {
            return Err(RetrievalError::NodeExists {
                path: path.to_string(),
            });
        }
        self.put_raw(path, data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.ensure_connected("delete")?;
        if !self.nodes.contains_key(path) {
            return Err(RetrievalError::NoNode {
                path: path.to_string(),
            });
        }
        self.remove(path);
        Ok(())
    }

    async fn watch(&self, path: &str, watcher: NodeWatcher) -> Result<WatchId> {
        if self.reject_subscriptions.load(Ordering::Acquire) {
            return Err(RetrievalError::coordination(format!(
                "watch on {} rejected",
                path
            )));
        }
        self.ensure_connected("watch")?;

        let id = WatchId(self.next_watch_id.fetch_add(1, Ordering::AcqRel));
        self.watches.lock().insert(id, (path.to_string(), watcher));
        self.stats.lock().watches_registered += 1;
        Ok(id)
    }

    async fn remove_watch(&self, id: WatchId) -> Result<()> {
        self.watches.lock().remove(&id);
        Ok(())
    }

    async fn subscribe_connection_state(
        &self,
        listener: SessionListener,
    ) -> Result<SubscriptionId> {
        if self.reject_subscriptions.load(Ordering::Acquire) {
            return Err(RetrievalError::coordination(
                "connection state subscription rejected",
            ));
        }
        let id = SubscriptionId::new();
        self.listeners.lock().insert(id, listener);
        Ok(id)
    }

    async fn unsubscribe_connection_state(&self, id: SubscriptionId) -> Result<()> {
        self.listeners.lock().remove(&id);
        Ok(())
    }

    async fn block_until_connected(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.state_tx.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|state| state.is_connected()))
            .await
            .map(|connected| connected.map(|_| ()));
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RetrievalError::coordination("session state channel closed")),
            Err(_) => Err(RetrievalError::timeout(format!(
                "waiting {:?} for a connected session",
                timeout
            ))),
        }
    }

    fn session_state(&self) -> SessionState {
        *self.state_tx.borrow()
    }
}

/// Write `leader` to `path` through `client`, creating the node if needed.
pub async fn publish_leader(
    client: &dyn CoordinationClient,
    path: &str,
    leader: &LeaderInformation,
) -> Result<()> {
    let data = LengthPrefixedCodec.encode(leader);
    if client.exists(path).await? {
        client.set_data(path, data).await
    } else {
        client.create_with_parents(path, data).await
    }
}
