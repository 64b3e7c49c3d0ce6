//! The leader retrieval driver.
//!
//! Watches the leader record at one path and tells one listener who the leader
//! is, taking the health of the coordination session into account.

use leadwatch_core::{
    codec::{decode_record, LeaderRecordCodec, LengthPrefixedCodec},
    config::validate_path,
    ClearancePolicy, ConnectionState, CoordinationClient, FatalErrorHandler, LeaderInformation,
    LeaderRetrievalEventHandler, Result, RetrievalError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::connection::ConnectionStateMonitor;
use crate::event::{DriverEvent, EventReceiver, RecordTrigger};
use crate::policy::{next_action, Action, PolicyInput};
use crate::watcher::LeaderRecordWatcher;

#[derive(Debug)]
struct DriverState {
    last_notified: LeaderInformation,
    connection: ConnectionState,
    usable: bool,
}

struct DriverInner {
    client: Arc<dyn CoordinationClient>,
    path: String,
    policy: ClearancePolicy,
    codec: Arc<dyn LeaderRecordCodec>,
    listener: Arc<dyn LeaderRetrievalEventHandler>,
    fatal_errors: Arc<dyn FatalErrorHandler>,
    state: Mutex<DriverState>,
    closed: AtomicBool,
    watcher: LeaderRecordWatcher,
    monitor: Mutex<Option<ConnectionStateMonitor>>,
}

/// Retrieves the leader from the record at a single path.
///
/// All events are handled by one event loop task, so decisions and listener
/// notifications happen one at a time and in order. The listener is called
/// synchronously from that task: a blocking listener stalls the driver.
///
/// Requires a running tokio runtime. The client session must be connected
/// before the driver is started; use
/// [`LeaderRetrievalDriverFactory`](crate::LeaderRetrievalDriverFactory) to
/// have that checked.
///
/// Call [`close`](Self::close) when done. Dropping an open driver stops its
/// event loop and notifications, but the connection-state subscription and
/// the watch stay registered with the client.
///
/// # Example
///
/// ```rust,ignore
/// let listener = Arc::new(QueueLeaderListener::new(16));
/// let driver = LeaderRetrievalDriver::start(
///     client,
///     "/cluster/leader",
///     listener.clone(),
///     ClearancePolicy::OnSuspendedConnection,
///     Arc::new(LoggingFatalErrorHandler::default()),
/// )
/// .await?;
///
/// let leader = listener.next().await?;
/// driver.close().await;
/// ```
pub struct LeaderRetrievalDriver {
    inner: Arc<DriverInner>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LeaderRetrievalDriver {
    /// Start watching `path` with the length-prefixed record format.
    ///
    /// Only an invalid path is returned as an error. A failure to subscribe
    /// to connection states or to install the watch goes to `fatal_errors`
    /// and leaves the driver unusable; it must still be closed.
    pub async fn start(
        client: Arc<dyn CoordinationClient>,
        path: impl Into<String>,
        listener: Arc<dyn LeaderRetrievalEventHandler>,
        policy: ClearancePolicy,
        fatal_errors: Arc<dyn FatalErrorHandler>,
    ) -> Result<Self> {
        Self::start_with_codec(
            client,
            path,
            listener,
            policy,
            fatal_errors,
            Arc::new(LengthPrefixedCodec),
        )
        .await
    }

    pub async fn start_with_codec(
        client: Arc<dyn CoordinationClient>,
        path: impl Into<String>,
        listener: Arc<dyn LeaderRetrievalEventHandler>,
        policy: ClearancePolicy,
        fatal_errors: Arc<dyn FatalErrorHandler>,
        codec: Arc<dyn LeaderRecordCodec>,
    ) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(DriverInner {
            watcher: LeaderRecordWatcher::new(client.clone(), path.clone(), events_tx.clone()),
            client: client.clone(),
            path,
            policy,
            codec,
            listener,
            fatal_errors,
            state: Mutex::new(DriverState {
                last_notified: LeaderInformation::Empty,
                connection: ConnectionState::Connected,
                usable: true,
            }),
            closed: AtomicBool::new(false),
            monitor: Mutex::new(None),
        });

        info!(path = %inner.path, policy = %policy, "Starting leader retrieval driver");

        match ConnectionStateMonitor::start(client, events_tx.clone()).await {
            Ok(monitor) => *inner.monitor.lock() = Some(monitor),
            Err(e) => inner.fail(e),
        }

        if inner.is_usable() {
            match inner.watcher.register().await {
                Ok(generation) => {
                    let _ = events_tx.send(DriverEvent::Record {
                        generation,
                        trigger: RecordTrigger::Initial,
                    });
                }
                Err(e) => inner.fail(RetrievalError::subscription(format!(
                    "leader record watch on {}: {}",
                    inner.path, e
                ))),
            }
        }

        let task = tokio::spawn(inner.clone().run(events_rx, shutdown_rx));

        Ok(Self {
            inner,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }

    /// Stop the event loop, release the connection-state subscription and the
    /// watch. Idempotent; the listener is not called once this returns.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!(path = %self.inner.path, "Leader retrieval driver already closed");
            return;
        }
        info!(path = %self.inner.path, "Stopping leader retrieval driver");

        let _ = self.shutdown_tx.send(true);

        let monitor = self.inner.monitor.lock().take();
        if let Some(monitor) = monitor {
            monitor.stop().await;
        }
        self.inner.watcher.deregister().await;

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(
                    path = %self.inner.path,
                    error = %e,
                    "Driver event loop ended abnormally"
                );
            }
        }
    }

    /// The path of the leader record.
    pub fn connection_information_path(&self) -> &str {
        &self.inner.path
    }

    pub fn clearance_policy(&self) -> ClearancePolicy {
        self.inner.policy
    }

    /// The value most recently delivered to the listener.
    pub fn last_notified(&self) -> LeaderInformation {
        self.inner.state.lock().last_notified.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    /// `false` after a subscription failure.
    pub fn is_usable(&self) -> bool {
        self.inner.is_usable()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Generation of the current watch registration.
    pub fn watch_generation(&self) -> u64 {
        self.inner.watcher.generation()
    }
}

impl Drop for LeaderRetrievalDriver {
    fn drop(&mut self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        warn!(
            path = %self.inner.path,
            "Leader retrieval driver dropped without close, subscriptions stay registered"
        );
        let _ = self.shutdown_tx.send(true);
    }
}

impl DriverInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn is_usable(&self) -> bool {
        self.state.lock().usable
    }

    async fn run(self: Arc<Self>, mut events: EventReceiver, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        debug!(path = %self.path, "Driver event loop stopped");
    }

    async fn handle_event(&self, event: DriverEvent) {
        if self.is_closed() {
            debug!(?event, "Discarding event after close");
            return;
        }
        if !self.is_usable() {
            debug!(?event, "Discarding event, driver is unusable");
            return;
        }

        match event {
            DriverEvent::Connection(state) => {
                info!(path = %self.path, %state, "Connection state changed");
                if self.transition(PolicyInput::Connection(state)) {
                    self.resync().await;
                }
            }
            DriverEvent::Record {
                generation,
                trigger,
            } => {
                if !self.watcher.is_current(generation) {
                    debug!(
                        generation,
                        current = self.watcher.generation(),
                        "Discarding stale watch event"
                    );
                    return;
                }

                if let RecordTrigger::Watch(kind) = trigger {
                    debug!(path = %self.path, %kind, "Leader record watch fired");
                    if let Err(e) = self.watcher.rearm(generation).await {
                        if e.is_connection_fault() {
                            warn!(
                                path = %self.path,
                                error = %e,
                                "Could not re-arm watch, waiting for reconnection"
                            );
                        } else {
                            self.fail(RetrievalError::subscription(format!(
                                "re-arming watch on {}: {}",
                                self.path, e
                            )));
                            return;
                        }
                    }
                }

                if let Some(leader) = self.read_leader().await {
                    self.transition(PolicyInput::Record(leader));
                }
            }
        }
    }

    /// Start a new watch generation and re-announce whatever the record holds.
    async fn resync(&self) {
        match self.watcher.register().await {
            Ok(generation) => {
                debug!(path = %self.path, generation, "Re-registered after reconnection")
            }
            Err(e) if e.is_connection_fault() => {
                warn!(
                    path = %self.path,
                    error = %e,
                    "Could not re-register watch, waiting for next reconnection"
                );
                return;
            }
            Err(e) => {
                self.fail(RetrievalError::subscription(format!(
                    "re-registering watch on {}: {}",
                    self.path, e
                )));
                return;
            }
        }

        if let Some(leader) = self.read_leader().await {
            self.transition(PolicyInput::Resynced(leader));
        }
    }

    /// `None` if the record could not be read or decoded. Decode failures are
    /// reported as fatal; the last notified leader is kept.
    async fn read_leader(&self) -> Option<LeaderInformation> {
        let data = match self.client.get_data(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Failed to read leader record");
                return None;
            }
        };

        match decode_record(self.codec.as_ref(), data.as_deref()) {
            Ok(leader) => Some(leader),
            Err(e) => {
                error!(path = %self.path, error = %e, "Malformed leader record");
                self.fatal_errors.on_fatal_error(e.into());
                None
            }
        }
    }

    /// Decide and apply one input as a single critical section. Returns
    /// `true` if the caller must resync.
    fn transition(&self, input: PolicyInput) -> bool {
        let mut delivery_error = None;

        let resync = {
            let mut state = self.state.lock();
            if let PolicyInput::Connection(connection) = &input {
                state.connection = connection.settled();
            }

            match next_action(self.policy, &input, &state.last_notified) {
                Action::Ignore => false,
                Action::Resync => true,
                Action::Notify(leader) => {
                    if self.is_closed() {
                        debug!(%leader, "Driver closed, not notifying");
                        return false;
                    }
                    state.last_notified = leader.clone();
                    info!(path = %self.path, %leader, "Notifying leader address");
                    if let Err(e) = self.listener.notify_leader_address(leader) {
                        delivery_error = Some(e);
                    }
                    false
                }
            }
        };

        if let Some(e) = delivery_error {
            warn!(path = %self.path, error = %e, "Listener rejected leader notification");
            self.fatal_errors.on_fatal_error(e);
        }
        resync
    }

    fn fail(&self, error: RetrievalError) {
        self.state.lock().usable = false;
        error!(path = %self.path, error = %error, "Leader retrieval driver is unusable");
        self.fatal_errors.on_fatal_error(error);
    }
}
