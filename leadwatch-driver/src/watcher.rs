//! Watch registration for the leader record.
//!
//! Watches are one-shot and a session change invalidates them, so every
//! registration belongs to a generation. Reconnection starts a new generation;
//! events carrying an older generation are stale.

use leadwatch_core::{CoordinationClient, NodeWatcher, Result, WatchEvent, WatchId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::event::{DriverEvent, EventSender, RecordTrigger};

pub struct LeaderRecordWatcher {
    client: Arc<dyn CoordinationClient>,
    path: String,
    events: EventSender,
    generation: AtomicU64,
    active: Mutex<Option<WatchId>>,
    closed: AtomicBool,
}

impl LeaderRecordWatcher {
    pub fn new(client: Arc<dyn CoordinationClient>, path: String, events: EventSender) -> Self {
        Self {
            client,
            path,
            events,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        !self.is_closed() && generation == self.generation()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Start a new generation and install its watch, dropping the watch of the
    /// previous generation. Returns the new generation.
    pub async fn register(&self) -> Result<u64> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let previous = self.active.lock().take();
        if let Some(id) = previous {
            // Usually already gone with the old session
            if let Err(e) = self.client.remove_watch(id).await {
                debug!(watch = %id, error = %e, "Could not remove previous watch");
            }
        }

        self.install(generation).await?;
        debug!(path = %self.path, generation, "Registered leader record watch");
        Ok(generation)
    }

    /// Install the next one-shot watch after a watch of `generation` fired.
    /// Returns `false` without touching the client if the generation is stale
    /// or the watcher is closed.
    pub async fn rearm(&self, generation: u64) -> Result<bool> {
        if !self.is_current(generation) {
            return Ok(false);
        }
        self.install(generation).await?;
        Ok(true)
    }

    async fn install(&self, generation: u64) -> Result<()> {
        let events = self.events.clone();
        let watcher: NodeWatcher = Arc::new(move |event: WatchEvent| {
            let kind = event.kind;
            if events
                .send(DriverEvent::Record {
                    generation,
                    trigger: RecordTrigger::Watch(kind),
                })
                .is_err()
            {
                debug!(generation, %kind, "Driver event loop gone, dropping watch event");
            }
        });

        let id = self.client.watch(&self.path, watcher).await?;
        *self.active.lock() = Some(id);

        // Lost a race with deregister: do not leave the watch behind
        if self.is_closed() {
            let leftover = self.active.lock().take();
            if let Some(id) = leftover {
                if let Err(e) = self.client.remove_watch(id).await {
                    debug!(
                        watch = %id,
                        error = %e,
                        "Could not remove watch installed during close"
                    );
                }
            }
        }
        Ok(())
    }

    /// Remove the active watch and invalidate every generation. Idempotent.
    pub async fn deregister(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        let active = self.active.lock().take();
        if let Some(id) = active {
            if let Err(e) = self.client.remove_watch(id).await {
                warn!(
                    path = %self.path,
                    watch = %id,
                    error = %e,
                    "Failed to remove leader record watch"
                );
            }
        }
    }
}
