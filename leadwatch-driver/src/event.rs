//! Events fed into a driver's event loop.

use leadwatch_core::{ConnectionState, WatchEventKind};
use tokio::sync::mpsc;

/// Why the leader record should be (re)read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTrigger {
    /// First read after the watch of a generation was installed
    Initial,
    /// A one-shot watch fired
    Watch(WatchEventKind),
}

/// Input to the serialized event loop. Produced concurrently by the
/// connection-state monitor and by watch callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Connection(ConnectionState),
    Record {
        /// Generation of the watch registration this event belongs to
        generation: u64,
        trigger: RecordTrigger,
    },
}

pub type EventSender = mpsc::UnboundedSender<DriverEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<DriverEvent>;
