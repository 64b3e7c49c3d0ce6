//! # Leadwatch Driver
//!
//! Leader retrieval on top of a ZooKeeper-style coordination service.
//!
//! This crate provides:
//! - **ConnectionStateMonitor**: maps client session states onto
//!   suspended / lost / reconnected transitions
//! - **LeaderRecordWatcher**: generation-tagged one-shot watches on the leader
//!   record
//! - **Policy**: the notification decision as a pure function
//! - **LeaderRetrievalDriver**: the event loop tying them together and
//!   notifying one listener
//! - **Handlers**: a bounded queue listener and a logging fatal-error handler
//!
//! The driver only observes the outcome of leader election; it never writes
//! the leader record.

pub mod connection;
pub mod driver;
pub mod event;
pub mod factory;
pub mod handlers;
pub mod policy;
pub mod watcher;

pub use connection::{ConnectionStateMonitor, ConnectionTranslator};
pub use driver::LeaderRetrievalDriver;
pub use event::{DriverEvent, RecordTrigger};
pub use factory::LeaderRetrievalDriverFactory;
pub use handlers::{LoggingFatalErrorHandler, QueueLeaderListener};
pub use policy::{next_action, Action, PolicyInput};
pub use watcher::LeaderRecordWatcher;
