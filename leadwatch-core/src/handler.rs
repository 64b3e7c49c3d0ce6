//! Sinks the driver delivers to.

use crate::{LeaderInformation, Result, RetrievalError};

/// Receives the leader as seen by a leader retrieval driver.
///
/// Called synchronously from the driver's event loop, one call at a time and
/// in order. A slow handler delays all further event processing of its
/// driver. Implementations must not call back into the driver that notifies
/// them.
pub trait LeaderRetrievalEventHandler: Send + Sync {
    /// An `Err` is passed on to the driver's fatal-error handler.
    fn notify_leader_address(&self, leader: LeaderInformation) -> Result<()>;
}

/// Receives unrecoverable errors. Called exactly once per condition.
pub trait FatalErrorHandler: Send + Sync {
    fn on_fatal_error(&self, error: RetrievalError);
}
