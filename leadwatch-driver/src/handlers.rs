//! Stock listener and fatal-error handler implementations.

use leadwatch_core::{
    FatalErrorHandler, LeaderInformation, LeaderRetrievalEventHandler, Result, RetrievalError,
};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error};

/// Listener that buffers notifications in a bounded FIFO queue.
///
/// Delivery never blocks the driver: when the queue is full the notification
/// is rejected with [`RetrievalError::QueueFull`], which the driver reports to
/// its fatal-error handler. Nothing is dropped silently.
pub struct QueueLeaderListener {
    tx: Mutex<Option<mpsc::Sender<LeaderInformation>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<LeaderInformation>>,
    capacity: usize,
}

impl QueueLeaderListener {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for the next notification.
    ///
    /// Fails with [`RetrievalError::Interrupted`] once the listener has been
    /// shut down and the queue is drained.
    pub async fn next(&self) -> Result<LeaderInformation> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| RetrievalError::interrupted("waiting for leader notification"))
    }

    /// Like [`next`](Self::next) but gives up after `timeout` with `Ok(None)`.
    pub async fn next_timeout(&self, timeout: Duration) -> Result<Option<LeaderInformation>> {
        match tokio::time::timeout(timeout, self.next()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Drop queued notifications nobody consumed. Returns how many were
    /// dropped; 0 if a consumer is currently waiting.
    pub fn clear_unhandled_events(&self) -> usize {
        let Ok(mut rx) = self.rx.try_lock() else {
            return 0;
        };
        let mut cleared = 0;
        while rx.try_recv().is_ok() {
            cleared += 1;
        }
        if cleared > 0 {
            debug!(cleared, "Cleared unhandled leader notifications");
        }
        cleared
    }

    /// Reject further notifications and wake waiting consumers once the queue
    /// is drained.
    pub fn shutdown(&self) {
        self.tx.lock().take();
    }
}

impl LeaderRetrievalEventHandler for QueueLeaderListener {
    fn notify_leader_address(&self, leader: LeaderInformation) -> Result<()> {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err(RetrievalError::Closed {
                component: "queue leader listener".to_string(),
            });
        };

        tx.try_send(leader).map_err(|e| match e {
            TrySendError::Full(_) => RetrievalError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => RetrievalError::Closed {
                component: "queue leader listener".to_string(),
            },
        })
    }
}

/// Fatal-error handler that only logs.
#[derive(Debug, Clone)]
pub struct LoggingFatalErrorHandler {
    component: String,
}

impl LoggingFatalErrorHandler {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Default for LoggingFatalErrorHandler {
    fn default() -> Self {
        Self::new("leader-retrieval")
    }
}

impl FatalErrorHandler for LoggingFatalErrorHandler {
    fn on_fatal_error(&self, error: RetrievalError) {
        error!(component = %self.component, error = %error, "Fatal error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let listener = QueueLeaderListener::new(4);
        let first = LeaderInformation::known(Uuid::new_v4(), "a");
        let second = LeaderInformation::known(Uuid::new_v4(), "b");

        assert_ok!(listener.notify_leader_address(first.clone()));
        assert_ok!(listener.notify_leader_address(LeaderInformation::Empty));
        assert_ok!(listener.notify_leader_address(second.clone()));

        assert_eq!(listener.next().await.unwrap(), first);
        assert_eq!(listener.next().await.unwrap(), LeaderInformation::Empty);
        assert_eq!(listener.next().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_full_queue_is_an_error() {
        let listener = QueueLeaderListener::new(1);
        listener
            .notify_leader_address(LeaderInformation::Empty)
            .unwrap();

        let err = listener
            .notify_leader_address(LeaderInformation::Empty)
            .unwrap_err();
        assert!(matches!(err, RetrievalError::QueueFull { capacity: 1 }));
    }

    #[tokio::test]
    async fn test_next_timeout_on_empty_queue() {
        let listener = QueueLeaderListener::new(1);
        let next = listener
            .next_timeout(Duration::from_millis(20))
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_waiters() {
        let listener = QueueLeaderListener::new(2);
        listener
            .notify_leader_address(LeaderInformation::Empty)
            .unwrap();
        listener.shutdown();

        // Queued values are still handed out before the interruption
        assert_eq!(listener.next().await.unwrap(), LeaderInformation::Empty);
        let err = listener.next().await.unwrap_err();
        assert!(matches!(err, RetrievalError::Interrupted { .. }));

        let rejected = listener.notify_leader_address(LeaderInformation::Empty);
        assert!(matches!(rejected, Err(RetrievalError::Closed { .. })));
    }

    #[tokio::test]
    async fn test_clear_unhandled_events() {
        let listener = QueueLeaderListener::new(3);
        listener
            .notify_leader_address(LeaderInformation::Empty)
            .unwrap();
        listener
            .notify_leader_address(LeaderInformation::Empty)
            .unwrap();

        assert_eq!(listener.clear_unhandled_events(), 2);
        assert!(listener
            .next_timeout(Duration::from_millis(10))
            .await
            .unwrap()
            .is_none());
    }
}
