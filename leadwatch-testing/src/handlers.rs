use leadwatch_core::{FatalErrorHandler, RetrievalError};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::warn;

/// Fatal-error handler that records every error so tests can assert on them.
#[derive(Default)]
pub struct TestingFatalErrorHandler {
    errors: Mutex<Vec<RetrievalError>>,
    notify: Notify,
}

impl TestingFatalErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Drain the recorded errors.
    pub fn take_errors(&self) -> Vec<RetrievalError> {
        std::mem::take(&mut *self.errors.lock())
    }

    /// Wait until at least `count` errors have been recorded since the last
    /// [`take_errors`](Self::take_errors). Returns `false` on timeout.
    pub async fn wait_for_errors(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.error_count() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.error_count() >= count;
            }
        }
    }
}

impl FatalErrorHandler for TestingFatalErrorHandler {
    fn on_fatal_error(&self, error: RetrievalError) {
        warn!(error = %error, "Recorded fatal error");
        self.errors.lock().push(error);
        self.notify.notify_waiters();
    }
}
