//! Connection state monitoring.
//!
//! Subscribes to the client's session callbacks and forwards the abstract
//! [`ConnectionState`] transitions the driver acts on.

use leadwatch_core::{
    ConnectionState, CoordinationClient, Result, RetrievalError, SessionListener, SessionState,
    SubscriptionId,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::event::{DriverEvent, EventSender};

/// Maps raw session states onto driver transitions.
///
/// The first `Connected` carries no information (nothing was known before it)
/// and is swallowed. A `Connected` or `ReadOnly` after a suspension or loss is
/// a reconnection.
#[derive(Debug, Default)]
pub struct ConnectionTranslator {
    disrupted: bool,
}

impl ConnectionTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, raw: SessionState) -> Option<ConnectionState> {
        match raw {
            SessionState::Connected | SessionState::ReadOnly => {
                if std::mem::take(&mut self.disrupted) {
                    Some(ConnectionState::Reconnected)
                } else {
                    None
                }
            }
            SessionState::Reconnected => {
                self.disrupted = false;
                Some(ConnectionState::Reconnected)
            }
            SessionState::Suspended => {
                self.disrupted = true;
                Some(ConnectionState::Suspended)
            }
            SessionState::Lost => {
                self.disrupted = true;
                Some(ConnectionState::Lost)
            }
        }
    }
}

/// Owns the connection-state subscription of one driver.
pub struct ConnectionStateMonitor {
    client: Arc<dyn CoordinationClient>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl ConnectionStateMonitor {
    /// Subscribe to `client` and forward translated transitions to `events`.
    ///
    /// Fails with a subscription error if the client rejects the listener.
    pub async fn start(client: Arc<dyn CoordinationClient>, events: EventSender) -> Result<Self> {
        let translator = Mutex::new(ConnectionTranslator::new());
        let listener: SessionListener = Arc::new(move |raw: SessionState| {
            // Translate and send under one lock so concurrent callbacks keep
            // their order in the event channel.
            let mut translator = translator.lock();
            match translator.translate(raw) {
                Some(state) => {
                    if events.send(DriverEvent::Connection(state)).is_err() {
                        debug!(%state, "Driver event loop gone, dropping connection state");
                    }
                }
                None => debug!(?raw, "Ignoring initial connection state"),
            }
        });

        let id = client
            .subscribe_connection_state(listener)
            .await
            .map_err(|e| {
                RetrievalError::subscription(format!("connection state listener: {}", e))
            })?;
        debug!(subscription = %id, "Subscribed to connection state changes");

        Ok(Self {
            client,
            subscription: Mutex::new(Some(id)),
        })
    }

    /// Release the subscription. Calling this more than once is a no-op.
    pub async fn stop(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(id) = subscription {
            if let Err(e) = self.client.unsubscribe_connection_state(id).await {
                warn!(
                    subscription = %id,
                    error = %e,
                    "Failed to unsubscribe connection state listener"
                );
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }
}
