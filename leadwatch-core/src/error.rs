//! # Error Types
//!
//! Error handling for leader retrieval: decoding of the leader record,
//! coordination client failures, and listener delivery failures.

use thiserror::Error;

/// Reasons a leader record could not be decoded.
///
/// Every variant indicates a protocol incompatibility between the writer of
/// the record and this reader, so none of them is worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than four bytes were available for the address length prefix
    #[error("record too short for length prefix: {len} bytes")]
    TruncatedHeader { len: usize },

    /// The length prefix claims more address bytes than the record holds
    #[error("address length {declared} exceeds remaining {remaining} bytes")]
    TruncatedAddress { declared: usize, remaining: usize },

    /// The address bytes are not valid UTF-8
    #[error("leader address is not valid UTF-8: {reason}")]
    InvalidAddress { reason: String },

    /// Fewer than sixteen bytes remained for the session identifier
    #[error("session id needs 16 bytes, found {remaining}")]
    TruncatedSessionId { remaining: usize },

    /// Extra bytes followed the session identifier
    #[error("{extra} unexpected trailing bytes after session id")]
    TrailingBytes { extra: usize },
}

/// Error types that can occur while retrieving leader information.
///
/// # Error Categories
///
/// - **Fatal**: malformed leader records and failed subscriptions. These are
///   handed to the fatal-error handler exactly once and never retried.
/// - **Connection**: the coordination session is not connected. The driver
///   waits for the next connection-state transition.
/// - **Client**: any other coordination failure (rejected requests, timeouts,
///   missing or existing nodes). A rejected watch registration is escalated
///   as a subscription failure.
/// - **Caller-facing**: interrupted waits, full listener queues, invalid
///   configuration and use after close.
///
/// # Examples
///
/// ```rust
/// use leadwatch_core::RetrievalError;
///
/// let error = RetrievalError::subscription("watch rejected");
/// assert!(error.is_fatal());
/// ```
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Malformed bytes at the watched path
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Connection-state or watch subscription could not be established
    #[error("Subscription error: {message}")]
    Subscription { message: String },

    /// A blocking wait was interrupted before a value arrived
    #[error("Interrupted while waiting: {operation}")]
    Interrupted { operation: String },

    /// A bounded listener queue had no room for the next notification
    #[error("Listener queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The coordination session is not currently connected
    #[error("Not connected: {message}")]
    NotConnected { message: String },

    /// The path does not exist
    #[error("No node at {path}")]
    NoNode { path: String },

    /// The path already exists
    #[error("Node already exists at {path}")]
    NodeExists { path: String },

    /// Any other coordination client failure
    #[error("Coordination error: {message}")]
    Coordination { message: String },

    /// Operation exceeded its timeout limit
    #[error("Timeout occurred: {operation}")]
    Timeout { operation: String },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The component was already closed
    #[error("Closed: {component}")]
    Closed { component: String },

    /// JSON serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Results in leader retrieval.
pub type Result<T> = std::result::Result<T, RetrievalError>;

impl RetrievalError {
    /// Creates a new subscription error with the given message.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Creates a new coordination error with the given message.
    pub fn coordination(message: impl Into<String>) -> Self {
        Self::Coordination {
            message: message.into(),
        }
    }

    /// Creates a new not-connected error with the given message.
    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::NotConnected {
            message: message.into(),
        }
    }

    /// Creates a new interrupted error for the given operation.
    pub fn interrupted(operation: impl Into<String>) -> Self {
        Self::Interrupted {
            operation: operation.into(),
        }
    }

    /// Creates a new configuration error with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new timeout error for the given operation.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Returns `true` for conditions that are escalated to the fatal-error
    /// handler instead of being retried or waited out.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leadwatch_core::{DecodeError, RetrievalError};
    ///
    /// let decode: RetrievalError = DecodeError::TrailingBytes { extra: 3 }.into();
    /// assert!(decode.is_fatal());
    ///
    /// let offline = RetrievalError::not_connected("session suspended");
    /// assert!(!offline.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Subscription { .. })
    }

    /// Returns `true` if the request failed only because the coordination
    /// session was not connected. Such failures resolve with the next
    /// reconnection; every other client failure is final.
    pub fn is_connection_fault(&self) -> bool {
        matches!(self, Self::NotConnected { .. })
    }
}
