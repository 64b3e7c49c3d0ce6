//! # Core Types
//!
//! Value types shared by the driver, the coordination client abstraction and
//! the listener.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The leader as published in the leader record, or the absence of one.
///
/// Equality is structural: two known values are equal only if both the
/// address and the session identifier match, so a re-elected leader on the
/// same address is still a different value.
///
/// # Examples
///
/// ```rust
/// use leadwatch_core::LeaderInformation;
/// use uuid::Uuid;
///
/// let session = Uuid::new_v4();
/// let leader = LeaderInformation::known(session, "localhost:6123");
/// assert_eq!(leader.leader_address(), Some("localhost:6123"));
/// assert!(LeaderInformation::empty().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeaderInformation {
    /// No leader is known
    #[default]
    Empty,

    /// A leader published its address for the given session
    Known {
        session_id: Uuid,
        address: String,
    },
}

impl LeaderInformation {
    /// Creates leader information for a known leader.
    pub fn known(session_id: Uuid, address: impl Into<String>) -> Self {
        Self::Known {
            session_id,
            address: address.into(),
        }
    }

    /// The distinguished "no leader known" value.
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn leader_address(&self) -> Option<&str> {
        match self {
            Self::Known { address, .. } => Some(address),
            Self::Empty => None,
        }
    }

    pub fn leader_session_id(&self) -> Option<Uuid> {
        match self {
            Self::Known { session_id, .. } => Some(*session_id),
            Self::Empty => None,
        }
    }
}

impl fmt::Display for LeaderInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known {
                session_id,
                address,
            } => write!(f, "{}@{}", address, session_id),
            Self::Empty => write!(f, "<no leader>"),
        }
    }
}

/// Abstract connection state observed by the driver.
///
/// `Reconnected` is a transition, not a resting state: once handled the
/// driver considers itself `Connected` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Suspended,
    Reconnected,
    Lost,
}

impl ConnectionState {
    /// The resting state after this transition has been applied.
    pub fn settled(self) -> Self {
        match self {
            Self::Reconnected => Self::Connected,
            other => other,
        }
    }

    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "CONNECTED"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Reconnected => write!(f, "RECONNECTED"),
            Self::Lost => write!(f, "LOST"),
        }
    }
}

/// Raw session state as reported by a coordination client.
///
/// This mirrors what ZooKeeper-class clients expose. `ReadOnly` means the
/// session is connected to a server that only serves reads, which is enough
/// to retrieve the leader record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Connected,
    ReadOnly,
    Suspended,
    Reconnected,
    Lost,
}

impl SessionState {
    /// Whether requests can currently be served.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::ReadOnly | Self::Reconnected)
    }
}

/// When the driver stops trusting the last known leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearancePolicy {
    /// Clear as soon as the connection is suspended
    #[default]
    OnSuspendedConnection,

    /// Keep serving the last known leader until the session is lost
    OnLostConnection,
}

impl ClearancePolicy {
    /// Tolerating suspended connections means only a lost session clears the
    /// leader.
    ///
    /// ```rust
    /// use leadwatch_core::ClearancePolicy;
    ///
    /// assert_eq!(
    ///     ClearancePolicy::from_tolerate_suspended_connections(true),
    ///     ClearancePolicy::OnLostConnection
    /// );
    /// ```
    pub fn from_tolerate_suspended_connections(tolerate: bool) -> Self {
        if tolerate {
            Self::OnLostConnection
        } else {
            Self::OnSuspendedConnection
        }
    }

    /// Whether a transition into `state` invalidates the known leader.
    pub fn clears_on(self, state: ConnectionState) -> bool {
        match (self, state) {
            (Self::OnSuspendedConnection, ConnectionState::Suspended) => true,
            (_, ConnectionState::Lost) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ClearancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnSuspendedConnection => write!(f, "ON_SUSPENDED_CONNECTION"),
            Self::OnLostConnection => write!(f, "ON_LOST_CONNECTION"),
        }
    }
}

/// Identifier of a one-shot watch registered with a coordination client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Identifier of a connection-state subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
