//! # Leadwatch Core
//!
//! Shared building blocks for retrieving the current leader from a
//! ZooKeeper-style coordination service.
//!
//! ## Components
//!
//! - **LeaderInformation**: the published leader (address and session id) or
//!   the absence of one
//! - **Leader record codec**: the length-prefixed binary format stored at the
//!   retrieval path
//! - **CoordinationClient**: the client operations, one-shot watches and
//!   connection-state subscription the driver consumes
//! - **Handlers**: the listener and fatal-error sinks the driver produces to
//! - **Configuration**: retrieval path, clearance policy, connection timeout
//!
//! ```rust
//! use leadwatch_core::{codec::{LeaderRecordCodec, LengthPrefixedCodec}, LeaderInformation};
//! use uuid::Uuid;
//!
//! let leader = LeaderInformation::known(Uuid::new_v4(), "10.0.0.7:6123");
//! let record = LengthPrefixedCodec.encode(&leader);
//! assert_eq!(LengthPrefixedCodec.decode(&record).unwrap(), leader);
//! ```

pub mod codec;
pub mod config;
pub mod coordination;
pub mod error;
pub mod handler;
pub mod types;

pub use config::RetrievalConfig;
pub use coordination::{
    CoordinationClient, NodeWatcher, SessionListener, WatchEvent, WatchEventKind,
};
pub use error::*;
pub use handler::{FatalErrorHandler, LeaderRetrievalEventHandler};
pub use types::*;
