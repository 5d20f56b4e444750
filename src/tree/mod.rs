//! Tree adapter: the narrow capability the executor consumes to read the
//! accessibility tree of the system under test.
//!
//! ## Architecture
//!
//! - `TreeAdapter` - resolve a compiled Finder, subscribe to tree events
//! - `AccessibilityTree` - arena snapshot with preorder traversal
//! - `SnapshotAdapter` - a `TreeAdapter` over a replaceable snapshot
//! - `matcher` - Finder resolution rules over an `AccessibilityTree`

pub mod matcher;
pub mod snapshot;
pub mod types;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::finder::Query;

pub use snapshot::{AccessibilityTree, NodeId, SnapshotAdapter, TreeNodeSpec};
pub use types::{NodeInfo, Point, Rect, LOCATION_EPSILON};

/// Failure modes of a resolve call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Connection to the tree is gone; nothing will succeed until it is
    /// re-established.
    #[error("adapter unavailable: {0}")]
    Unavailable(String),

    /// Retryable; the poll engine treats it as "try again next interval".
    #[error("transient adapter failure: {0}")]
    Transient(String),
}

/// Events pushed by an adapter to anyone subscribed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeEvent {
    Changed { revision: u64 },
    Disconnected { reason: String },
}

#[async_trait]
pub trait TreeAdapter: Send + Sync {
    /// Matches of `query` in tree preorder.
    async fn resolve(&self, query: &Query) -> Result<Vec<NodeInfo>, AdapterError>;

    /// Stream of tree events. Lagging receivers may miss events.
    fn subscribe(&self) -> broadcast::Receiver<TreeEvent>;
}
