use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

///
/// Identifier of a node in a [`ProcessTree`](super::ProcessTree)
///
/// Identifiers are only used to tell nodes apart (equality, hashing, arena lookup),
/// never for behavioral meaning.
///
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Get the raw integer value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// Source of fresh [`NodeId`]s, scoped to one search session
///
/// All trees created in one session share the same generator (through an [`Arc`]),
/// so that identities are never handed out twice within a session.
/// The counter is atomic, so lineages may be mutated on different threads.
///
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at `0`
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Create a new generator that can be shared by many trees
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Draw a fresh, never before returned [`NodeId`]
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of identifiers handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
