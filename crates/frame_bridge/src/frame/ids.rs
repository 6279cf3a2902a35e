//! Opaque identifiers exchanged with the frame producer

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Handle to a GPU resource (texture or buffer)
///
/// The same type carries producer-space and local-space ids; which namespace a
/// value belongs to depends on where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Producer-space to local-space id translation
pub type ResourceIdMap = HashMap<ResourceId, ResourceId>;

/// Set of resource ids
pub type ResourceIdSet = HashSet<ResourceId>;

/// Registration of one frame producer with a resource provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildId(pub u32);

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "child#{}", self.0)
    }
}

/// Identifies a render pass within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RenderPassId(pub u64);

/// Identifies the producer surface a frame was submitted for
///
/// Only round-tripped back to the producer with resource acknowledgments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LocalSurfaceId {
    /// Sequence number allocated by the embedder
    pub parent_sequence: u32,
    /// Sequence number allocated by the producer
    pub child_sequence: u32,
    /// Random token distinguishing surfaces with equal sequence numbers
    pub nonce: u64,
}

impl LocalSurfaceId {
    /// Create a surface id
    pub const fn new(parent_sequence: u32, child_sequence: u32, nonce: u64) -> Self {
        Self { parent_sequence, child_sequence, nonce }
    }

    /// A default-constructed id is invalid
    pub const fn is_valid(&self) -> bool {
        self.parent_sequence != 0 && self.child_sequence != 0 && self.nonce != 0
    }
}
