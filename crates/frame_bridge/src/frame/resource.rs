//! Resources crossing the producer boundary

use super::{ResourceId, Size};

/// Fence the consumer must wait on before touching a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyncToken {
    /// Command buffer namespace the fence belongs to
    pub namespace: u32,
    /// Release count the fence waits for
    pub release_count: u64,
}

impl SyncToken {
    /// Create a sync token
    pub const fn new(namespace: u32, release_count: u64) -> Self {
        Self { namespace, release_count }
    }

    /// An empty token needs no wait
    pub const fn is_empty(&self) -> bool {
        self.release_count == 0
    }
}

/// A producer-owned resource offered alongside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferableResource {
    /// Producer-space id
    pub id: ResourceId,
    /// Texture size
    pub size: Size,
    /// Fence guarding the producer's last write
    pub sync_token: SyncToken,
    /// Whether the producer allows direct scanout
    pub is_overlay_candidate: bool,
}

impl TransferableResource {
    /// Create a resource description with an empty sync token
    pub const fn new(id: ResourceId, size: Size) -> Self {
        Self {
            id,
            size,
            sync_token: SyncToken { namespace: 0, release_count: 0 },
            is_overlay_candidate: false,
        }
    }
}

/// A resource handed back to its producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnedResource {
    /// Producer-space id
    pub id: ResourceId,
    /// Fence guarding the consumer's last read
    pub sync_token: SyncToken,
    /// How many times the producer transferred this resource
    pub count: u32,
    /// The resource contents were lost (for example on context loss)
    pub lost: bool,
}

/// Latency tracking attached to a buffer swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyInfo {
    /// Trace id linking the swap to input events
    pub trace_id: i64,
}
