//! # Compositor Frame Model
//!
//! In-process representation of the frames a remote producer submits: render
//! passes made of quads, the resources those quads reference, and per-frame
//! metadata.
//!
//! Resource ids inside a frame start out in the producer's namespace and are
//! rewritten in place to local ids when the host accepts the frame.

mod ids;
mod geometry;
mod resource;
mod render_pass;
mod compositor_frame;

pub use ids::{ChildId, LocalSurfaceId, RenderPassId, ResourceId, ResourceIdMap, ResourceIdSet};
pub use geometry::{Color, Rect, Size};
pub use resource::{LatencyInfo, ReturnedResource, SyncToken, TransferableResource};
pub use render_pass::{copy_all, DrawQuad, QuadMaterial, RenderPass, RenderPassList, SharedQuadState};
pub use compositor_frame::{CompositorFrame, FrameMetadata};
