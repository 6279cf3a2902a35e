//! One submitted frame

use super::{Color, RenderPassList, TransferableResource};

/// Per-frame data that is not part of any pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetadata {
    /// Color behind the root pass
    pub root_background_color: Color,
    /// Producer's device scale factor
    pub device_scale_factor: f32,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            root_background_color: Color::WHITE,
            device_scale_factor: 1.0,
        }
    }
}

/// A frame as submitted by the producer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositorFrame {
    /// Passes in draw order; the last one is the root
    pub render_passes: RenderPassList,
    /// Resources offered with this frame
    pub resources: Vec<TransferableResource>,
    /// Frame metadata
    pub metadata: FrameMetadata,
}

impl CompositorFrame {
    /// Create a frame
    pub fn new(render_passes: RenderPassList, resources: Vec<TransferableResource>, metadata: FrameMetadata) -> Self {
        Self { render_passes, resources, metadata }
    }
}
