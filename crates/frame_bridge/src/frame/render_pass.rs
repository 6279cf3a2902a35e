//! Render passes, quads and their shared state

use super::{Color, Rect, RenderPassId, ResourceId};
use crate::foundation::math::Mat4;

/// Transform, clip and opacity shared by a run of quads
#[derive(Debug, Clone, PartialEq)]
pub struct SharedQuadState {
    /// Maps quad space into the space of the pass being drawn
    pub quad_to_target_transform: Mat4,
    /// Part of the layer that is visible, in quad space
    pub visible_rect: Rect,
    /// Clip in target space, if any
    pub clip_rect: Option<Rect>,
    /// Opacity multiplied into every quad using this state
    pub opacity: f32,
}

impl SharedQuadState {
    /// Unclipped, opaque state with the given transform
    pub fn new(quad_to_target_transform: Mat4, visible_rect: Rect) -> Self {
        Self {
            quad_to_target_transform,
            visible_rect,
            clip_rect: None,
            opacity: 1.0,
        }
    }
}

impl Default for SharedQuadState {
    fn default() -> Self {
        Self::new(Mat4::identity(), Rect::default())
    }
}

/// What a quad draws
#[derive(Debug, Clone, PartialEq)]
pub enum QuadMaterial {
    /// Solid fill, references no resources
    SolidColor(Color),
    /// Single texture
    Texture {
        /// Texture to sample
        resource_id: ResourceId,
        /// Whether texel colors are premultiplied
        premultiplied_alpha: bool,
    },
    /// Output of another pass in the same frame
    RenderPass {
        /// Pass whose output is sampled
        pass_id: RenderPassId,
        /// Optional mask texture
        mask_resource_id: Option<ResourceId>,
    },
    /// Planar video frame
    YuvVideo {
        /// Luma plane
        y: ResourceId,
        /// Chroma U plane
        u: ResourceId,
        /// Chroma V plane
        v: ResourceId,
        /// Optional alpha plane
        a: Option<ResourceId>,
    },
}

impl QuadMaterial {
    /// Resource ids referenced by this material
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        let slots: [Option<ResourceId>; 4] = match self {
            Self::SolidColor(_) => [None, None, None, None],
            Self::Texture { resource_id, .. } => [Some(*resource_id), None, None, None],
            Self::RenderPass { mask_resource_id, .. } => [*mask_resource_id, None, None, None],
            Self::YuvVideo { y, u, v, a } => [Some(*y), Some(*u), Some(*v), *a],
        };
        slots.into_iter().flatten()
    }

    /// Mutable access to the referenced ids, for in-place remapping
    pub fn resources_mut(&mut self) -> impl Iterator<Item = &mut ResourceId> + '_ {
        let slots: [Option<&mut ResourceId>; 4] = match self {
            Self::SolidColor(_) => [None, None, None, None],
            Self::Texture { resource_id, .. } => [Some(resource_id), None, None, None],
            Self::RenderPass { mask_resource_id, .. } => [mask_resource_id.as_mut(), None, None, None],
            Self::YuvVideo { y, u, v, a } => [Some(y), Some(u), Some(v), a.as_mut()],
        };
        slots.into_iter().flatten()
    }
}

/// One draw in a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct DrawQuad {
    /// Quad bounds in quad space
    pub rect: Rect,
    /// Visible part of `rect`
    pub visible_rect: Rect,
    /// Index into the owning pass's shared quad states
    pub shared_quad_state: usize,
    /// What to draw
    pub material: QuadMaterial,
}

impl DrawQuad {
    /// Fully visible quad
    pub const fn new(rect: Rect, shared_quad_state: usize, material: QuadMaterial) -> Self {
        Self { rect, visible_rect: rect, shared_quad_state, material }
    }

    /// Resource ids this quad references
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.material.resources()
    }

    /// Mutable resource ids this quad references
    pub fn resources_mut(&mut self) -> impl Iterator<Item = &mut ResourceId> + '_ {
        self.material.resources_mut()
    }
}

/// Ordered batch of quads drawn into one target
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    /// Pass id, unique within a frame
    pub id: RenderPassId,
    /// Pixel bounds of the pass output
    pub output_rect: Rect,
    /// Part of the output that changed since the previous frame
    pub damage_rect: Rect,
    /// Places the pass output in root target space
    pub transform_to_root_target: Mat4,
    /// Quads in draw order (front to back is the producer's concern)
    pub quads: Vec<DrawQuad>,
    /// States referenced by `quads`
    pub shared_quad_states: Vec<SharedQuadState>,
}

impl RenderPass {
    /// Empty pass
    pub fn new(id: RenderPassId, output_rect: Rect) -> Self {
        Self {
            id,
            output_rect,
            damage_rect: output_rect,
            transform_to_root_target: Mat4::identity(),
            quads: Vec::new(),
            shared_quad_states: Vec::new(),
        }
    }

    /// Append a shared state and return its index
    pub fn add_shared_quad_state(&mut self, state: SharedQuadState) -> usize {
        self.shared_quad_states.push(state);
        self.shared_quad_states.len() - 1
    }

    /// Append a quad
    pub fn add_quad(&mut self, quad: DrawQuad) {
        debug_assert!(quad.shared_quad_state < self.shared_quad_states.len());
        self.quads.push(quad);
    }

    /// Shared state of a quad, if its index is in range
    pub fn shared_quad_state_for(&self, quad: &DrawQuad) -> Option<&SharedQuadState> {
        self.shared_quad_states.get(quad.shared_quad_state)
    }
}

/// Passes of one frame; the last one is the root pass
pub type RenderPassList = Vec<RenderPass>;

/// Deep copy of a pass list
///
/// Renders work on a copy so per-render edits never reach the retained frame.
pub fn copy_all(passes: &[RenderPass]) -> RenderPassList {
    passes.to_vec()
}
