//! Renderer contract and the strategy sum type

use std::rc::Rc;

use super::general::GeneralGpuRenderer;
use super::simplified::SimplifiedRenderer;
use super::{RenderResult, RendererKind};
use crate::foundation::math::{translation, Mat4};
use crate::frame::{LatencyInfo, QuadMaterial, Rect, RenderPass, Size};
use crate::surface::{FramebufferId, GpuApi, OutputSurface, QuadSource, SurfaceCapabilities};

/// Summary of the last frame a renderer drew
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnFrame {
    /// Viewport the root pass was drawn into
    pub viewport: Size,
    /// Device scale factor supplied by the embedder
    pub device_scale_factor: f32,
    /// Output rect of the root pass as received
    pub root_output_rect: Rect,
    /// Passes drawn into a target
    pub passes_drawn: usize,
    /// Quads submitted to the GPU
    pub quads_drawn: usize,
}

/// Operations the frame host drives on a renderer
///
/// Pass lists are ordered bottom-up with the root pass last. The host calls
/// `decide_render_pass_allocations_for_frame` and `draw_frame` with the same
/// list, in that order.
pub trait DirectRenderer {
    /// One-time setup after construction
    fn initialize(&mut self) -> RenderResult<()>;

    /// Invisible renderers skip drawing
    fn set_visible(&mut self, visible: bool);

    /// Current visibility
    fn visible(&self) -> bool;

    /// Size intermediate targets for the passes about to be drawn
    fn decide_render_pass_allocations_for_frame(&mut self, passes: &[RenderPass]);

    /// Draw the pass list into `output`
    ///
    /// # Errors
    /// Fails when the list has no root pass or the output cannot be bound.
    fn draw_frame(
        &mut self,
        output: &mut OutputSurface,
        passes: &[RenderPass],
        device_scale_factor: f32,
        viewport: Size,
    ) -> RenderResult<()>;

    /// Present the frame drawn last; only meaningful for offscreen output
    fn swap_buffers(&mut self, output: &mut OutputSurface, latency_info: &[LatencyInfo]);

    /// Summary of the last completed draw
    fn last_frame(&self) -> Option<&DrawnFrame>;
}

/// Renderer strategy chosen once at initialization
pub enum Renderer {
    /// Intermediate render targets per non-root pass
    GeneralGpu(GeneralGpuRenderer),
    /// Single target, nested passes flattened
    Simplified(SimplifiedRenderer),
}

impl Renderer {
    /// Build the renderer for `kind`
    pub fn new(kind: RendererKind, gpu: Rc<dyn GpuApi>) -> Self {
        match kind {
            RendererKind::GeneralGpu => Self::GeneralGpu(GeneralGpuRenderer::new(gpu)),
            RendererKind::Simplified => Self::Simplified(SimplifiedRenderer::new(gpu)),
        }
    }

    /// Strategy of this renderer
    pub const fn kind(&self) -> RendererKind {
        match self {
            Self::GeneralGpu(_) => RendererKind::GeneralGpu,
            Self::Simplified(_) => RendererKind::Simplified,
        }
    }

    fn strategy(&self) -> &dyn DirectRenderer {
        match self {
            Self::GeneralGpu(renderer) => renderer,
            Self::Simplified(renderer) => renderer,
        }
    }

    fn strategy_mut(&mut self) -> &mut dyn DirectRenderer {
        match self {
            Self::GeneralGpu(renderer) => renderer,
            Self::Simplified(renderer) => renderer,
        }
    }
}

impl DirectRenderer for Renderer {
    fn initialize(&mut self) -> RenderResult<()> {
        self.strategy_mut().initialize()
    }

    fn set_visible(&mut self, visible: bool) {
        self.strategy_mut().set_visible(visible);
    }

    fn visible(&self) -> bool {
        self.strategy().visible()
    }

    fn decide_render_pass_allocations_for_frame(&mut self, passes: &[RenderPass]) {
        self.strategy_mut().decide_render_pass_allocations_for_frame(passes);
    }

    fn draw_frame(
        &mut self,
        output: &mut OutputSurface,
        passes: &[RenderPass],
        device_scale_factor: f32,
        viewport: Size,
    ) -> RenderResult<()> {
        self.strategy_mut().draw_frame(output, passes, device_scale_factor, viewport)
    }

    fn swap_buffers(&mut self, output: &mut OutputSurface, latency_info: &[LatencyInfo]) {
        self.strategy_mut().swap_buffers(output, latency_info);
    }

    fn last_frame(&self) -> Option<&DrawnFrame> {
        self.strategy().last_frame()
    }
}

/// Source for materials that sample producer resources or fill a color
///
/// Render pass quads are resolved by each strategy and yield `None` here.
pub(crate) fn resource_source(material: &QuadMaterial) -> Option<QuadSource> {
    match material {
        QuadMaterial::SolidColor(color) => Some(QuadSource::Solid(*color)),
        QuadMaterial::Texture { resource_id, premultiplied_alpha } => Some(QuadSource::Resources {
            ids: vec![*resource_id],
            premultiplied_alpha: *premultiplied_alpha,
        }),
        QuadMaterial::YuvVideo { .. } => Some(QuadSource::Resources {
            ids: material.resources().collect(),
            premultiplied_alpha: false,
        }),
        QuadMaterial::RenderPass { .. } => None,
    }
}

/// Reshape the output if needed, bind it and set the root viewport
pub(crate) fn bind_root_target(gpu: &dyn GpuApi, output: &mut OutputSurface, viewport: Size) -> RenderResult<()> {
    if output.size() != viewport {
        output.reshape(viewport)?;
    }
    if output.capabilities().contains(SurfaceCapabilities::USES_DEFAULT_FRAMEBUFFER) {
        gpu.bind_framebuffer(FramebufferId::DEFAULT);
    } else {
        output.bind_framebuffer()?;
    }
    gpu.viewport(Rect::from_size(viewport));
    gpu.scissor(None);
    Ok(())
}

/// Maps a pass's output space to its target's pixel space
pub(crate) fn target_offset(pass: &RenderPass) -> Mat4 {
    #[allow(clippy::cast_precision_loss)]
    let (x, y) = (pass.output_rect.x as f32, pass.output_rect.y as f32);
    translation(-x, -y)
}
