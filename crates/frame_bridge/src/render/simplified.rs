//! Simplified renderer
//!
//! Draws straight into the output surface. A render pass quad is replaced by
//! the quads of the pass it references, with transforms concatenated and
//! opacities multiplied, so no intermediate targets are ever allocated. Masks
//! and filters on nested passes are not applied.

use std::collections::HashMap;
use std::rc::Rc;

use super::renderer::{bind_root_target, resource_source, target_offset, DirectRenderer, DrawnFrame};
use super::{RenderError, RenderResult};
use crate::foundation::math::Mat4;
use crate::frame::{LatencyInfo, QuadMaterial, Rect, RenderPass, RenderPassId, Size};
use crate::surface::{GpuApi, OutputSurface, QuadDraw};

/// Inherited state while walking into nested passes
#[derive(Debug, Clone, Copy)]
struct Inherited {
    transform: Mat4,
    opacity: f32,
    /// `None` at the root level, where each quad's own clip applies
    clip: Option<Option<Rect>>,
}

/// Renderer without intermediate targets
pub struct SimplifiedRenderer {
    gpu: Rc<dyn GpuApi>,
    visible: bool,
    last_frame: Option<DrawnFrame>,
}

impl SimplifiedRenderer {
    /// Create a renderer drawing through `gpu`
    pub fn new(gpu: Rc<dyn GpuApi>) -> Self {
        Self { gpu, visible: false, last_frame: None }
    }

    fn draw_flattened(
        &self,
        pass: &RenderPass,
        inherited: Inherited,
        passes: &HashMap<RenderPassId, &RenderPass>,
        visiting: &mut Vec<RenderPassId>,
    ) -> usize {
        visiting.push(pass.id);
        let mut drawn = 0;

        for quad in &pass.quads {
            let Some(state) = pass.shared_quad_state_for(quad) else {
                log::warn!("Quad in pass {:?} references missing shared state {}", pass.id, quad.shared_quad_state);
                continue;
            };
            let transform = inherited.transform * state.quad_to_target_transform;
            let opacity = inherited.opacity * state.opacity;
            let clip = inherited.clip.unwrap_or(state.clip_rect);

            if let QuadMaterial::RenderPass { pass_id, mask_resource_id } = &quad.material {
                if visiting.contains(pass_id) {
                    log::warn!("Render pass cycle through {pass_id:?}, skipping quad");
                    continue;
                }
                let Some(nested) = passes.get(pass_id) else {
                    log::warn!("Pass {:?} references unknown pass {pass_id:?}", pass.id);
                    continue;
                };
                if mask_resource_id.is_some() {
                    log::trace!("Mask on pass {pass_id:?} ignored while flattening");
                }
                let nested_state = Inherited {
                    transform: transform * target_offset(nested),
                    opacity,
                    clip: Some(clip),
                };
                drawn += self.draw_flattened(nested, nested_state, passes, visiting);
                continue;
            }

            let Some(source) = resource_source(&quad.material) else {
                continue;
            };
            self.gpu.scissor(clip);
            self.gpu.draw_quad(&QuadDraw {
                transform,
                rect: quad.rect,
                visible_rect: quad.visible_rect,
                clip,
                opacity,
                source,
            });
            drawn += 1;
        }

        visiting.pop();
        drawn
    }
}

impl DirectRenderer for SimplifiedRenderer {
    fn initialize(&mut self) -> RenderResult<()> {
        log::info!("Simplified renderer initialized");
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn decide_render_pass_allocations_for_frame(&mut self, passes: &[RenderPass]) {
        log::trace!("Flattening renderer needs no targets for {} passes", passes.len());
    }

    fn draw_frame(
        &mut self,
        output: &mut OutputSurface,
        passes: &[RenderPass],
        device_scale_factor: f32,
        viewport: Size,
    ) -> RenderResult<()> {
        let Some(root) = passes.last() else {
            return Err(RenderError::RenderingFailed("pass list has no root pass".to_string()));
        };
        if !self.visible {
            log::debug!("Renderer invisible, skipping frame");
            return Ok(());
        }

        bind_root_target(self.gpu.as_ref(), output, viewport)?;

        let by_id: HashMap<RenderPassId, &RenderPass> = passes.iter().map(|pass| (pass.id, pass)).collect();
        let root_state = Inherited { transform: target_offset(root), opacity: 1.0, clip: None };
        let quads_drawn = self.draw_flattened(root, root_state, &by_id, &mut Vec::new());
        self.gpu.flush();

        self.last_frame = Some(DrawnFrame {
            viewport,
            device_scale_factor,
            root_output_rect: root.output_rect,
            passes_drawn: 1,
            quads_drawn,
        });
        Ok(())
    }

    fn swap_buffers(&mut self, output: &mut OutputSurface, latency_info: &[LatencyInfo]) {
        output.swap_buffers(latency_info);
    }

    fn last_frame(&self) -> Option<&DrawnFrame> {
        self.last_frame.as_ref()
    }
}
