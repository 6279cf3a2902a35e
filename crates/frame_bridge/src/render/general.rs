//! General GPU renderer
//!
//! Every non-root pass is drawn into its own texture-backed framebuffer, passes
//! are drawn bottom-up, and render pass quads sample the texture of the pass
//! they reference. Targets survive across frames while the pass id and size
//! stay the same.

use std::collections::HashMap;
use std::rc::Rc;

use super::renderer::{bind_root_target, resource_source, target_offset, DirectRenderer, DrawnFrame};
use super::{RenderError, RenderResult};
use crate::frame::{Color, LatencyInfo, QuadMaterial, Rect, RenderPass, RenderPassId, Size};
use crate::surface::{FramebufferId, GpuApi, OutputSurface, QuadDraw, QuadSource, TextureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderTarget {
    framebuffer: FramebufferId,
    texture: TextureId,
    size: Size,
}

/// Renderer with one intermediate target per non-root pass
pub struct GeneralGpuRenderer {
    gpu: Rc<dyn GpuApi>,
    visible: bool,
    render_targets: HashMap<RenderPassId, RenderTarget>,
    last_frame: Option<DrawnFrame>,
}

impl GeneralGpuRenderer {
    /// Create a renderer drawing through `gpu`
    pub fn new(gpu: Rc<dyn GpuApi>) -> Self {
        Self {
            gpu,
            visible: false,
            render_targets: HashMap::new(),
            last_frame: None,
        }
    }

    /// Number of intermediate targets currently allocated
    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    /// Whether a target exists for the pass
    pub fn has_render_target(&self, pass_id: RenderPassId) -> bool {
        self.render_targets.contains_key(&pass_id)
    }

    fn allocate_target(&self, size: Size) -> RenderResult<RenderTarget> {
        let texture = self
            .gpu
            .create_texture(size)
            .ok_or_else(|| {
                RenderError::ResourceCreationFailed(format!("{}x{} pass texture", size.width, size.height))
            })?;
        let Some(framebuffer) = self.gpu.gen_framebuffer() else {
            self.gpu.delete_texture(texture);
            return Err(RenderError::ResourceCreationFailed("pass framebuffer".to_string()));
        };
        self.gpu.bind_framebuffer(framebuffer);
        self.gpu.framebuffer_texture(texture);
        Ok(RenderTarget { framebuffer, texture, size })
    }

    fn release_target(&self, target: RenderTarget) {
        self.gpu.delete_framebuffer(target.framebuffer);
        self.gpu.delete_texture(target.texture);
    }

    fn draw_pass_quads(&self, pass: &RenderPass) -> usize {
        let offset = target_offset(pass);
        let mut drawn = 0;

        for quad in &pass.quads {
            let Some(state) = pass.shared_quad_state_for(quad) else {
                log::warn!("Quad in pass {:?} references missing shared state {}", pass.id, quad.shared_quad_state);
                continue;
            };

            let source = match &quad.material {
                QuadMaterial::RenderPass { pass_id, mask_resource_id } => match self.render_targets.get(pass_id) {
                    Some(target) => QuadSource::RenderTarget { texture: target.texture, mask: *mask_resource_id },
                    None => {
                        log::warn!("Pass {:?} samples pass {pass_id:?} which has no target", pass.id);
                        continue;
                    }
                },
                material => match resource_source(material) {
                    Some(source) => source,
                    None => continue,
                },
            };

            let clip = state.clip_rect;
            self.gpu.scissor(clip);
            self.gpu.draw_quad(&QuadDraw {
                transform: offset * state.quad_to_target_transform,
                rect: quad.rect,
                visible_rect: quad.visible_rect,
                clip,
                opacity: state.opacity,
                source,
            });
            drawn += 1;
        }

        drawn
    }
}

impl DirectRenderer for GeneralGpuRenderer {
    fn initialize(&mut self) -> RenderResult<()> {
        log::info!("General GPU renderer initialized");
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn decide_render_pass_allocations_for_frame(&mut self, passes: &[RenderPass]) {
        let Some((_, non_root)) = passes.split_last() else {
            return;
        };
        let required: HashMap<RenderPassId, Size> =
            non_root.iter().map(|pass| (pass.id, pass.output_rect.size())).collect();

        let stale: Vec<RenderPassId> = self
            .render_targets
            .iter()
            .filter(|(id, target)| required.get(*id) != Some(&target.size))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            if let Some(target) = self.render_targets.remove(&id) {
                log::trace!("Releasing target of pass {id:?}");
                self.release_target(target);
            }
        }

        for (id, size) in required {
            if self.render_targets.contains_key(&id) || size.is_empty() {
                continue;
            }
            match self.allocate_target(size) {
                Ok(target) => {
                    self.render_targets.insert(id, target);
                }
                Err(err) => log::error!("No render target for pass {id:?}: {err}"),
            }
        }
    }

    fn draw_frame(
        &mut self,
        output: &mut OutputSurface,
        passes: &[RenderPass],
        device_scale_factor: f32,
        viewport: Size,
    ) -> RenderResult<()> {
        let Some((root, non_root)) = passes.split_last() else {
            return Err(RenderError::RenderingFailed("pass list has no root pass".to_string()));
        };
        if !self.visible {
            log::debug!("Renderer invisible, skipping frame");
            return Ok(());
        }

        let mut passes_drawn = 0;
        let mut quads_drawn = 0;
        for pass in non_root {
            let Some(target) = self.render_targets.get(&pass.id).copied() else {
                log::warn!("Pass {:?} has no render target, skipping", pass.id);
                continue;
            };
            self.gpu.bind_framebuffer(target.framebuffer);
            self.gpu.viewport(Rect::from_size(target.size));
            self.gpu.scissor(None);
            self.gpu.clear(Color::TRANSPARENT);
            quads_drawn += self.draw_pass_quads(pass);
            passes_drawn += 1;
        }

        bind_root_target(self.gpu.as_ref(), output, viewport)?;
        quads_drawn += self.draw_pass_quads(root);
        passes_drawn += 1;
        self.gpu.flush();

        log::trace!("Drew {passes_drawn} passes, {quads_drawn} quads at {}x{}", viewport.width, viewport.height);
        self.last_frame = Some(DrawnFrame {
            viewport,
            device_scale_factor,
            root_output_rect: root.output_rect,
            passes_drawn,
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

impl Drop for GeneralGpuRenderer {
    fn drop(&mut self) {
        let targets: Vec<RenderTarget> = self.render_targets.drain().map(|(_, target)| target).collect();
        for target in targets {
            self.release_target(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::translation;
    use crate::frame::{DrawQuad, ResourceId, SharedQuadState};
    use crate::test_support::{GpuCall, RecordingGpu};

    fn pass_with_texture(id: u64, size: i32, resource: u32) -> RenderPass {
        let mut pass = RenderPass::new(RenderPassId(id), Rect::new(0, 0, size, size));
        let sqs = pass.add_shared_quad_state(SharedQuadState::default());
        pass.add_quad(DrawQuad::new(
            Rect::new(0, 0, size, size),
            sqs,
            QuadMaterial::Texture { resource_id: ResourceId(resource), premultiplied_alpha: true },
        ));
        pass
    }

    fn root_sampling(children: &[u64]) -> RenderPass {
        let mut root = RenderPass::new(RenderPassId(100), Rect::new(0, 0, 800, 480));
        let sqs = root.add_shared_quad_state(SharedQuadState::new(translation(10.0, 20.0), Rect::new(0, 0, 64, 64)));
        for &child in children {
            root.add_quad(DrawQuad::new(
                Rect::new(0, 0, 64, 64),
                sqs,
                QuadMaterial::RenderPass { pass_id: RenderPassId(child), mask_resource_id: None },
            ));
        }
        root
    }

    fn visible_renderer(gpu: &Rc<RecordingGpu>) -> GeneralGpuRenderer {
        let mut renderer = GeneralGpuRenderer::new(gpu.clone());
        renderer.initialize().unwrap();
        renderer.set_visible(true);
        renderer
    }

    #[test]
    fn test_one_target_per_non_root_pass() {
        let gpu = RecordingGpu::new();
        let mut renderer = visible_renderer(&gpu);
        let passes = vec![pass_with_texture(1, 64, 5), pass_with_texture(2, 32, 6), root_sampling(&[1, 2])];

        renderer.decide_render_pass_allocations_for_frame(&passes);

        assert_eq!(renderer.render_target_count(), 2);
        assert!(renderer.has_render_target(RenderPassId(1)));
        assert!(renderer.has_render_target(RenderPassId(2)));
        assert!(!renderer.has_render_target(RenderPassId(100)));
    }

    #[test]
    fn test_vanished_and_resized_passes_release_targets() {
        let gpu = RecordingGpu::new();
        let mut renderer = visible_renderer(&gpu);
        renderer.decide_render_pass_allocations_for_frame(&[
            pass_with_texture(1, 64, 5),
            pass_with_texture(2, 32, 6),
            root_sampling(&[1, 2]),
        ]);

        renderer.decide_render_pass_allocations_for_frame(&[pass_with_texture(1, 128, 5), root_sampling(&[1])]);

        assert_eq!(renderer.render_target_count(), 1);
        assert_eq!(gpu.live_textures(), 1);
        assert_eq!(gpu.live_framebuffers(), 1);
        assert!(gpu.calls().contains(&GpuCall::CreateTexture(Size::new(128, 128))));
    }

    #[test]
    fn test_draws_bottom_up_and_samples_targets() {
        let gpu = RecordingGpu::new();
        let mut renderer = visible_renderer(&gpu);
        let mut output = OutputSurface::onscreen(gpu.clone());
        let passes = vec![pass_with_texture(1, 64, 5), root_sampling(&[1])];

        renderer.decide_render_pass_allocations_for_frame(&passes);
        renderer.draw_frame(&mut output, &passes, 1.0, Size::new(800, 480)).unwrap();

        let draws = gpu.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(
            draws[0].1.source,
            QuadSource::Resources { ids: vec![ResourceId(5)], premultiplied_alpha: true }
        );
        assert_ne!(draws[0].0, FramebufferId::DEFAULT);
        assert_eq!(draws[1].0, FramebufferId::DEFAULT);
        assert!(matches!(draws[1].1.source, QuadSource::RenderTarget { .. }));
        assert_eq!(draws[1].1.transform, translation(10.0, 20.0));

        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.passes_drawn, 2);
        assert_eq!(frame.quads_drawn, 2);
        assert_eq!(output.size(), Size::new(800, 480));
    }

    #[test]
    fn test_missing_target_skips_quad() {
        let gpu = RecordingGpu::new();
        let mut renderer = visible_renderer(&gpu);
        let mut output = OutputSurface::onscreen(gpu.clone());

        renderer.draw_frame(&mut output, &[root_sampling(&[9])], 1.0, Size::new(100, 100)).unwrap();

        assert!(gpu.draws().is_empty());
        assert_eq!(renderer.last_frame().unwrap().quads_drawn, 0);
    }

    #[test]
    fn test_empty_pass_list_is_an_error() {
        let gpu = RecordingGpu::new();
        let mut renderer = visible_renderer(&gpu);
        let mut output = OutputSurface::onscreen(gpu.clone());

        assert!(renderer.draw_frame(&mut output, &[], 1.0, Size::new(10, 10)).is_err());
    }

    #[test]
    fn test_invisible_renderer_draws_nothing() {
        let gpu = RecordingGpu::new();
        let mut renderer = GeneralGpuRenderer::new(gpu.clone());
        let mut output = OutputSurface::onscreen(gpu.clone());

        renderer.draw_frame(&mut output, &[pass_with_texture(1, 8, 5)], 1.0, Size::new(8, 8)).unwrap();

        assert!(gpu.draws().is_empty());
        assert!(renderer.last_frame().is_none());
    }

    #[test]
    fn test_drop_releases_targets() {
        let gpu = RecordingGpu::new();
        let mut renderer = visible_renderer(&gpu);
        renderer.decide_render_pass_allocations_for_frame(&[pass_with_texture(1, 64, 5), root_sampling(&[1])]);

        drop(renderer);

        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.live_framebuffers(), 0);
    }
}
