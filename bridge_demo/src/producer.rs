//! Synthetic frame producer
//!
//! Emits frames shaped like a renderer's output: a tile pass with a handful of
//! textured quads, composited into the root pass through a render pass quad.

use frame_bridge::foundation::math::{scale, translation};
use frame_bridge::prelude::*;
use rand::prelude::*;

const TILE_SIZE: i32 = 64;
const TILE_PASS: RenderPassId = RenderPassId(1);
const ROOT_PASS: RenderPassId = RenderPassId(2);

/// Generates frames for one producer surface
pub struct FrameProducer {
    rng: StdRng,
    viewport: Size,
    next_resource: u32,
    frame_number: u32,
}

impl FrameProducer {
    pub fn new(viewport: Size, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            viewport,
            next_resource: 1,
            frame_number: 0,
        }
    }

    /// Surface id the frames are submitted for
    pub fn surface_id(&self) -> LocalSurfaceId {
        LocalSurfaceId::new(1, 1, 0xB51D_6E00)
    }

    /// Next well-formed frame
    pub fn next_frame(&mut self) -> CompositorFrame {
        self.frame_number += 1;
        let tile_count = self.rng.gen_range(1..=6);
        let resources: Vec<TransferableResource> = (0..tile_count)
            .map(|_| {
                let id = ResourceId(self.next_resource);
                self.next_resource += 1;
                let mut resource = TransferableResource::new(id, Size::new(TILE_SIZE, TILE_SIZE));
                resource.sync_token = SyncToken::new(1, u64::from(self.frame_number));
                resource
            })
            .collect();

        let tile_pass = self.tile_pass(&resources);
        let root = self.root_pass();
        let metadata = FrameMetadata {
            root_background_color: Color::from_argb(0xFF, self.rng.gen(), self.rng.gen(), self.rng.gen()),
            device_scale_factor: 1.0,
        };
        CompositorFrame::new(vec![tile_pass, root], resources, metadata)
    }

    /// A frame whose quads reference a resource that was never offered
    pub fn corrupt_frame(&mut self) -> CompositorFrame {
        let mut frame = self.next_frame();
        let bogus = ResourceId(u32::MAX - self.frame_number);
        if let Some(tile_pass) = frame.render_passes.first_mut() {
            let sqs = tile_pass.add_shared_quad_state(SharedQuadState::default());
            tile_pass.add_quad(DrawQuad::new(
                Rect::new(0, 0, TILE_SIZE, TILE_SIZE),
                sqs,
                QuadMaterial::Texture { resource_id: bogus, premultiplied_alpha: true },
            ));
        }
        log::debug!("Frame {} references unknown resource {bogus}", self.frame_number);
        frame
    }

    fn tile_pass(&mut self, resources: &[TransferableResource]) -> RenderPass {
        let columns = (self.viewport.width / TILE_SIZE).max(1);
        let mut pass = RenderPass::new(TILE_PASS, Rect::new(0, 0, TILE_SIZE * columns, TILE_SIZE * 2));
        for (index, resource) in resources.iter().enumerate() {
            let index = i32::try_from(index).unwrap_or(i32::MAX);
            let x = (index % columns) * TILE_SIZE;
            let y = (index / columns) * TILE_SIZE;
            let mut state = SharedQuadState::new(
                translation(x as f32, y as f32),
                Rect::new(0, 0, TILE_SIZE, TILE_SIZE),
            );
            state.opacity = self.rng.gen_range(0.5..=1.0);
            let sqs = pass.add_shared_quad_state(state);
            pass.add_quad(DrawQuad::new(
                Rect::new(0, 0, TILE_SIZE, TILE_SIZE),
                sqs,
                QuadMaterial::Texture { resource_id: resource.id, premultiplied_alpha: self.rng.gen_bool(0.5) },
            ));
        }
        pass
    }

    fn root_pass(&mut self) -> RenderPass {
        let mut root = RenderPass::new(ROOT_PASS, Rect::from_size(self.viewport));

        let background = root.add_shared_quad_state(SharedQuadState::new(
            scale(self.viewport.width as f32, self.viewport.height as f32),
            Rect::new(0, 0, 1, 1),
        ));
        let zoom = self.rng.gen_range(1.0..2.0);
        let mut tiles = SharedQuadState::new(translation(16.0, 16.0) * scale(zoom, zoom), Rect::new(0, 0, 1, 1));
        tiles.clip_rect = Some(Rect::from_size(self.viewport));
        let tiles = root.add_shared_quad_state(tiles);

        root.add_quad(DrawQuad::new(
            Rect::new(0, 0, TILE_SIZE, TILE_SIZE * 2),
            tiles,
            QuadMaterial::RenderPass { pass_id: TILE_PASS, mask_resource_id: None },
        ));
        root.add_quad(DrawQuad::new(Rect::new(0, 0, 1, 1), background, QuadMaterial::SolidColor(Color::WHITE)));
        root
    }
}
