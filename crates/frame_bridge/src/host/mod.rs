//! # Delegated Frame Host
//!
//! Ingests compositor frames from a remote producer, keeps exactly one
//! canonical frame and presents it through the selected renderer.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Ready --destroy--> Destroyed
//!                                 |  ^
//!                  swap / render  +--+
//! ```
//!
//! Swap and render are no-ops outside `Ready`. Every swap ends with exactly one
//! acknowledgment to the client carrying every resource returned since the
//! previous one.

use std::cell::RefCell;
use std::rc::Rc;

use crate::frame::{
    copy_all, ChildId, Color, CompositorFrame, LocalSurfaceId, Rect, RenderPass, RenderPassList, ResourceIdSet,
    ReturnedResource,
};
use crate::render::renderer::DrawnFrame;
use crate::render::rotation::transform_root_render_pass;
use crate::render::{DirectRenderer, RenderError, RenderResult, Renderer, RendererKind, Rotation};
use crate::resources::{ResourceProvider, ResourceTranslationTable, ReturnCallback};
use crate::surface::{
    FramebufferId, GpuApi, GpuContext, NativeBufferHandle, OutputSurface, SurfaceBridge, SurfaceCapabilities,
};


/// Services the view layer provides to the host
pub trait FrameHostClient {
    /// GPU function table used for drawing
    fn gpu_api(&self) -> Rc<dyn GpuApi>;

    /// Platform binding the host creates its context on
    fn gpu_context(&self) -> Rc<dyn GpuContext>;

    /// Acknowledge a swap, handing back resources the display no longer uses
    fn send_reclaim_resources(&self, surface_id: LocalSurfaceId, resources: Vec<ReturnedResource>);

    /// Bind the view's context and surface; `false` skips the current operation
    fn make_current(&self) -> bool;

    /// Fill the presentation target with a solid color
    ///
    /// Implementations may substitute their own background when `color` is
    /// fully transparent.
    fn clear_browser_frame(&self, color: Color);

    /// Route presentation through an offscreen buffer ring with explicit swaps
    fn offscreen_rendering_enabled(&self) -> bool {
        false
    }

    /// Device independent pixel scale of the display
    fn dip_scale(&self) -> f32 {
        1.0
    }
}

/// Runtime settings for a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHostSettings {
    /// Try a GLES 3 context before GLES 2
    pub prefer_gles3: bool,
    /// Offscreen ring size, used only in offscreen mode
    pub offscreen_buffer_count: usize,
}

impl Default for FrameHostSettings {
    fn default() -> Self {
        Self {
            prefer_gles3: true,
            offscreen_buffer_count: 3,
        }
    }
}

/// Everything that exists only while the host is ready
struct GpuState {
    surface_bridge: SurfaceBridge,
    output_surface: OutputSurface,
    renderer: Renderer,
    child: ChildId,
}

/// Browser-side host for delegated compositor frames
pub struct DelegatedFrameHost {
    client: Rc<dyn FrameHostClient>,
    settings: FrameHostSettings,
    resource_table: ResourceTranslationTable,
    gpu: Option<GpuState>,
    destroyed: bool,

    render_passes: RenderPassList,
    resources_in_frame: ResourceIdSet,
    background_color: Color,
    returned_resources: Rc<RefCell<Vec<ReturnedResource>>>,
    last_surface_id: Option<LocalSurfaceId>,
}

impl DelegatedFrameHost {
    /// Create an uninitialized host
    pub fn new(
        client: Rc<dyn FrameHostClient>,
        resource_provider: Box<dyn ResourceProvider>,
        settings: FrameHostSettings,
    ) -> Self {
        Self {
            client,
            settings,
            resource_table: ResourceTranslationTable::new(resource_provider),
            gpu: None,
            destroyed: false,
            render_passes: RenderPassList::new(),
            resources_in_frame: ResourceIdSet::new(),
            background_color: Color::TRANSPARENT,
            returned_resources: Rc::new(RefCell::new(Vec::new())),
            last_surface_id: None,
        }
    }

    /// Bring the host to the ready state
    ///
    /// # Panics
    /// Panics when the GPU context or renderer cannot be created; rendering is
    /// impossible without them.
    pub fn initialize(&mut self, kind: RendererKind) {
        if let Err(err) = self.try_initialize(kind) {
            log::error!("Delegated frame host initialization failed: {err}");
            panic!("delegated frame host initialization failed: {err}");
        }
    }

    /// Bring the host to the ready state, reporting environment failures
    ///
    /// Creates the context/surface pair, the output surface, the child
    /// registration and the renderer, in that order.
    ///
    /// # Errors
    /// Returns the first failure; nothing created before it is kept.
    pub fn try_initialize(&mut self, kind: RendererKind) -> RenderResult<()> {
        debug_assert!(self.gpu.is_none(), "delegated frame host initialized twice");
        if self.gpu.is_some() {
            return Ok(());
        }
        if self.destroyed {
            return Err(RenderError::InitializationFailed("host has been torn down".to_string()));
        }

        let surface_bridge = SurfaceBridge::new(self.client.gpu_context(), self.settings.prefer_gles3)?;

        let gpu_api = self.client.gpu_api();
        let output_surface = if self.client.offscreen_rendering_enabled() {
            OutputSurface::offscreen(Rc::clone(&gpu_api), self.settings.offscreen_buffer_count)
        } else {
            OutputSurface::onscreen(Rc::clone(&gpu_api))
        };

        let child = self.resource_table.register_child(self.return_callback());

        let mut renderer = Renderer::new(kind, gpu_api);
        if let Err(err) = renderer.initialize() {
            self.resource_table.unregister_child(child);
            return Err(RenderError::InitializationFailed(format!("{kind:?} renderer: {err}")));
        }
        renderer.set_visible(true);

        let buffer_ring = output_surface.capabilities().contains(SurfaceCapabilities::BUFFER_RING);
        let presentation = if buffer_ring { "offscreen" } else { "onscreen" };
        log::info!("Delegated frame host ready: {kind:?} renderer, {presentation} output, {child}");
        self.gpu = Some(GpuState { surface_bridge, output_surface, renderer, child });
        Ok(())
    }

    fn return_callback(&self) -> ReturnCallback {
        let pending = Rc::downgrade(&self.returned_resources);
        Box::new(move |resources: &[ReturnedResource]| {
            if let Some(pending) = pending.upgrade() {
                pending.borrow_mut().extend_from_slice(resources);
            }
        })
    }

    /// Ingest a frame from the producer
    ///
    /// The frame replaces the canonical one only if every resource its quads
    /// reference has a local mapping; otherwise it is dropped whole and the
    /// previous frame stays. Either way the provider learns which resources
    /// the canonical frame uses, and the client receives one acknowledgment.
    pub fn swap_delegated_frame(&mut self, surface_id: LocalSurfaceId, frame: CompositorFrame) {
        debug_assert!(!frame.render_passes.is_empty(), "producer sent a frame without render passes");
        self.ingest_frame(surface_id, frame);
    }

    /// Swap body; a frame without passes is rejected like any invalid frame
    fn ingest_frame(&mut self, surface_id: LocalSurfaceId, frame: CompositorFrame) {
        let Some(gpu) = self.gpu.as_ref() else {
            log::debug!("Ignoring frame swap before initialization");
            return;
        };
        let child = gpu.child;
        self.last_surface_id = Some(surface_id);

        let CompositorFrame { mut render_passes, resources, metadata } = frame;
        self.resource_table.ingest_resource_list(child, &resources);

        let accepted = if render_passes.is_empty() {
            log::error!("Rejecting frame without render passes");
            None
        } else {
            match self.resource_table.translate_render_passes(child, &mut render_passes) {
                Ok(used) => Some(used),
                Err(err) => {
                    log::error!("Rejecting frame, keeping the previous one: {err}");
                    None
                }
            }
        };

        if let Some(used) = accepted {
            log::trace!("Accepted frame: {} passes, {} resources", render_passes.len(), used.len());
            self.render_passes = render_passes;
            self.resources_in_frame = used;
            self.background_color = metadata.root_background_color;
        }

        self.declare_used_resources();
        self.send_returned_resources(surface_id);
    }

    /// Draw the canonical frame into `bounds`
    ///
    /// With no canonical frame the client is asked to clear to transparent and
    /// nothing is drawn.
    pub fn render_delegated_frame(&mut self, bounds: Rect) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        if self.render_passes.is_empty() {
            self.client.clear_browser_frame(Color::TRANSPARENT);
            return;
        }
        self.client.clear_browser_frame(self.background_color);

        let mut passes = copy_all(&self.render_passes);
        let degrees = gpu.surface_bridge.gpu().rotation();
        let rotation = Rotation::from_degrees(degrees).unwrap_or_else(|| {
            log::warn!("Unsupported display rotation {degrees}, drawing upright");
            Rotation::Deg0
        });
        if let Some(root) = passes.last_mut() {
            transform_root_render_pass(root, bounds, rotation);
        }

        let client = Rc::clone(&self.client);
        let _restore = match gpu.surface_bridge.scoped_current_with(|| client.make_current()) {
            Ok(restore) => restore,
            Err(err) => {
                log::error!("Skipping frame: {err}");
                return;
            }
        };

        let viewport = bounds.size();
        gpu.renderer.decide_render_pass_allocations_for_frame(&passes);
        if let Err(err) = gpu.renderer.draw_frame(&mut gpu.output_surface, &passes, client.dip_scale(), viewport) {
            log::error!("Frame draw failed: {err}");
            return;
        }

        if gpu.output_surface.capabilities().contains(SurfaceCapabilities::BUFFER_RING) {
            gpu.renderer.swap_buffers(&mut gpu.output_surface, &[]);
        }
    }

    /// Framebuffer the embedder wants the root pass drawn into
    pub fn set_framebuffer_id(&mut self, framebuffer: FramebufferId) {
        match self.gpu.as_mut() {
            Some(gpu) => gpu.output_surface.set_framebuffer_id(framebuffer),
            None => log::debug!("Ignoring framebuffer {framebuffer:?} before initialization"),
        }
    }

    /// Drop the canonical frame and hand every resource back to the producer
    ///
    /// Uses the surface id of the last swap; does nothing if none was valid.
    pub fn clear_all_resources(&mut self) {
        if self.gpu.is_none() {
            return;
        }
        let Some(surface_id) = self.last_surface_id.filter(LocalSurfaceId::is_valid) else {
            return;
        };

        log::debug!("Clearing all resources of the current frame");
        self.render_passes.clear();
        self.resources_in_frame.clear();
        self.declare_used_resources();
        self.send_returned_resources(surface_id);
    }

    /// Buffer completed by the most recent offscreen swap
    pub fn rendered_offscreen_buffer(&self) -> Option<NativeBufferHandle> {
        self.gpu.as_ref().and_then(|gpu| gpu.output_surface.rendered_buffer())
    }

    /// Tear the host down
    ///
    /// Retires the canonical frame's resources, then releases the renderer, the
    /// child registration, the output surface and the context/surface pair, in
    /// that order. Only the first call does any work. Resources returned during
    /// teardown are not acknowledged to the client.
    pub fn destroy(&mut self) {
        let Some(gpu) = self.gpu.take() else {
            return;
        };
        self.destroyed = true;
        let GpuState { surface_bridge, output_surface, renderer, child } = gpu;
        log::info!("Tearing down delegated frame host ({child})");

        self.render_passes.clear();
        self.resources_in_frame.clear();

        let client = Rc::clone(&self.client);
        let restore = surface_bridge.scoped_current_with(|| client.make_current());
        if let Err(err) = &restore {
            log::warn!("Releasing GPU objects without a current context: {err}");
        }
        self.resource_table.declare_used(child, &self.resources_in_frame);
        drop(renderer);
        self.resource_table.unregister_child(child);
        drop(output_surface);
        drop(restore);
        drop(surface_bridge);

        let discarded = std::mem::take(&mut *self.returned_resources.borrow_mut());
        if !discarded.is_empty() {
            log::debug!("Discarding {} returns produced during teardown", discarded.len());
        }
    }

    /// True between initialization and teardown
    pub const fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Background color of the canonical frame
    pub const fn background_color(&self) -> Color {
        self.background_color
    }

    /// Whether a canonical frame exists
    pub fn has_frame(&self) -> bool {
        !self.render_passes.is_empty()
    }

    /// Canonical pass list, with local resource ids
    pub fn render_passes(&self) -> &[RenderPass] {
        &self.render_passes
    }

    /// Producer ids the canonical frame references
    pub const fn resources_in_frame(&self) -> &ResourceIdSet {
        &self.resources_in_frame
    }

    /// Child registration, while ready
    pub fn child_id(&self) -> Option<ChildId> {
        self.gpu.as_ref().map(|gpu| gpu.child)
    }

    /// Renderer strategy, while ready
    pub fn renderer_kind(&self) -> Option<RendererKind> {
        self.gpu.as_ref().map(|gpu| gpu.renderer.kind())
    }

    /// Summary of the last frame the renderer drew
    pub fn last_drawn_frame(&self) -> Option<&DrawnFrame> {
        self.gpu.as_ref().and_then(|gpu| gpu.renderer.last_frame())
    }

    fn declare_used_resources(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        let client = Rc::clone(&self.client);
        match gpu.surface_bridge.scoped_current_with(|| client.make_current()) {
            Ok(_restore) => self.resource_table.declare_used(gpu.child, &self.resources_in_frame),
            Err(err) => log::error!("Skipping resource release: {err}"),
        }
    }

    fn send_returned_resources(&self, surface_id: LocalSurfaceId) {
        let returned = std::mem::take(&mut *self.returned_resources.borrow_mut());
        log::trace!("Acknowledging swap with {} returned resources", returned.len());
        self.client.send_reclaim_resources(surface_id, returned);
    }
}

impl Drop for DelegatedFrameHost {
    fn drop(&mut self) {
        self.destroy();
    }
}
