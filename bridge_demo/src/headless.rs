//! Headless GPU backend and view
//!
//! Stands in for the platform binding: hands out object names, tracks what is
//! current, and counts the work the host submits.

use std::cell::Cell;
use std::rc::Rc;

use frame_bridge::prelude::*;
use frame_bridge::surface::{
    ContextHandle, ContextSnapshot, FramebufferId, GlesVersion, NativeBufferHandle, QuadDraw, SurfaceHandle, TextureId,
};
use thiserror::Error;

/// Headless setup errors
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// The backend refused to create the view's own pair
    #[error("Headless view could not create its {0}")]
    Setup(&'static str),
}

/// Counters for work submitted to the backend
#[derive(Debug, Default, Clone, Copy)]
pub struct GpuStats {
    pub draws: usize,
    pub clears: usize,
    pub flushes: usize,
    pub live_textures: usize,
    pub live_native_buffers: usize,
}

/// GPU backend that draws nothing
#[derive(Default)]
pub struct HeadlessGpu {
    next_name: Cell<u32>,
    current: Cell<ContextSnapshot>,
    rotation: Cell<i32>,
    stats: Cell<GpuStats>,
}

impl HeadlessGpu {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set_rotation(&self, degrees: i32) {
        log::info!("Display rotated to {degrees} degrees");
        self.rotation.set(degrees);
    }

    pub fn stats(&self) -> GpuStats {
        self.stats.get()
    }

    fn name(&self) -> u32 {
        let name = self.next_name.get().wrapping_add(1);
        self.next_name.set(name);
        name
    }

    fn update(&self, f: impl FnOnce(&mut GpuStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl GpuContext for HeadlessGpu {
    fn create_context(&self, version: GlesVersion) -> Option<ContextHandle> {
        log::debug!("Creating {version:?} context");
        Some(ContextHandle(u64::from(self.name())))
    }

    fn create_surface(&self, size: Size) -> Option<SurfaceHandle> {
        log::debug!("Creating {}x{} surface", size.width, size.height);
        Some(SurfaceHandle(u64::from(self.name())))
    }

    fn destroy_surface(&self, surface: SurfaceHandle) {
        log::debug!("Destroying {surface:?}");
    }

    fn destroy_context(&self, context: ContextHandle) {
        log::debug!("Destroying {context:?}");
    }

    fn make_current(&self, surface: Option<SurfaceHandle>, context: Option<ContextHandle>) -> bool {
        self.current.set(ContextSnapshot { context, surface });
        true
    }

    fn current(&self) -> ContextSnapshot {
        self.current.get()
    }

    fn rotation(&self) -> i32 {
        self.rotation.get()
    }
}

impl GpuApi for HeadlessGpu {
    fn gen_framebuffer(&self) -> Option<FramebufferId> {
        Some(FramebufferId(self.name()))
    }

    fn delete_framebuffer(&self, _framebuffer: FramebufferId) {}

    fn bind_framebuffer(&self, _framebuffer: FramebufferId) {}

    fn create_texture(&self, _size: Size) -> Option<TextureId> {
        self.update(|stats| stats.live_textures += 1);
        Some(TextureId(self.name()))
    }

    fn delete_texture(&self, _texture: TextureId) {
        self.update(|stats| stats.live_textures = stats.live_textures.saturating_sub(1));
    }

    fn framebuffer_texture(&self, _texture: TextureId) {}

    fn create_native_buffer(&self, _size: Size) -> Option<NativeBufferHandle> {
        self.update(|stats| stats.live_native_buffers += 1);
        Some(NativeBufferHandle(u64::from(self.name())))
    }

    fn destroy_native_buffer(&self, _buffer: NativeBufferHandle) {
        self.update(|stats| stats.live_native_buffers = stats.live_native_buffers.saturating_sub(1));
    }

    fn bind_native_buffer_to_texture(&self, _buffer: NativeBufferHandle, _texture: TextureId) -> bool {
        true
    }

    fn viewport(&self, _rect: Rect) {}

    fn scissor(&self, _rect: Option<Rect>) {}

    fn clear(&self, _color: Color) {
        self.update(|stats| stats.clears += 1);
    }

    fn draw_quad(&self, draw: &QuadDraw) {
        log::trace!("Draw {:?} at opacity {:.2}", draw.source, draw.opacity);
        self.update(|stats| stats.draws += 1);
    }

    fn flush(&self) {
        self.update(|stats| stats.flushes += 1);
    }
}

/// View layer double owning a context/surface pair of its own
pub struct HeadlessView {
    pub gpu: Rc<HeadlessGpu>,
    context: ContextHandle,
    surface: SurfaceHandle,
    offscreen: bool,
    acknowledgments: Cell<usize>,
    returned: Cell<usize>,
}

impl HeadlessView {
    pub fn new(gpu: Rc<HeadlessGpu>, offscreen: bool) -> Result<Self, HeadlessError> {
        let context = gpu.create_context(GlesVersion::Gles2).ok_or(HeadlessError::Setup("context"))?;
        let surface = gpu.create_surface(Size::new(800, 480)).ok_or(HeadlessError::Setup("surface"))?;
        Ok(Self {
            gpu,
            context,
            surface,
            offscreen,
            acknowledgments: Cell::new(0),
            returned: Cell::new(0),
        })
    }

    /// Swap acknowledgments received so far
    pub fn acknowledgments(&self) -> usize {
        self.acknowledgments.get()
    }

    /// Resources handed back so far
    pub fn returned(&self) -> usize {
        self.returned.get()
    }
}

impl FrameHostClient for HeadlessView {
    fn gpu_api(&self) -> Rc<dyn GpuApi> {
        self.gpu.clone()
    }

    fn gpu_context(&self) -> Rc<dyn GpuContext> {
        self.gpu.clone()
    }

    fn send_reclaim_resources(&self, surface_id: LocalSurfaceId, resources: Vec<ReturnedResource>) {
        log::debug!("Surface {}: {} resources returned", surface_id.child_sequence, resources.len());
        self.acknowledgments.set(self.acknowledgments.get() + 1);
        self.returned.set(self.returned.get() + resources.len());
    }

    fn make_current(&self) -> bool {
        self.gpu.make_current(Some(self.surface), Some(self.context))
    }

    fn clear_browser_frame(&self, color: Color) {
        let color = if color.is_transparent() { Color::BLACK } else { color };
        log::trace!("Clear to rgb({}, {}, {})", color.red(), color.green(), color.blue());
        self.gpu.clear(color);
    }

    fn offscreen_rendering_enabled(&self) -> bool {
        self.offscreen
    }
}
