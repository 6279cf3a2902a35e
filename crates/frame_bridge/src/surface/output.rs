//! Presentation targets for the root pass
//!
//! Onscreen output draws into a framebuffer supplied by the embedder and is
//! presented implicitly by the platform. Offscreen output renders into a ring of
//! native buffers; each swap completes the current buffer and advances the ring.

use std::rc::Rc;

use bitflags::bitflags;

use super::gpu::{FramebufferId, GpuApi, NativeBufferHandle, TextureId};
use crate::core::config::MAX_OFFSCREEN_BUFFERS;
use crate::frame::{LatencyInfo, Size};
use crate::render::{RenderError, RenderResult};

bitflags! {
    /// Properties renderers and the host query before presenting the root pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceCapabilities: u32 {
        /// Draws go to the platform default framebuffer
        const USES_DEFAULT_FRAMEBUFFER = 1 << 0;
        /// Presentation requires an explicit swap
        const BUFFER_RING = 1 << 1;
    }
}

/// Output backed by the embedder's framebuffer
pub struct OnscreenOutputSurface {
    gpu: Rc<dyn GpuApi>,
    framebuffer: FramebufferId,
    size: Size,
}

impl OnscreenOutputSurface {
    fn bind_framebuffer(&self) {
        self.gpu.bind_framebuffer(self.framebuffer);
    }
}

#[derive(Debug, Clone, Copy)]
struct OffscreenBuffer {
    native: NativeBufferHandle,
    texture: TextureId,
}

/// Output backed by a ring of native buffers
pub struct OffscreenOutputSurface {
    gpu: Rc<dyn GpuApi>,
    buffer_count: usize,
    buffers: Vec<OffscreenBuffer>,
    framebuffer: Option<FramebufferId>,
    current: usize,
    rendered: Option<NativeBufferHandle>,
    size: Size,
}

impl OffscreenOutputSurface {
    fn reshape(&mut self, size: Size) -> RenderResult<()> {
        if size == self.size && !self.buffers.is_empty() {
            return Ok(());
        }
        self.release_buffers();
        self.size = size;

        if size.is_empty() {
            return Ok(());
        }

        for index in 0..self.buffer_count {
            match self.allocate_buffer(size) {
                Ok(buffer) => self.buffers.push(buffer),
                Err(err) => {
                    log::error!("Offscreen buffer {index} allocation failed: {err}");
                    self.release_buffers();
                    return Err(err);
                }
            }
        }

        if self.framebuffer.is_none() {
            self.framebuffer = self.gpu.gen_framebuffer();
        }
        if self.framebuffer.is_none() {
            self.release_buffers();
            return Err(RenderError::ResourceCreationFailed("offscreen framebuffer".to_string()));
        }

        log::debug!("Offscreen ring reshaped to {}x{} with {} buffers", size.width, size.height, self.buffers.len());
        Ok(())
    }

    fn allocate_buffer(&self, size: Size) -> RenderResult<OffscreenBuffer> {
        let native = self.gpu.create_native_buffer(size).ok_or_else(|| {
            RenderError::ResourceCreationFailed(format!("native buffer {}x{}", size.width, size.height))
        })?;
        let Some(texture) = self.gpu.create_texture(size) else {
            self.gpu.destroy_native_buffer(native);
            return Err(RenderError::ResourceCreationFailed("offscreen texture".to_string()));
        };
        if !self.gpu.bind_native_buffer_to_texture(native, texture) {
            self.gpu.delete_texture(texture);
            self.gpu.destroy_native_buffer(native);
            return Err(RenderError::BackendError(format!("binding {native:?} to {texture:?} failed")));
        }
        Ok(OffscreenBuffer { native, texture })
    }

    fn release_buffers(&mut self) {
        for buffer in self.buffers.drain(..) {
            self.gpu.delete_texture(buffer.texture);
            self.gpu.destroy_native_buffer(buffer.native);
        }
        self.current = 0;
        self.rendered = None;
    }

    fn bind_framebuffer(&self) -> RenderResult<()> {
        let (Some(framebuffer), Some(buffer)) = (self.framebuffer, self.buffers.get(self.current)) else {
            return Err(RenderError::RenderingFailed("offscreen surface has no buffers".to_string()));
        };
        self.gpu.bind_framebuffer(framebuffer);
        self.gpu.framebuffer_texture(buffer.texture);
        Ok(())
    }

    fn swap_buffers(&mut self) {
        let Some(buffer) = self.buffers.get(self.current) else {
            log::warn!("Swap requested on an offscreen surface without buffers");
            return;
        };
        self.gpu.flush();
        self.rendered = Some(buffer.native);
        self.current = (self.current + 1) % self.buffers.len();
    }
}

impl Drop for OffscreenOutputSurface {
    fn drop(&mut self) {
        self.release_buffers();
        if let Some(framebuffer) = self.framebuffer.take() {
            self.gpu.delete_framebuffer(framebuffer);
        }
    }
}

/// Where the root pass is drawn
pub enum OutputSurface {
    /// Embedder framebuffer, implicit presentation
    Onscreen(OnscreenOutputSurface),
    /// Native buffer ring, explicit swap
    Offscreen(OffscreenOutputSurface),
}

impl OutputSurface {
    /// Onscreen output drawing to the default framebuffer until told otherwise
    pub fn onscreen(gpu: Rc<dyn GpuApi>) -> Self {
        Self::Onscreen(OnscreenOutputSurface { gpu, framebuffer: FramebufferId::DEFAULT, size: Size::default() })
    }

    /// Offscreen output with `buffer_count` buffers, clamped to `1..=MAX_OFFSCREEN_BUFFERS`
    ///
    /// Buffers are allocated on the first reshape.
    pub fn offscreen(gpu: Rc<dyn GpuApi>, buffer_count: usize) -> Self {
        let buffer_count = buffer_count.clamp(1, MAX_OFFSCREEN_BUFFERS);
        Self::Offscreen(OffscreenOutputSurface {
            gpu,
            buffer_count,
            buffers: Vec::with_capacity(buffer_count),
            framebuffer: None,
            current: 0,
            rendered: None,
            size: Size::default(),
        })
    }

    /// Capabilities of this output
    pub fn capabilities(&self) -> SurfaceCapabilities {
        match self {
            Self::Onscreen(surface) if surface.framebuffer == FramebufferId::DEFAULT => {
                SurfaceCapabilities::USES_DEFAULT_FRAMEBUFFER
            }
            Self::Onscreen(_) => SurfaceCapabilities::empty(),
            Self::Offscreen(_) => SurfaceCapabilities::BUFFER_RING,
        }
    }

    /// Current output size
    pub const fn size(&self) -> Size {
        match self {
            Self::Onscreen(surface) => surface.size,
            Self::Offscreen(surface) => surface.size,
        }
    }

    /// Resize the output
    ///
    /// # Errors
    /// Offscreen output returns an error when its buffers cannot be allocated.
    pub fn reshape(&mut self, size: Size) -> RenderResult<()> {
        match self {
            Self::Onscreen(surface) => {
                surface.size = size;
                Ok(())
            }
            Self::Offscreen(surface) => surface.reshape(size),
        }
    }

    /// Framebuffer the embedder wants the root pass drawn into
    pub fn set_framebuffer_id(&mut self, framebuffer: FramebufferId) {
        match self {
            Self::Onscreen(surface) => surface.framebuffer = framebuffer,
            Self::Offscreen(_) => log::debug!("Ignoring framebuffer {framebuffer:?} on offscreen output"),
        }
    }

    /// Framebuffer the root pass is drawn into, if one is available
    pub const fn framebuffer(&self) -> Option<FramebufferId> {
        match self {
            Self::Onscreen(surface) => Some(surface.framebuffer),
            Self::Offscreen(surface) => surface.framebuffer,
        }
    }

    /// Bind the output for drawing the root pass
    ///
    /// # Errors
    /// Offscreen output fails when it has not been reshaped yet.
    pub fn bind_framebuffer(&self) -> RenderResult<()> {
        match self {
            Self::Onscreen(surface) => {
                surface.bind_framebuffer();
                Ok(())
            }
            Self::Offscreen(surface) => surface.bind_framebuffer(),
        }
    }

    /// Complete the current frame
    pub fn swap_buffers(&mut self, latency_info: &[LatencyInfo]) {
        log::trace!("Swap with {} latency entries", latency_info.len());
        match self {
            Self::Onscreen(surface) => surface.gpu.flush(),
            Self::Offscreen(surface) => surface.swap_buffers(),
        }
    }

    /// Buffer completed by the most recent swap
    pub const fn rendered_buffer(&self) -> Option<NativeBufferHandle> {
        match self {
            Self::Onscreen(_) => None,
            Self::Offscreen(surface) => surface.rendered,
        }
    }
}
