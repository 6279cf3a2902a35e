//! GPU binding contracts
//!
//! Two traits split the platform GPU binding the same way an EGL-style stack
//! does: [`GpuContext`] owns contexts and surfaces and answers "what is current",
//! while [`GpuApi`] is the function table renderers and output surfaces issue
//! draw work through. Both are object safe and take `&self`; implementations
//! keep their state behind interior mutability, like the GL state machine they
//! front.

use crate::foundation::math::Mat4;
use crate::frame::{Color, Rect, ResourceId, Size};

/// Handle to a platform GPU context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Handle to a platform drawable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Framebuffer object name; `0` is the platform default framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    /// The platform default framebuffer
    pub const DEFAULT: Self = Self(0);
}

/// Texture object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle to a platform native buffer (tbm/gralloc style)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeBufferHandle(pub u64);

/// Requested client API version for context creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlesVersion {
    /// OpenGL ES 2.0
    Gles2,
    /// OpenGL ES 3.x
    Gles3,
}

/// Context and surface bound at some instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextSnapshot {
    /// Current context, if any
    pub context: Option<ContextHandle>,
    /// Current draw surface, if any
    pub surface: Option<SurfaceHandle>,
}

/// What a single draw samples
#[derive(Debug, Clone, PartialEq)]
pub enum QuadSource {
    /// Solid fill
    Solid(Color),
    /// Local-space resources (one texture, or video planes)
    Resources {
        /// Local ids in plane order
        ids: Vec<ResourceId>,
        /// Whether texel colors are premultiplied
        premultiplied_alpha: bool,
    },
    /// Texture backing an intermediate render target
    RenderTarget {
        /// Target texture
        texture: TextureId,
        /// Optional local-space mask
        mask: Option<ResourceId>,
    },
}

/// Fully resolved quad draw
#[derive(Debug, Clone, PartialEq)]
pub struct QuadDraw {
    /// Quad space to framebuffer pixels
    pub transform: Mat4,
    /// Quad bounds in quad space
    pub rect: Rect,
    /// Visible part of `rect`
    pub visible_rect: Rect,
    /// Scissor in framebuffer pixels
    pub clip: Option<Rect>,
    /// Accumulated opacity
    pub opacity: f32,
    /// What to sample
    pub source: QuadSource,
}

/// Platform GPU binding: contexts, surfaces and the current pair
pub trait GpuContext {
    /// Create a context for the requested version
    fn create_context(&self, version: GlesVersion) -> Option<ContextHandle>;

    /// Create an offscreen drawable of the given size
    fn create_surface(&self, size: Size) -> Option<SurfaceHandle>;

    /// Destroy a drawable
    fn destroy_surface(&self, surface: SurfaceHandle);

    /// Destroy a context
    fn destroy_context(&self, context: ContextHandle);

    /// Bind a pair; `(None, None)` releases whatever is current
    fn make_current(&self, surface: Option<SurfaceHandle>, context: Option<ContextHandle>) -> bool;

    /// Pair bound right now
    fn current(&self) -> ContextSnapshot;

    /// Display rotation in degrees as reported by the platform
    fn rotation(&self) -> i32;
}

/// GPU function table used by renderers and output surfaces
pub trait GpuApi {
    /// Allocate a framebuffer object
    fn gen_framebuffer(&self) -> Option<FramebufferId>;

    /// Release a framebuffer object
    fn delete_framebuffer(&self, framebuffer: FramebufferId);

    /// Bind a framebuffer for drawing
    fn bind_framebuffer(&self, framebuffer: FramebufferId);

    /// Allocate an RGBA texture
    fn create_texture(&self, size: Size) -> Option<TextureId>;

    /// Release a texture
    fn delete_texture(&self, texture: TextureId);

    /// Attach a texture as color attachment of the bound framebuffer
    fn framebuffer_texture(&self, texture: TextureId);

    /// Allocate a native buffer
    fn create_native_buffer(&self, size: Size) -> Option<NativeBufferHandle>;

    /// Release a native buffer
    fn destroy_native_buffer(&self, buffer: NativeBufferHandle);

    /// Back a texture with a native buffer
    fn bind_native_buffer_to_texture(&self, buffer: NativeBufferHandle, texture: TextureId) -> bool;

    /// Set the viewport of the bound framebuffer
    fn viewport(&self, rect: Rect);

    /// Set or disable the scissor rectangle
    fn scissor(&self, rect: Option<Rect>);

    /// Clear the bound framebuffer
    fn clear(&self, color: Color);

    /// Draw one quad into the bound framebuffer
    fn draw_quad(&self, draw: &QuadDraw);

    /// Submit queued work
    fn flush(&self);
}
