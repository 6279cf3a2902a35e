//! # GPU Surfaces
//!
//! Platform binding contracts and the pieces built on them.
//!
//! - [`GpuContext`] / [`GpuApi`]: platform binding and GPU function table
//! - [`SurfaceBridge`]: context/surface pair with scoped make-current
//! - [`OutputSurface`]: onscreen or offscreen presentation target

pub mod bridge;
pub mod gpu;
pub mod output;

pub use bridge::{ScopedRestoreContext, SurfaceBridge, SurfaceError};
pub use gpu::{
    ContextHandle, ContextSnapshot, FramebufferId, GlesVersion, GpuApi, GpuContext, NativeBufferHandle, QuadDraw,
    QuadSource, SurfaceHandle, TextureId,
};
pub use output::{OutputSurface, SurfaceCapabilities};
