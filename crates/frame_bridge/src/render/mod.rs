//! # Rendering
//!
//! Renderer strategies and the root-pass rotation rewrite.
//!
//! ## Architecture
//!
//! - [`Renderer`]: sum type over the two strategies, built once from a
//!   [`RendererKind`] and owned by the frame host for its whole lifetime
//! - [`GeneralGpuRenderer`]: intermediate render target per non-root pass
//! - [`SimplifiedRenderer`]: single target, render-pass quads flattened inline
//! - [`rotation`]: matrix rewrite for 90/180/270 degree panels

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surface::SurfaceError;

pub mod general;
pub mod renderer;
pub mod rotation;
pub mod simplified;

pub use general::GeneralGpuRenderer;
pub use renderer::{DirectRenderer, Renderer};
pub use rotation::Rotation;
pub use simplified::SimplifiedRenderer;

/// Renderer strategy selected at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Intermediate render targets for non-root passes
    #[default]
    GeneralGpu,
    /// No intermediate targets; nested passes are flattened into the root
    Simplified,
}

/// Errors that can occur during rendering operations
///
/// None of these cross the frame host's swap/render boundary; they are logged
/// there and the frame is skipped. Only initialization reports them to the caller.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// The GPU context could not be created or bound
    #[error("GPU context unavailable: {0}")]
    ContextUnavailable(#[from] SurfaceError),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// GPU resource creation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
