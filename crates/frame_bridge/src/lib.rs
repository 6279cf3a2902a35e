//! # Frame Bridge
//!
//! Browser-side host for delegated compositor frames.
//!
//! A remote producer (typically a renderer process) serializes compositor frames
//! whose quads reference producer-owned GPU resources. This crate ingests those
//! frames, remaps every resource handle into the local GPU namespace, keeps a
//! single canonical frame, and presents it into a platform drawable through a
//! pluggable renderer. Resources the display no longer needs are handed back to
//! the producer once per ingested frame.
//!
//! ## Features
//!
//! - **Resource Translation**: producer-space to local-space id remapping with
//!   whole-frame rejection on unknown ids
//! - **Display Rotation**: root pass rewrite for 90/180/270 degree panels
//! - **Renderer Strategies**: general GPU path with intermediate targets, or a
//!   simplified flattening path, chosen once at initialization
//! - **Context Discipline**: every GPU sequence runs under a scoped make-current
//!   that restores whatever was current before
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_bridge::prelude::*;
//! # fn client() -> std::rc::Rc<dyn FrameHostClient> { unimplemented!() }
//!
//! let mut host = DelegatedFrameHost::new(
//!     client(),
//!     Box::new(LocalResourceProvider::new()),
//!     FrameHostSettings::default(),
//! );
//! host.initialize(RendererKind::GeneralGpu);
//! // host.swap_delegated_frame(surface_id, frame);
//! // host.render_delegated_frame(Rect::new(0, 0, 800, 480));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core configuration
pub mod core;
pub mod config;

pub mod foundation;
pub mod frame;
pub mod resources;
pub mod surface;
pub mod render;
pub mod host;

#[cfg(test)]
pub(crate) mod test_support;

pub use host::{DelegatedFrameHost, FrameHostClient, FrameHostSettings};
pub use render::{RenderError, RenderResult, RendererKind};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        DelegatedFrameHost, FrameHostClient, FrameHostSettings,
        RenderError, RenderResult, RendererKind,
        core::config::BridgeConfig,
        config::Config,
        frame::{
            Color, CompositorFrame, DrawQuad, FrameMetadata, LocalSurfaceId, QuadMaterial,
            Rect, RenderPass, RenderPassId, RenderPassList, ResourceId, ReturnedResource,
            SharedQuadState, Size, SyncToken, TransferableResource,
        },
        resources::{LocalResourceProvider, ResourceProvider, ResourceTranslationTable},
        surface::{GpuApi, GpuContext, SurfaceBridge},
        render::Rotation,
    };
}
