//! Context/surface pair and scoped make-current
//!
//! The platform GPU context is shared with other subsystems of the process, so
//! any GPU work done here is bracketed by a [`ScopedRestoreContext`]: the pair
//! that was current on entry is put back on exit. If the surface of that pair
//! was destroyed in the meantime, restoration binds the prior context with no
//! surface instead of a dangling handle. If nothing was current on entry,
//! nothing is current on exit.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

use super::gpu::{ContextHandle, ContextSnapshot, GlesVersion, GpuContext, SurfaceHandle};
use crate::frame::Size;

/// Context and surface setup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// No context could be created, even after falling back
    #[error("GPU context creation failed (last attempt: {0:?})")]
    ContextCreationFailed(GlesVersion),

    /// The platform refused to create a drawable
    #[error("Surface creation failed for {width}x{height}")]
    SurfaceCreationFailed {
        /// Requested width
        width: i32,
        /// Requested height
        height: i32,
    },

    /// Binding the context failed
    #[error("Failed to make the GPU context current")]
    MakeCurrentFailed,
}

/// Destruction flags of live guards, keyed by the surface they will restore
type DestructionWatchers = Rc<RefCell<HashMap<SurfaceHandle, Vec<Weak<Cell<bool>>>>>>;

/// Restores the context/surface pair that was current at creation
///
/// Dropping the guard rebinds the snapshot. A snapshot taken while no context
/// was current releases whatever is bound on drop.
#[must_use = "the previous context is restored when the guard is dropped"]
pub struct ScopedRestoreContext {
    gpu: Rc<dyn GpuContext>,
    saved: ContextSnapshot,
    surface_destroyed: Option<Rc<Cell<bool>>>,
}

impl ScopedRestoreContext {
    fn new(gpu: Rc<dyn GpuContext>, watchers: &DestructionWatchers) -> Self {
        let saved = gpu.current();
        let surface_destroyed = saved.surface.map(|surface| {
            let flag = Rc::new(Cell::new(false));
            let mut watchers = watchers.borrow_mut();
            let entry = watchers.entry(surface).or_default();
            entry.retain(|weak| weak.strong_count() > 0);
            entry.push(Rc::downgrade(&flag));
            flag
        });
        Self { gpu, saved, surface_destroyed }
    }

    /// Pair that will be restored
    pub const fn saved(&self) -> ContextSnapshot {
        self.saved
    }

    /// True once the saved surface has been destroyed through the bridge
    pub fn surface_destroyed(&self) -> bool {
        self.surface_destroyed.as_ref().is_some_and(|flag| flag.get())
    }
}

impl Drop for ScopedRestoreContext {
    fn drop(&mut self) {
        let Some(context) = self.saved.context else {
            if self.gpu.current().context.is_some() && !self.gpu.make_current(None, None) {
                log::warn!("Failed to release the GPU context bound inside the scope");
            }
            return;
        };
        let surface = if self.surface_destroyed() { None } else { self.saved.surface };
        if !self.gpu.make_current(surface, Some(context)) {
            log::warn!("Failed to restore previous GPU context {context:?} (surface {surface:?})");
        }
    }
}

impl fmt::Debug for ScopedRestoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedRestoreContext")
            .field("saved", &self.saved)
            .field("surface_destroyed", &self.surface_destroyed())
            .finish()
    }
}

/// Owns the GPU context and a 1x1 drawable used for resource work
pub struct SurfaceBridge {
    gpu: Rc<dyn GpuContext>,
    context: ContextHandle,
    surface: SurfaceHandle,
    gles_version: GlesVersion,
    watchers: DestructionWatchers,
}

impl SurfaceBridge {
    /// Create the context/surface pair
    ///
    /// Tries an ES3 context first when `prefer_gles3` is set and falls back to
    /// ES2. The new pair is made current once to validate it; whatever was
    /// current before is restored afterwards.
    ///
    /// # Errors
    /// Returns a [`SurfaceError`] when no context or drawable can be created or
    /// the new pair cannot be bound.
    pub fn new(gpu: Rc<dyn GpuContext>, prefer_gles3: bool) -> Result<Self, SurfaceError> {
        let (context, gles_version) = create_context(gpu.as_ref(), prefer_gles3)?;

        let size = Size::new(1, 1);
        let Some(surface) = gpu.create_surface(size) else {
            gpu.destroy_context(context);
            return Err(SurfaceError::SurfaceCreationFailed { width: size.width, height: size.height });
        };

        let bridge = Self {
            gpu,
            context,
            surface,
            gles_version,
            watchers: DestructionWatchers::default(),
        };

        let validated = bridge.scoped_current().map(drop);
        validated?;

        log::info!("GPU surface bridge ready ({gles_version:?}, context {context:?}, surface {surface:?})");
        Ok(bridge)
    }

    /// Context owned by the bridge
    pub const fn context(&self) -> ContextHandle {
        self.context
    }

    /// Drawable owned by the bridge
    pub const fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    /// Version the context was created with
    pub const fn gles_version(&self) -> GlesVersion {
        self.gles_version
    }

    /// Platform binding the bridge was created on
    pub fn gpu(&self) -> Rc<dyn GpuContext> {
        Rc::clone(&self.gpu)
    }

    /// Bind the bridge's own pair
    pub fn make_current(&self) -> bool {
        self.gpu.make_current(Some(self.surface), Some(self.context))
    }

    /// Release whatever is current
    pub fn clear_current(&self) -> bool {
        self.gpu.make_current(None, None)
    }

    /// Snapshot the current pair without binding anything
    pub fn scoped_restore(&self) -> ScopedRestoreContext {
        ScopedRestoreContext::new(Rc::clone(&self.gpu), &self.watchers)
    }

    /// Bind the bridge's pair for the lifetime of the returned guard
    ///
    /// # Errors
    /// [`SurfaceError::MakeCurrentFailed`] if binding fails; the previous pair
    /// is restored before returning.
    pub fn scoped_current(&self) -> Result<ScopedRestoreContext, SurfaceError> {
        self.scoped_current_with(|| self.make_current())
    }

    /// Snapshot, then bind through `bind` (typically the embedder's own pair)
    ///
    /// # Errors
    /// [`SurfaceError::MakeCurrentFailed`] if `bind` reports failure.
    pub fn scoped_current_with(&self, bind: impl FnOnce() -> bool) -> Result<ScopedRestoreContext, SurfaceError> {
        let restore = self.scoped_restore();
        if bind() {
            Ok(restore)
        } else {
            Err(SurfaceError::MakeCurrentFailed)
        }
    }

    /// Destroy a drawable and flag every live guard that would restore it
    pub fn destroy_surface(&self, surface: SurfaceHandle) {
        self.gpu.destroy_surface(surface);
        self.notify_surface_destroyed(surface);
    }

    /// Flag live guards for a drawable destroyed outside the bridge
    pub fn notify_surface_destroyed(&self, surface: SurfaceHandle) {
        let flags = self.watchers.borrow_mut().remove(&surface).unwrap_or_default();
        let marked = flags
            .iter()
            .filter_map(Weak::upgrade)
            .map(|flag| flag.set(true))
            .count();
        if marked > 0 {
            log::debug!("Surface {surface:?} destroyed while {marked} restore scope(s) were active");
        }
    }
}

impl Drop for SurfaceBridge {
    fn drop(&mut self) {
        if self.gpu.current().context == Some(self.context) && !self.clear_current() {
            log::warn!("Failed to release GPU context {:?} before destruction", self.context);
        }
        self.destroy_surface(self.surface);
        self.gpu.destroy_context(self.context);
        log::debug!("GPU surface bridge destroyed");
    }
}

fn create_context(gpu: &dyn GpuContext, prefer_gles3: bool) -> Result<(ContextHandle, GlesVersion), SurfaceError> {
    if prefer_gles3 {
        if let Some(context) = gpu.create_context(GlesVersion::Gles3) {
            return Ok((context, GlesVersion::Gles3));
        }
        log::warn!("ES3 context unavailable, falling back to ES2");
    }
    gpu.create_context(GlesVersion::Gles2)
        .map(|context| (context, GlesVersion::Gles2))
        .ok_or(SurfaceError::ContextCreationFailed(GlesVersion::Gles2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{GpuCall, RecordingGpu};

    fn foreign_pair(gpu: &RecordingGpu) -> (ContextHandle, SurfaceHandle) {
        let context = gpu.create_context(GlesVersion::Gles2).unwrap();
        let surface = gpu.create_surface(Size::new(320, 240)).unwrap();
        (context, surface)
    }

    #[test]
    fn test_prefers_gles3() {
        let gpu = RecordingGpu::new();
        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();

        assert_eq!(bridge.gles_version(), GlesVersion::Gles3);
        assert!(gpu.calls().contains(&GpuCall::CreateSurface(Size::new(1, 1))));
    }

    #[test]
    fn test_falls_back_to_gles2() {
        let gpu = RecordingGpu::new();
        gpu.fail_gles3.set(true);

        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();

        assert_eq!(bridge.gles_version(), GlesVersion::Gles2);
    }

    #[test]
    fn test_context_creation_failure() {
        let gpu = RecordingGpu::new();
        gpu.fail_gles3.set(true);
        gpu.fail_gles2.set(true);

        let err = SurfaceBridge::new(gpu.clone(), true).err();

        assert_eq!(err, Some(SurfaceError::ContextCreationFailed(GlesVersion::Gles2)));
    }

    #[test]
    fn test_surface_failure_releases_context() {
        let gpu = RecordingGpu::new();
        gpu.fail_surface.set(true);

        let err = SurfaceBridge::new(gpu.clone(), false).err();

        assert_eq!(err, Some(SurfaceError::SurfaceCreationFailed { width: 1, height: 1 }));
        assert_eq!(gpu.live_contexts(), 0);
    }

    #[test]
    fn test_validation_restores_previous_pair() {
        let gpu = RecordingGpu::new();
        let (context, surface) = foreign_pair(&gpu);
        gpu.make_current(Some(surface), Some(context));

        let _bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();

        assert_eq!(gpu.current(), ContextSnapshot { context: Some(context), surface: Some(surface) });
    }

    #[test]
    fn test_scoped_current_restores_previous_pair() {
        let gpu = RecordingGpu::new();
        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();
        let (context, surface) = foreign_pair(&gpu);
        gpu.make_current(Some(surface), Some(context));

        {
            let _restore = bridge.scoped_current().unwrap();
            assert_eq!(gpu.current().context, Some(bridge.context()));
        }

        assert_eq!(gpu.current(), ContextSnapshot { context: Some(context), surface: Some(surface) });
    }

    #[test]
    fn test_destroyed_surface_restores_without_surface() {
        let gpu = RecordingGpu::new();
        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();
        let (context, surface) = foreign_pair(&gpu);
        gpu.make_current(Some(surface), Some(context));

        {
            let restore = bridge.scoped_current().unwrap();
            bridge.destroy_surface(surface);
            assert!(restore.surface_destroyed());
        }

        assert_eq!(gpu.current(), ContextSnapshot { context: Some(context), surface: None });
    }

    #[test]
    fn test_no_prior_context_is_released() {
        let gpu = RecordingGpu::new();
        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();
        bridge.clear_current();

        {
            let _restore = bridge.scoped_current().unwrap();
            assert_eq!(gpu.current().context, Some(bridge.context()));
        }

        assert_eq!(gpu.current(), ContextSnapshot::default());
    }

    #[test]
    fn test_failed_bind_restores_immediately() {
        let gpu = RecordingGpu::new();
        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();
        let (context, surface) = foreign_pair(&gpu);
        gpu.make_current(Some(surface), Some(context));

        let result = bridge.scoped_current_with(|| false);

        assert_eq!(result.err(), Some(SurfaceError::MakeCurrentFailed));
        assert_eq!(gpu.current().surface, Some(surface));
    }

    #[test]
    fn test_drop_releases_pair() {
        let gpu = RecordingGpu::new();
        let bridge = SurfaceBridge::new(gpu.clone(), true).unwrap();
        assert!(bridge.make_current());

        drop(bridge);

        assert_eq!(gpu.live_contexts(), 0);
        assert_eq!(gpu.live_surfaces(), 0);
        assert_eq!(gpu.current(), ContextSnapshot::default());
    }
}
