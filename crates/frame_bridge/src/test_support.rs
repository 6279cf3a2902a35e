//! Test doubles shared by unit and scenario tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::foundation::math::Mat4;
use crate::frame::{
    ChildId, Color, CompositorFrame, DrawQuad, FrameMetadata, LocalSurfaceId, QuadMaterial, Rect, RenderPass,
    RenderPassId, ResourceId, ResourceIdMap, ResourceIdSet, ReturnedResource, SharedQuadState, Size, SyncToken,
    TransferableResource,
};
use crate::host::FrameHostClient;
use crate::resources::{ResourceProvider, ReturnCallback};
use crate::surface::{
    ContextHandle, ContextSnapshot, FramebufferId, GlesVersion, GpuApi, GpuContext, NativeBufferHandle, QuadDraw,
    SurfaceHandle, TextureId,
};

/// One call issued against [`RecordingGpu`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GpuCall {
    CreateContext(GlesVersion),
    CreateSurface(Size),
    DestroySurface(SurfaceHandle),
    DestroyContext(ContextHandle),
    MakeCurrent(Option<SurfaceHandle>, Option<ContextHandle>),
    GenFramebuffer(FramebufferId),
    DeleteFramebuffer(FramebufferId),
    BindFramebuffer(FramebufferId),
    CreateTexture(Size),
    DeleteTexture(TextureId),
    FramebufferTexture(TextureId),
    CreateNativeBuffer(Size),
    DestroyNativeBuffer(NativeBufferHandle),
    BindNativeBuffer(NativeBufferHandle, TextureId),
    Viewport(Rect),
    Scissor(Option<Rect>),
    Clear(Color),
    DrawQuad(FramebufferId, QuadDraw),
    Flush,
}

/// Headless GPU that records every call and tracks live objects
#[derive(Default)]
pub(crate) struct RecordingGpu {
    calls: RefCell<Vec<GpuCall>>,
    next_name: Cell<u32>,
    current: Cell<ContextSnapshot>,
    bound_framebuffer: Cell<FramebufferId>,
    contexts: RefCell<HashSet<ContextHandle>>,
    surfaces: RefCell<HashSet<SurfaceHandle>>,
    framebuffers: RefCell<HashSet<FramebufferId>>,
    textures: RefCell<HashSet<TextureId>>,
    native_buffers: RefCell<HashSet<NativeBufferHandle>>,
    rotation: Cell<i32>,
    pub fail_gles3: Cell<bool>,
    pub fail_gles2: Cell<bool>,
    pub fail_surface: Cell<bool>,
    pub fail_make_current: Cell<bool>,
}

impl RecordingGpu {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn record(&self, call: GpuCall) {
        self.calls.borrow_mut().push(call);
    }

    fn next_name(&self) -> u32 {
        let name = self.next_name.get().wrapping_add(1);
        self.next_name.set(name);
        name
    }

    pub fn calls(&self) -> Vec<GpuCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Quad draws with the framebuffer bound at the time
    pub fn draws(&self) -> Vec<(FramebufferId, QuadDraw)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                GpuCall::DrawQuad(framebuffer, draw) => Some((*framebuffer, draw.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn set_rotation(&self, degrees: i32) {
        self.rotation.set(degrees);
    }

    pub fn live_contexts(&self) -> usize {
        self.contexts.borrow().len()
    }

    pub fn live_surfaces(&self) -> usize {
        self.surfaces.borrow().len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.borrow().len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.borrow().len()
    }

    pub fn live_native_buffers(&self) -> usize {
        self.native_buffers.borrow().len()
    }
}

impl GpuContext for RecordingGpu {
    fn create_context(&self, version: GlesVersion) -> Option<ContextHandle> {
        self.record(GpuCall::CreateContext(version));
        let failed = match version {
            GlesVersion::Gles3 => self.fail_gles3.get(),
            GlesVersion::Gles2 => self.fail_gles2.get(),
        };
        if failed {
            return None;
        }
        let context = ContextHandle(u64::from(self.next_name()));
        self.contexts.borrow_mut().insert(context);
        Some(context)
    }

    fn create_surface(&self, size: Size) -> Option<SurfaceHandle> {
        self.record(GpuCall::CreateSurface(size));
        if self.fail_surface.get() {
            return None;
        }
        let surface = SurfaceHandle(u64::from(self.next_name()));
        self.surfaces.borrow_mut().insert(surface);
        Some(surface)
    }

    fn destroy_surface(&self, surface: SurfaceHandle) {
        self.record(GpuCall::DestroySurface(surface));
        self.surfaces.borrow_mut().remove(&surface);
    }

    fn destroy_context(&self, context: ContextHandle) {
        self.record(GpuCall::DestroyContext(context));
        self.contexts.borrow_mut().remove(&context);
    }

    fn make_current(&self, surface: Option<SurfaceHandle>, context: Option<ContextHandle>) -> bool {
        self.record(GpuCall::MakeCurrent(surface, context));
        if surface.is_none() && context.is_none() {
            self.current.set(ContextSnapshot::default());
            return true;
        }
        let surface_ok = surface.map_or(true, |s| self.surfaces.borrow().contains(&s));
        let context_ok = context.map_or(false, |c| self.contexts.borrow().contains(&c));
        if self.fail_make_current.get() || !surface_ok || !context_ok {
            return false;
        }
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

impl GpuApi for RecordingGpu {
    fn gen_framebuffer(&self) -> Option<FramebufferId> {
        let framebuffer = FramebufferId(self.next_name());
        self.record(GpuCall::GenFramebuffer(framebuffer));
        self.framebuffers.borrow_mut().insert(framebuffer);
        Some(framebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        self.record(GpuCall::DeleteFramebuffer(framebuffer));
        self.framebuffers.borrow_mut().remove(&framebuffer);
    }

    fn bind_framebuffer(&self, framebuffer: FramebufferId) {
        self.record(GpuCall::BindFramebuffer(framebuffer));
        self.bound_framebuffer.set(framebuffer);
    }

    fn create_texture(&self, size: Size) -> Option<TextureId> {
        self.record(GpuCall::CreateTexture(size));
        let texture = TextureId(self.next_name());
        self.textures.borrow_mut().insert(texture);
        Some(texture)
    }

    fn delete_texture(&self, texture: TextureId) {
        self.record(GpuCall::DeleteTexture(texture));
        self.textures.borrow_mut().remove(&texture);
    }

    fn framebuffer_texture(&self, texture: TextureId) {
        self.record(GpuCall::FramebufferTexture(texture));
    }

    fn create_native_buffer(&self, size: Size) -> Option<NativeBufferHandle> {
        self.record(GpuCall::CreateNativeBuffer(size));
        let buffer = NativeBufferHandle(u64::from(self.next_name()));
        self.native_buffers.borrow_mut().insert(buffer);
        Some(buffer)
    }

    fn destroy_native_buffer(&self, buffer: NativeBufferHandle) {
        self.record(GpuCall::DestroyNativeBuffer(buffer));
        self.native_buffers.borrow_mut().remove(&buffer);
    }

    fn bind_native_buffer_to_texture(&self, buffer: NativeBufferHandle, texture: TextureId) -> bool {
        self.record(GpuCall::BindNativeBuffer(buffer, texture));
        self.native_buffers.borrow().contains(&buffer) && self.textures.borrow().contains(&texture)
    }

    fn viewport(&self, rect: Rect) {
        self.record(GpuCall::Viewport(rect));
    }

    fn scissor(&self, rect: Option<Rect>) {
        self.record(GpuCall::Scissor(rect));
    }

    fn clear(&self, color: Color) {
        self.record(GpuCall::Clear(color));
    }

    fn draw_quad(&self, draw: &QuadDraw) {
        self.record(GpuCall::DrawQuad(self.bound_framebuffer.get(), draw.clone()));
    }

    fn flush(&self) {
        self.record(GpuCall::Flush);
    }
}

/// Embedder double recording everything the host asks of it
pub(crate) struct RecordingClient {
    pub gpu: Rc<RecordingGpu>,
    pub context: ContextHandle,
    pub surface: SurfaceHandle,
    pub reclaims: RefCell<Vec<(LocalSurfaceId, Vec<ReturnedResource>)>>,
    pub clears: RefCell<Vec<Color>>,
    pub make_current_calls: Cell<usize>,
    pub offscreen: Cell<bool>,
    pub dip_scale: Cell<f32>,
}

impl RecordingClient {
    pub fn new() -> Rc<Self> {
        let gpu = RecordingGpu::new();
        let context = gpu.create_context(GlesVersion::Gles2).unwrap();
        let surface = gpu.create_surface(Size::new(800, 480)).unwrap();
        gpu.clear_calls();
        Rc::new(Self {
            gpu,
            context,
            surface,
            reclaims: RefCell::new(Vec::new()),
            clears: RefCell::new(Vec::new()),
            make_current_calls: Cell::new(0),
            offscreen: Cell::new(false),
            dip_scale: Cell::new(1.0),
        })
    }

    pub fn reclaim_count(&self) -> usize {
        self.reclaims.borrow().len()
    }

    /// Ids of every returned resource, across all acknowledgments
    pub fn returned_ids(&self) -> Vec<ResourceId> {
        self.reclaims
            .borrow()
            .iter()
            .flat_map(|(_, resources)| resources.iter().map(|resource| resource.id))
            .collect()
    }
}

impl FrameHostClient for RecordingClient {
    fn gpu_api(&self) -> Rc<dyn GpuApi> {
        self.gpu.clone()
    }

    fn gpu_context(&self) -> Rc<dyn GpuContext> {
        self.gpu.clone()
    }

    fn send_reclaim_resources(&self, surface_id: LocalSurfaceId, resources: Vec<ReturnedResource>) {
        self.reclaims.borrow_mut().push((surface_id, resources));
    }

    fn make_current(&self) -> bool {
        self.make_current_calls.set(self.make_current_calls.get() + 1);
        self.gpu.make_current(Some(self.surface), Some(self.context))
    }

    fn clear_browser_frame(&self, color: Color) {
        self.clears.borrow_mut().push(color);
    }

    fn offscreen_rendering_enabled(&self) -> bool {
        self.offscreen.get()
    }

    fn dip_scale(&self) -> f32 {
        self.dip_scale.get()
    }
}

/// Calls observed by [`SpyProvider`]
#[derive(Debug, Default)]
pub(crate) struct ProviderLog {
    pub create_child_calls: usize,
    pub destroy_child_calls: usize,
    pub received: Vec<ResourceId>,
    pub declared: Vec<ResourceIdSet>,
}

/// Resource provider with preset local ids and a call log
pub(crate) struct SpyProvider {
    log: Rc<RefCell<ProviderLog>>,
    fixed_ids: ResourceIdMap,
    next_local: u32,
    next_child: u32,
    maps: HashMap<ChildId, ResourceIdMap>,
    callbacks: HashMap<ChildId, ReturnCallback>,
}

impl SpyProvider {
    /// Provider mapping the given producer ids to fixed local ids
    pub fn new(fixed_ids: &[(u32, u32)]) -> (Self, Rc<RefCell<ProviderLog>>) {
        let log = Rc::new(RefCell::new(ProviderLog::default()));
        let provider = Self {
            log: Rc::clone(&log),
            fixed_ids: fixed_ids.iter().map(|&(from, to)| (ResourceId(from), ResourceId(to))).collect(),
            next_local: 1000,
            next_child: 1,
            maps: HashMap::new(),
            callbacks: HashMap::new(),
        };
        (provider, log)
    }

    fn return_to_child(&mut self, child: ChildId, ids: Vec<ResourceId>) {
        if ids.is_empty() {
            return;
        }
        let returned: Vec<ReturnedResource> = ids
            .into_iter()
            .map(|id| ReturnedResource { id, sync_token: SyncToken::default(), count: 1, lost: false })
            .collect();
        if let Some(callback) = self.callbacks.get_mut(&child) {
            callback(&returned);
        }
    }
}

impl ResourceProvider for SpyProvider {
    fn create_child(&mut self, return_callback: ReturnCallback) -> ChildId {
        self.log.borrow_mut().create_child_calls += 1;
        let child = ChildId(self.next_child);
        self.next_child = self.next_child.wrapping_add(1);
        self.maps.insert(child, ResourceIdMap::new());
        self.callbacks.insert(child, return_callback);
        child
    }

    fn receive_from_child(&mut self, child: ChildId, resources: &[TransferableResource]) {
        let Some(map) = self.maps.get_mut(&child) else {
            return;
        };
        for resource in resources {
            self.log.borrow_mut().received.push(resource.id);
            if map.contains_key(&resource.id) {
                continue;
            }
            let local = match self.fixed_ids.get(&resource.id) {
                Some(local) => *local,
                None => {
                    self.next_local = self.next_local.wrapping_add(1);
                    ResourceId(self.next_local)
                }
            };
            map.insert(resource.id, local);
        }
    }

    fn child_to_parent_map(&self, child: ChildId) -> ResourceIdMap {
        self.maps.get(&child).cloned().unwrap_or_default()
    }

    fn declare_used_resources_from_child(&mut self, child: ChildId, used: &ResourceIdSet) {
        self.log.borrow_mut().declared.push(used.clone());
        let Some(map) = self.maps.get_mut(&child) else {
            return;
        };
        let mut unused: Vec<ResourceId> = map.keys().filter(|id| !used.contains(*id)).copied().collect();
        unused.sort();
        for id in &unused {
            map.remove(id);
        }
        self.return_to_child(child, unused);
    }

    fn destroy_child(&mut self, child: ChildId) {
        self.log.borrow_mut().destroy_child_calls += 1;
        let Some(map) = self.maps.remove(&child) else {
            return;
        };
        let mut remaining: Vec<ResourceId> = map.into_keys().collect();
        remaining.sort();
        self.return_to_child(child, remaining);
        self.callbacks.remove(&child);
    }
}

/// A valid surface id
pub(crate) fn surface_id() -> LocalSurfaceId {
    LocalSurfaceId::new(1, 1, 0x5eed)
}

/// Single-pass frame with one textured quad per entry of `quad_resources`
///
/// `offered` lists the producer ids sent in the frame's resource list.
pub(crate) fn textured_frame(offered: &[u32], quad_resources: &[u32], background: Color) -> CompositorFrame {
    let mut root = RenderPass::new(RenderPassId(1), Rect::new(0, 0, 100, 100));
    let sqs = root.add_shared_quad_state(SharedQuadState::new(Mat4::identity(), Rect::new(0, 0, 100, 100)));
    for &resource in quad_resources {
        root.add_quad(DrawQuad::new(
            Rect::new(0, 0, 100, 100),
            sqs,
            QuadMaterial::Texture { resource_id: ResourceId(resource), premultiplied_alpha: true },
        ));
    }
    let resources = offered
        .iter()
        .map(|&id| TransferableResource::new(ResourceId(id), Size::new(100, 100)))
        .collect();
    let metadata = FrameMetadata { root_background_color: background, ..FrameMetadata::default() };
    CompositorFrame::new(vec![root], resources, metadata)
}
