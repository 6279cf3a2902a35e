//! Producer-space to local-space resource translation
//!
//! The table sits between the frame host and its resource provider. Besides
//! forwarding the provider contract it performs the per-frame quad walk that
//! rewrites resource ids and collects the set of ids a frame uses.

use thiserror::Error;

use super::provider::{ResourceProvider, ReturnCallback};
use crate::frame::{
    ChildId, RenderPassId, RenderPassList, ResourceId, ResourceIdMap, ResourceIdSet, TransferableResource,
};

/// Resource translation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// A quad references an id with no translation entry
    #[error("Resource {resource_id} referenced by pass {pass_id:?} has no local mapping")]
    UnmappedResource {
        /// Producer-space id that failed to translate
        resource_id: ResourceId,
        /// Pass containing the offending quad
        pass_id: RenderPassId,
    },
}

/// Translation table over a resource provider
pub struct ResourceTranslationTable {
    provider: Box<dyn ResourceProvider>,
}

impl ResourceTranslationTable {
    /// Wrap a provider
    pub fn new(provider: Box<dyn ResourceProvider>) -> Self {
        Self { provider }
    }

    /// Register a producer with the provider
    pub fn register_child(&mut self, return_callback: ReturnCallback) -> ChildId {
        self.provider.create_child(return_callback)
    }

    /// Import a frame's resource list
    pub fn ingest_resource_list(&mut self, child: ChildId, resources: &[TransferableResource]) {
        self.provider.receive_from_child(child, resources);
    }

    /// Snapshot of the child's translation entries
    pub fn mapping(&self, child: ChildId) -> ResourceIdMap {
        self.provider.child_to_parent_map(child)
    }

    /// Declare the producer ids still referenced by the displayed frame
    pub fn declare_used(&mut self, child: ChildId, used: &ResourceIdSet) {
        self.provider.declare_used_resources_from_child(child, used);
    }

    /// Release the child registration
    pub fn unregister_child(&mut self, child: ChildId) {
        self.provider.destroy_child(child);
    }

    /// Rewrite every quad's resource ids to local ids
    ///
    /// Returns the distinct producer ids the passes reference. Stops at the
    /// first id without a mapping; the passes are then partially rewritten and
    /// must be discarded by the caller.
    pub fn translate_render_passes(
        &self,
        child: ChildId,
        passes: &mut RenderPassList,
    ) -> Result<ResourceIdSet, TranslationError> {
        let map = self.mapping(child);
        remap_render_passes(&map, passes)
    }
}

/// Quad walk shared by the table and its tests
pub(crate) fn remap_render_passes(
    map: &ResourceIdMap,
    passes: &mut RenderPassList,
) -> Result<ResourceIdSet, TranslationError> {
    let mut resources_in_frame = ResourceIdSet::with_capacity(map.len());

    for pass in passes.iter_mut() {
        let pass_id = pass.id;
        for quad in &mut pass.quads {
            for resource_id in quad.resources_mut() {
                let Some(&local_id) = map.get(&*resource_id) else {
                    return Err(TranslationError::UnmappedResource { resource_id: *resource_id, pass_id });
                };
                resources_in_frame.insert(*resource_id);
                *resource_id = local_id;
            }
        }
    }

    Ok(resources_in_frame)
}
