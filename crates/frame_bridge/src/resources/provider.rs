//! Resource provider contract and an in-process implementation
//!
//! A resource provider owns the local GPU namespace. Every frame producer
//! registers as a *child*; the provider maps the child's resource ids to local
//! ids and tells the child, through its return callback, when a resource is no
//! longer referenced by the display.

use std::collections::HashMap;

use crate::frame::{
    ChildId, ResourceId, ResourceIdMap, ResourceIdSet, ReturnedResource, SyncToken, TransferableResource,
};

/// Invoked with resources the provider hands back to a child
pub type ReturnCallback = Box<dyn FnMut(&[ReturnedResource])>;

/// Resource manager contract consumed by the frame host
pub trait ResourceProvider {
    /// Register a producer; `return_callback` receives released resources
    fn create_child(&mut self, return_callback: ReturnCallback) -> ChildId;

    /// Import the resources offered with a frame, allocating local ids as needed
    fn receive_from_child(&mut self, child: ChildId, resources: &[TransferableResource]);

    /// Current producer-space to local-space mapping of a child
    fn child_to_parent_map(&self, child: ChildId) -> ResourceIdMap;

    /// Declare which producer ids the display still references
    ///
    /// Everything else imported from the child becomes eligible for return.
    fn declare_used_resources_from_child(&mut self, child: ChildId, used: &ResourceIdSet);

    /// Forget a child, returning everything it still has imported
    fn destroy_child(&mut self, child: ChildId);
}

/// Bookkeeping for one imported resource
#[derive(Debug, Clone, Copy)]
struct ImportedResource {
    local_id: ResourceId,
    sync_token: SyncToken,
    import_count: u32,
}

struct Child {
    resources: HashMap<ResourceId, ImportedResource>,
    return_callback: ReturnCallback,
}

impl Child {
    fn take_unused(&mut self, used: &ResourceIdSet, lost: bool) -> Vec<ReturnedResource> {
        let unused: Vec<ResourceId> = self
            .resources
            .keys()
            .filter(|id| !used.contains(*id))
            .copied()
            .collect();
        let mut returned: Vec<ReturnedResource> = unused
            .into_iter()
            .filter_map(|id| self.resources.remove(&id).map(|resource| (id, resource)))
            .map(|(id, resource)| ReturnedResource {
                id,
                sync_token: resource.sync_token,
                count: resource.import_count,
                lost,
            })
            .collect();
        returned.sort_by_key(|resource| resource.id);
        returned
    }
}

/// In-process resource provider
///
/// Local ids come from a counter starting at 1 and are never reused; once the
/// counter is exhausted further resources are not imported. Returns are
/// delivered synchronously from within `declare_used_resources_from_child` and
/// `destroy_child`.
pub struct LocalResourceProvider {
    children: HashMap<ChildId, Child>,
    next_child_id: u32,
    next_local_id: Option<u32>,
    context_lost: bool,
}

impl LocalResourceProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            next_child_id: 1,
            next_local_id: Some(1),
            context_lost: false,
        }
    }

    /// Mark the GPU context as lost; later returns carry `lost = true`
    pub fn mark_context_lost(&mut self) {
        log::warn!("Resource provider context lost, returned resources will be marked lost");
        self.context_lost = true;
    }

    /// Number of registered children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of resources currently imported from a child
    pub fn imported_count(&self, child: ChildId) -> usize {
        self.children.get(&child).map_or(0, |c| c.resources.len())
    }

    fn allocate_local_id(&mut self) -> Option<ResourceId> {
        let id = self.next_local_id?;
        self.next_local_id = id.checked_add(1);
        Some(ResourceId(id))
    }

    /// Next unused child id; wraps around past `u32::MAX`, skipping zero
    fn allocate_child_id(&mut self) -> ChildId {
        loop {
            let id = ChildId(self.next_child_id);
            self.next_child_id = self.next_child_id.checked_add(1).unwrap_or(1);
            if !self.children.contains_key(&id) {
                return id;
            }
        }
    }

    fn deliver(child: &mut Child, returned: &[ReturnedResource]) {
        if !returned.is_empty() {
            (child.return_callback)(returned);
        }
    }
}

impl Default for LocalResourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for LocalResourceProvider {
    fn create_child(&mut self, return_callback: ReturnCallback) -> ChildId {
        let id = self.allocate_child_id();
        self.children.insert(id, Child { resources: HashMap::new(), return_callback });
        log::debug!("Registered {id}");
        id
    }

    fn receive_from_child(&mut self, child: ChildId, resources: &[TransferableResource]) {
        if !self.children.contains_key(&child) {
            log::warn!("Ignoring {} resources from unknown {child}", resources.len());
            return;
        }

        for resource in resources {
            let known = self
                .children
                .get_mut(&child)
                .and_then(|c| c.resources.get_mut(&resource.id))
                .map(|imported| {
                    imported.import_count = imported.import_count.saturating_add(1);
                    imported.sync_token = resource.sync_token;
                })
                .is_some();
            if known {
                continue;
            }

            let Some(local_id) = self.allocate_local_id() else {
                log::error!("{child}: local resource ids exhausted, resource {} not imported", resource.id);
                continue;
            };
            if let Some(c) = self.children.get_mut(&child) {
                c.resources.insert(
                    resource.id,
                    ImportedResource { local_id, sync_token: resource.sync_token, import_count: 1 },
                );
            }
            log::trace!("{child}: resource {} -> local {local_id}", resource.id);
        }
    }

    fn child_to_parent_map(&self, child: ChildId) -> ResourceIdMap {
        self.children
            .get(&child)
            .map(|c| c.resources.iter().map(|(id, imported)| (*id, imported.local_id)).collect())
            .unwrap_or_default()
    }

    fn declare_used_resources_from_child(&mut self, child: ChildId, used: &ResourceIdSet) {
        let lost = self.context_lost;
        let Some(c) = self.children.get_mut(&child) else {
            log::warn!("Declared used resources for unknown {child}");
            return;
        };
        let returned = c.take_unused(used, lost);
        log::debug!("{child}: {} in use, {} returned", c.resources.len(), returned.len());
        Self::deliver(c, &returned);
    }

    fn destroy_child(&mut self, child: ChildId) {
        let lost = self.context_lost;
        let Some(mut c) = self.children.remove(&child) else {
            log::warn!("Destroying unknown {child}");
            return;
        };
        let returned = c.take_unused(&ResourceIdSet::new(), lost);
        log::debug!("Destroyed {child}, returning {} resources", returned.len());
        Self::deliver(&mut c, &returned);
    }
}
