//! Deep merge of a source object graph into a destination registry.
//!
//! ## Algorithm (per source object)
//!
//! 1. Read the source object's id; no id is an identity error.
//! 2. If the id was already merged during this top-level call, return the
//!    recorded target. This is what makes cycles and diamonds terminate.
//! 3. Otherwise look the id up in the destination registry.
//! 4. If absent, build a placeholder: create a bare object, write the id,
//!    register it as HOLLOW (or mark it TRANSIENT without a destination),
//!    then prepare it for access.
//! 5. Record id → target *before* touching properties, so cycles resolve to
//!    the in-progress placeholder.
//! 6. Merge properties (state guard first, superclass properties first),
//!    recursing into related objects.
//! 7. Return the target.
//!
//! Everything that is specific to one merge call (the uniquing map, the
//! destination registry, the source graph) sits behind `ObjectGraphVisitor`.

use crate::resolver::{DescriptorRef, EntityResolver};
use objgraph_model::{
    Error, ObjectHandle, ObjectId, PersistenceState, RegistryToken, Result,
};
use std::sync::Arc;

/// Per-merge-call context consulted by the deep-merge algorithm.
pub trait ObjectGraphVisitor {
    /// Target already merged for `id` during this call.
    fn merged(&self, id: &ObjectId) -> Option<ObjectHandle>;

    fn record_merged(&mut self, id: ObjectId, target: ObjectHandle);

    /// Source-graph object for `id`, if the source materialized it.
    fn source_node(&self, id: &ObjectId) -> Option<ObjectHandle>;

    /// Existing destination-registry object for `id`.
    fn destination_node(&self, id: &ObjectId) -> Option<ObjectHandle>;

    /// Token of the destination registry; `None` when merging without one.
    fn destination_token(&self) -> Option<RegistryToken>;

    fn register_destination(&mut self, id: &ObjectId, target: ObjectHandle) -> Result<()>;

    /// Called before an object's properties are merged.
    fn enter(&mut self, _id: &ObjectId) -> Result<()> {
        Ok(())
    }

    fn leave(&mut self, _id: &ObjectId) {}

    fn on_placeholder_created(&mut self, _id: &ObjectId) {}

    fn on_skipped_dirty(&mut self, _id: &ObjectId, _state: PersistenceState) {}

    fn on_populated(&mut self, _id: &ObjectId) {}
}

fn same_object(a: &ObjectHandle, b: &ObjectHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Merge the object `id` refers to, as seen from an arc whose target type is
/// `target_type`. Returns the key the target is linked under and the target.
///
/// Ids the source graph cannot resolve are linked to a destination object
/// (existing or placeholder) without populating it.
pub fn merge_related(
    resolver: &EntityResolver,
    target_type: &str,
    id: &ObjectId,
    visitor: &mut dyn ObjectGraphVisitor,
) -> Result<(ObjectId, ObjectHandle)> {
    let descriptor = resolver.require(target_type)?;
    let key = id.lookup_key().into_owned();

    if let Some(target) = visitor.merged(&key) {
        return Ok((key, target));
    }

    let target = match visitor.source_node(id) {
        Some(source) => descriptor.deep_merge(&source, visitor)?,
        None => {
            tracing::trace!(id = %key, "related object not in source graph, linking placeholder");
            descriptor.find_or_create(&key, visitor)?
        }
    };
    Ok((key, target))
}

impl<'r> DescriptorRef<'r> {
    /// Deep-merge `source` (and everything reachable from it) into the
    /// visitor's destination. Entry point of the algorithm above.
    pub fn deep_merge(
        self,
        source: &ObjectHandle,
        visitor: &mut dyn ObjectGraphVisitor,
    ) -> Result<ObjectHandle> {
        self.ensure_valid()?;

        let (id, concrete_type) = {
            let object = source.read_recursive();
            let descriptor = self.resolve_descriptor(object.type_name());
            match descriptor.descriptor().read_object_id(&*object)? {
                Some(id) => (id, object.type_name().to_string()),
                None => {
                    return Err(Error::MissingIdentity {
                        object: object.describe(),
                    })
                }
            }
        };
        let key = id.lookup_key().into_owned();

        if let Some(target) = visitor.merged(&key) {
            return Ok(target);
        }

        let descriptor = self.resolve_descriptor(&concrete_type);
        descriptor.ensure_valid()?;

        visitor.enter(&key)?;
        let target = descriptor.find_or_create(&key, visitor)?;
        let merged = descriptor.deep_property_merge(source, &target, visitor);
        visitor.leave(&key);
        merged?;

        Ok(target)
    }

    /// Steps 3–5: find the destination object for `key` or build a
    /// placeholder, and record it in the uniquing map.
    pub fn find_or_create(
        self,
        key: &ObjectId,
        visitor: &mut dyn ObjectGraphVisitor,
    ) -> Result<ObjectHandle> {
        if let Some(target) = visitor.merged(key) {
            return Ok(target);
        }

        if let Some(existing) = visitor.destination_node(key) {
            visitor.record_merged(key.clone(), Arc::clone(&existing));
            return Ok(existing);
        }

        let descriptor = self.descriptor();
        let target = self.create_object()?;
        let token = visitor.destination_token();
        {
            let mut object = target.write();
            descriptor.write_object_id(&mut *object, Some(key.clone()))?;
            let state = if token.is_some() {
                PersistenceState::Hollow
            } else {
                PersistenceState::Transient
            };
            descriptor.write_state(&mut *object, state)?;
            descriptor.write_registry(&mut *object, token)?;
        }
        if token.is_some() {
            visitor.register_destination(key, Arc::clone(&target))?;
        }
        {
            let mut object = target.write();
            self.prepare_for_access(&mut *object)?;
        }

        tracing::trace!(id = %key, type_name = self.type_name(), "created placeholder");
        visitor.on_placeholder_created(key);
        visitor.record_merged(key.clone(), Arc::clone(&target));
        Ok(target)
    }

    /// Merge every property of `from` into `to`, unless `to` carries local
    /// changes (NEW, MODIFIED, DELETED), in which case nothing is touched.
    /// A HOLLOW target becomes COMMITTED once populated.
    pub fn deep_property_merge(
        self,
        from: &ObjectHandle,
        to: &ObjectHandle,
        visitor: &mut dyn ObjectGraphVisitor,
    ) -> Result<()> {
        if same_object(from, to) {
            return Ok(());
        }

        let descriptor = self.descriptor();
        let (state, id) = {
            let object = to.read();
            (
                descriptor.read_state(&*object)?,
                descriptor.read_object_id(&*object)?,
            )
        };

        if !state.accepts_merge() {
            if let Some(id) = &id {
                tracing::debug!(id = %id, state = %state, "target has local changes, merge skipped");
                visitor.on_skipped_dirty(id, state);
            }
            return Ok(());
        }

        {
            let mut object = to.write();
            self.prepare_for_access(&mut *object)?;
        }

        for level in self.lineage() {
            for property in level.descriptor().declared_properties() {
                property.deep_merge(from, to, self.resolver, visitor)?;
            }
        }

        {
            let mut object = to.write();
            let current = descriptor.read_state(&*object)?;
            descriptor.write_state(&mut *object, current.after_merge())?;
        }
        if let Some(id) = &id {
            visitor.on_populated(id);
        }
        Ok(())
    }
}
