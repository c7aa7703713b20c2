//! `ObjectContext`: one registry plus the lifecycle of the objects in it.
//!
//! ```text
//!            register / new_object          merge (from any NodeLookup)
//!                    │                                │
//!                    ▼                                ▼
//!   ┌────────────────────────────────────────────────────────────────┐
//!   │                          ObjectContext                         │
//!   │  ObjectStore (id → object)     GraphDiffLog (local edits)      │
//!   │                                                                │
//!   │  write_property / set_to_one / add_to_many / remove_to_many    │
//!   │  (forward arc + inverse arc, HOLLOW/COMMITTED → MODIFIED)      │
//!   └────────────────────────────────────────────────────────────────┘
//!                    │ commit_changes
//!                    ▼
//!             ChangeSink::save(ChangeSet) ──► permanent ids, new states
//! ```
//!
//! Objects are keyed by `ObjectId::lookup_key`, so a temporary id with an
//! attached replacement finds the object under its permanent id.

use crate::config::ContextConfig;
use crate::graph_diff::{GraphDiff, GraphDiffLog};
use crate::merge::{DeepMergeOperation, MergeStats};
use crate::registry::{GraphManager, NodeLookup, ObjectStore};
use ahash::AHashMap;
use objgraph_model::{
    AccessError, AccessErrorKind, Error, KeyValue, ObjectHandle, ObjectId, PersistenceState,
    Persistent, RegistryToken, Result, Value, ValueError,
};
use objgraph_reflect::{DescriptorRef, EntityResolver, Property};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// ============================================================================
// Commit types
// ============================================================================

/// Ids of the objects a commit has to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub inserted: Vec<ObjectId>,
    pub updated: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }
}

/// What the save layer reports back for inserted objects.
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    /// Complete permanent ids, keyed by temporary id
    pub generated_ids: HashMap<ObjectId, ObjectId>,
    /// Generated key columns, keyed by temporary id
    pub generated_keys: HashMap<ObjectId, BTreeMap<String, KeyValue>>,
}

impl SaveOutcome {
    pub fn with_generated_id(mut self, temporary: ObjectId, permanent: ObjectId) -> Self {
        self.generated_ids.insert(temporary, permanent);
        self
    }

    pub fn with_generated_key(
        mut self,
        temporary: ObjectId,
        column: impl Into<String>,
        value: impl Into<KeyValue>,
    ) -> Self {
        self.generated_keys
            .entry(temporary)
            .or_default()
            .insert(column.into(), value.into());
        self
    }
}

/// The external save layer.
pub trait ChangeSink {
    fn save(&mut self, changes: &ChangeSet) -> std::result::Result<SaveOutcome, String>;
}

impl<F> ChangeSink for F
where
    F: FnMut(&ChangeSet) -> std::result::Result<SaveOutcome, String>,
{
    fn save(&mut self, changes: &ChangeSet) -> std::result::Result<SaveOutcome, String> {
        self(changes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Temporary id → permanent id for every re-keyed object
    pub rekeyed: Vec<(ObjectId, ObjectId)>,
}

/// Targets of a merge into a context, in root order.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub targets: Vec<ObjectHandle>,
    pub stats: MergeStats,
}

// ============================================================================
// ObjectContext
// ============================================================================

pub struct ObjectContext {
    resolver: Arc<EntityResolver>,
    store: ObjectStore,
    config: ContextConfig,
    diffs: GraphDiffLog,
}

impl ObjectContext {
    pub fn new(resolver: Arc<EntityResolver>, config: ContextConfig) -> Result<Self> {
        if config.validate_descriptors {
            resolver.validate()?;
        }
        Ok(Self {
            store: ObjectStore::with_capacity(config.registry_capacity),
            diffs: GraphDiffLog::new(config.record_graph_diffs),
            resolver,
            config,
        })
    }

    pub fn with_defaults(resolver: Arc<EntityResolver>) -> Result<Self> {
        Self::new(resolver, ContextConfig::default())
    }

    pub fn resolver(&self) -> &Arc<EntityResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn token(&self) -> RegistryToken {
        self.store.token()
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn object(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.store.get_node(id.lookup_key().as_ref())
    }

    /// Local edits recorded since the last commit.
    pub fn diffs(&self) -> &[GraphDiff] {
        self.diffs.entries()
    }

    /// Persistence state of a registered object.
    pub fn state_of(&self, id: &ObjectId) -> Result<PersistenceState> {
        let handle = self.require(id)?;
        let object = handle.read();
        let descriptor = self.resolver.descriptor_for_object(&*object)?;
        descriptor.descriptor().read_state(&*object)
    }

    fn require(&self, id: &ObjectId) -> Result<ObjectHandle> {
        self.object(id).ok_or_else(|| Error::NotRegistered { id: id.clone() })
    }

    fn record(&mut self, diff: GraphDiff) {
        self.diffs.record(diff);
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Create and register a NEW object with a temporary id.
    pub fn new_object(&mut self, type_name: &str) -> Result<ObjectHandle> {
        let handle = self.resolver.require(type_name)?.create_object()?;
        self.register_object(&handle)?;
        Ok(handle)
    }

    /// Register an object with this context.
    ///
    /// An object without an id gets a temporary one. Temporary ids register
    /// as NEW, permanent ids as HOLLOW. Registering an object this context
    /// already owns is a no-op; one owned by another registry, or a second
    /// object under an id already registered here, is an error.
    pub fn register_object(&mut self, handle: &ObjectHandle) -> Result<ObjectId> {
        let resolver = Arc::clone(&self.resolver);
        let token = self.token();

        let (id, state) = {
            let mut object = handle.write();
            let descriptor = resolver.descriptor_for_object(&*object)?;
            let meta = descriptor.descriptor();
            let current = meta.read_object_id(&*object)?;

            match (meta.read_registry(&*object)?, current) {
                (Some(owner), Some(id)) if owner == token => {
                    return Ok(id.lookup_key().into_owned());
                }
                (Some(owner), Some(id)) => return Err(Error::ForeignRegistry { id, owner }),
                (Some(_), None) => {
                    return Err(Error::MissingIdentity {
                        object: object.describe(),
                    })
                }
                (None, current) => {
                    let id = match current {
                        Some(id) => {
                            // One object per id: never displace another registered object.
                            let key = id.lookup_key().into_owned();
                            if let Some(existing) = self.store.get_node(&key) {
                                if !Arc::ptr_eq(&existing, handle) {
                                    return Err(Error::DuplicateId { id: key });
                                }
                            }
                            id
                        }
                        None => {
                            let id = ObjectId::temporary(descriptor.type_name());
                            meta.write_object_id(&mut *object, Some(id.clone()))?;
                            id
                        }
                    };
                    let state = PersistenceState::on_registration(&id);
                    meta.write_state(&mut *object, state)?;
                    meta.write_registry(&mut *object, Some(token))?;
                    descriptor.prepare_for_access(&mut *object)?;
                    (id.lookup_key().into_owned(), state)
                }
            }
        };

        self.store.register_node(id.clone(), Arc::clone(handle));
        tracing::trace!(id = %id, state = %state, "registered object");
        if state == PersistenceState::New {
            self.record(GraphDiff::NodeCreated { id: id.clone() });
        }
        Ok(id)
    }

    /// Mark a registered object DELETED. Relationships that have an inverse
    /// are cleared on both sides first. Returns false if `id` is not
    /// registered here.
    pub fn delete_object(&mut self, id: &ObjectId) -> Result<bool> {
        let Some(handle) = self.object(id) else {
            return Ok(false);
        };
        let key = id.lookup_key().into_owned();
        let resolver = Arc::clone(&self.resolver);
        let descriptor = match descriptor_of(&resolver, &handle) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!(id = %key, error = %err, "cannot delete object without descriptor");
                return Err(err);
            }
        };

        for property in descriptor.properties() {
            if property.as_arc().and_then(|arc| arc.reverse_name()).is_none() {
                continue;
            }
            let targets = {
                let object = handle.read();
                match property {
                    Property::ToMany(_) => collection(property, &*object)?,
                    _ => property.read_value(&*object)?.as_object().cloned().into_iter().collect(),
                }
            };
            for target in targets {
                self.disconnect(&resolver, &key, property, &target)?;
            }
        }

        {
            let mut object = handle.write();
            let meta = descriptor.descriptor();
            let state = meta.read_state(&*object)?;
            meta.write_state(&mut *object, state.after_delete())?;
        }
        self.record(GraphDiff::NodeRemoved { id: key });
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Local graph actions
    // ------------------------------------------------------------------------

    /// Set a property from the application side.
    ///
    /// Attributes are written directly; to-one relationships go through
    /// [`Self::set_to_one`]. To-many relationships are edited one element at
    /// a time with [`Self::add_to_many`] and [`Self::remove_to_many`].
    pub fn write_property(&mut self, id: &ObjectId, name: &str, value: Value) -> Result<()> {
        let resolver = Arc::clone(&self.resolver);
        let handle = self.require(id)?;
        let descriptor = descriptor_of(&resolver, &handle)?;
        let property = lookup_property(descriptor, name)?;

        match property {
            Property::Attribute(_) => {
                let old = {
                    let mut object = handle.write();
                    let old = property.read_value(&*object)?;
                    if old == value {
                        return Ok(());
                    }
                    property.write_value(&mut *object, &old, value.clone())?;
                    touch(descriptor, &mut *object)?;
                    old
                };
                self.record(GraphDiff::PropertyChanged {
                    id: id.lookup_key().into_owned(),
                    property: name.to_string(),
                    old,
                    new: value,
                });
                Ok(())
            }
            Property::ToOne(_) => {
                let target = match value {
                    Value::Null => None,
                    Value::Object(target) => Some(target),
                    other => {
                        let object = handle.read();
                        return Err(AccessError::new(
                            name,
                            &*object,
                            AccessErrorKind::TypeMismatch(ValueError::TypeMismatch {
                                expected: "object",
                                found: other.kind_name(),
                            }),
                        )
                        .into());
                    }
                };
                self.set_to_one(id, name, target.as_ref())
            }
            Property::ToMany(_) => {
                let object = handle.read();
                Err(AccessError::new(
                    name,
                    &*object,
                    AccessErrorKind::Custom(
                        "to-many relationships are edited one element at a time".to_string(),
                    ),
                )
                .into())
            }
        }
    }

    /// Point a to-one relationship at `target` (or clear it), keeping the
    /// inverse relationship in step.
    pub fn set_to_one(&mut self, id: &ObjectId, name: &str, target: Option<&ObjectId>) -> Result<()> {
        let resolver = Arc::clone(&self.resolver);
        let handle = self.require(id)?;
        let descriptor = descriptor_of(&resolver, &handle)?;
        let property = lookup_arc(descriptor, name, false)?;

        let current = {
            let object = handle.read();
            property.read_value(&*object)?.as_object().cloned()
        };
        let target = target.map(|t| t.lookup_key().into_owned());
        if current == target {
            return Ok(());
        }

        match target {
            Some(target) => self.connect(&resolver, id, property, &target),
            None => match current {
                Some(current) => self.disconnect(&resolver, id, property, &current),
                None => Ok(()),
            },
        }
    }

    /// Add `target` to a to-many relationship and maintain the inverse.
    pub fn add_to_many(&mut self, id: &ObjectId, name: &str, target: &ObjectId) -> Result<()> {
        let resolver = Arc::clone(&self.resolver);
        let handle = self.require(id)?;
        let property = lookup_arc(descriptor_of(&resolver, &handle)?, name, true)?;
        self.connect(&resolver, id, property, &target.lookup_key())
    }

    /// Remove `target` from a to-many relationship and maintain the inverse.
    pub fn remove_to_many(&mut self, id: &ObjectId, name: &str, target: &ObjectId) -> Result<()> {
        let resolver = Arc::clone(&self.resolver);
        let handle = self.require(id)?;
        let property = lookup_arc(descriptor_of(&resolver, &handle)?, name, true)?;
        self.disconnect(&resolver, id, property, &target.lookup_key())
    }

    /// Link `source.property → target`, then the inverse arc.
    fn connect(
        &mut self,
        resolver: &EntityResolver,
        source_id: &ObjectId,
        property: &Property,
        target_id: &ObjectId,
    ) -> Result<()> {
        let source = self.require(source_id)?;
        let target = self.require(target_id)?;
        let source_key = source_id.lookup_key().into_owned();

        // A to-one arc drops its previous target first.
        if let Property::ToOne(_) = property {
            let current = {
                let object = source.read();
                property.read_value(&*object)?.as_object().cloned()
            };
            if let Some(current) = current.filter(|c| c != target_id) {
                self.disconnect(resolver, &source_key, property, &current)?;
            }
        }

        let source_descriptor = descriptor_of(resolver, &source)?;
        self.link(source_descriptor, &source, &source_key, property, target_id)?;

        let Some(reverse) = property.as_arc().and_then(|arc| arc.reverse_name()) else {
            return Ok(());
        };
        let target_descriptor = descriptor_of(resolver, &target)?;
        let inverse = lookup_property(target_descriptor, reverse)?;

        // The target may currently belong to another owner through a to-one
        // inverse; that owner loses the target.
        if let Property::ToOne(_) = inverse {
            let previous_owner = {
                let object = target.read();
                inverse.read_value(&*object)?.as_object().cloned()
            };
            if let Some(owner_id) = previous_owner.filter(|owner| *owner != source_key) {
                if let Some(owner) = self.object(&owner_id) {
                    let owner_descriptor = descriptor_of(resolver, &owner)?;
                    if let Some(forward) = owner_descriptor.get_property(property.name()) {
                        self.unlink(owner_descriptor, &owner, &owner_id, forward, target_id)?;
                    }
                }
            }
        }

        self.link(target_descriptor, &target, target_id, inverse, &source_key)?;
        Ok(())
    }

    /// Unlink `source.property → target`, then the inverse arc.
    fn disconnect(
        &mut self,
        resolver: &EntityResolver,
        source_id: &ObjectId,
        property: &Property,
        target_id: &ObjectId,
    ) -> Result<()> {
        let source = self.require(source_id)?;
        let source_key = source_id.lookup_key().into_owned();
        let source_descriptor = descriptor_of(resolver, &source)?;
        if !self.unlink(source_descriptor, &source, &source_key, property, target_id)? {
            return Ok(());
        }

        let Some(reverse) = property.as_arc().and_then(|arc| arc.reverse_name()) else {
            return Ok(());
        };
        // The target may have been faulted out or never registered.
        let Some(target) = self.object(target_id) else {
            return Ok(());
        };
        let target_descriptor = descriptor_of(resolver, &target)?;
        let inverse = lookup_property(target_descriptor, reverse)?;
        self.unlink(target_descriptor, &target, target_id, inverse, &source_key)?;
        Ok(())
    }

    /// One-sided arc insert. Returns false if the arc already existed.
    fn link(
        &mut self,
        descriptor: DescriptorRef<'_>,
        handle: &ObjectHandle,
        id: &ObjectId,
        property: &Property,
        target: &ObjectId,
    ) -> Result<bool> {
        let displaced = {
            let mut object = handle.write();
            let displaced = match property {
                Property::ToMany(_) => {
                    if collection(property, &*object)?.contains(target) {
                        return Ok(false);
                    }
                    property.write_value(&mut *object, &Value::Null, Value::Object(target.clone()))?;
                    None
                }
                _ => {
                    let old = property.read_value(&*object)?;
                    if old.as_object() == Some(target) {
                        return Ok(false);
                    }
                    property.write_value(&mut *object, &old, Value::Object(target.clone()))?;
                    old.as_object().cloned()
                }
            };
            touch(descriptor, &mut *object)?;
            displaced
        };

        if let Some(old) = displaced {
            self.record(GraphDiff::ArcDeleted {
                id: id.clone(),
                property: property.name().to_string(),
                target: old,
            });
        }
        self.record(GraphDiff::ArcCreated {
            id: id.clone(),
            property: property.name().to_string(),
            target: target.clone(),
        });
        Ok(true)
    }

    /// One-sided arc removal. Returns false if there was no such arc.
    fn unlink(
        &mut self,
        descriptor: DescriptorRef<'_>,
        handle: &ObjectHandle,
        id: &ObjectId,
        property: &Property,
        target: &ObjectId,
    ) -> Result<bool> {
        {
            let mut object = handle.write();
            match property {
                Property::ToMany(_) => {
                    if !collection(property, &*object)?.contains(target) {
                        return Ok(false);
                    }
                    property.write_value(&mut *object, &Value::Object(target.clone()), Value::Null)?;
                }
                _ => {
                    let old = property.read_value(&*object)?;
                    if old.as_object() != Some(target) {
                        return Ok(false);
                    }
                    property.write_value(&mut *object, &old, Value::Null)?;
                }
            }
            touch(descriptor, &mut *object)?;
        }

        self.record(GraphDiff::ArcDeleted {
            id: id.clone(),
            property: property.name().to_string(),
            target: target.clone(),
        });
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Merge
    // ------------------------------------------------------------------------

    /// Deep-merge `roots` (looked up in `source`) into this context.
    pub fn merge(&mut self, source: &dyn NodeLookup, roots: &[ObjectHandle]) -> Result<MergeReport> {
        let resolver = Arc::clone(&self.resolver);
        let max_depth = self.config.max_merge_depth;
        let destination: &mut dyn GraphManager = &mut self.store;

        let mut operation =
            DeepMergeOperation::new(&resolver, source, Some(destination)).with_max_depth(max_depth);
        let targets = operation.merge_all(roots)?;
        Ok(MergeReport {
            targets,
            stats: operation.stats(),
        })
    }

    // ------------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------------

    /// Objects with pending changes, in a stable order.
    pub fn pending_changes(&self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (id, state) in self.dirty_objects() {
            match state {
                PersistenceState::New => changes.inserted.push(id),
                PersistenceState::Modified => changes.updated.push(id),
                // never saved, nothing to delete
                PersistenceState::Deleted if !id.is_temporary() => changes.deleted.push(id),
                _ => {}
            }
        }
        changes
    }

    fn dirty_objects(&self) -> Vec<(ObjectId, PersistenceState)> {
        let mut dirty = Vec::new();
        for (id, handle) in self.store.iter() {
            let object = handle.read();
            let descriptor = match self.resolver.descriptor_for_object(&*object) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "skipping object without descriptor");
                    continue;
                }
            };
            match descriptor.descriptor().read_state(&*object) {
                Ok(state) if state.is_dirty() => dirty.push((id.clone(), state)),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "cannot read persistence state");
                }
            }
        }
        dirty.sort_by_cached_key(|(id, _)| id.to_string());
        dirty
    }

    /// Save pending changes through `sink` and apply the outcome.
    ///
    /// On success NEW and MODIFIED objects become COMMITTED (inserted objects
    /// under their permanent ids), DELETED objects become TRANSIENT and leave
    /// the context, and the diff log is cleared. If the sink fails, nothing
    /// in the context changes.
    pub fn commit_changes(&mut self, sink: &mut dyn ChangeSink) -> Result<CommitSummary> {
        let dirty = self.dirty_objects();
        if dirty.is_empty() {
            self.diffs.clear();
            return Ok(CommitSummary::default());
        }

        let changes = self.pending_changes();
        let outcome = if changes.is_empty() {
            SaveOutcome::default()
        } else {
            sink.save(&changes).map_err(Error::Save)?
        };

        let mut rekeyed = Vec::new();
        for temporary in changes.inserted.iter().filter(|id| id.is_temporary()) {
            let mut id = temporary.clone();
            if let Some(permanent) = outcome.generated_ids.get(temporary) {
                id.set_replacement_id(permanent.clone());
            }
            if let Some(values) = outcome.generated_keys.get(temporary) {
                id.replacement_values_mut().extend(values.clone());
            }
            rekeyed.push((temporary.clone(), id.create_replacement_id()?));
        }

        let resolver = Arc::clone(&self.resolver);
        for (id, state) in &dirty {
            let Some(handle) = self.store.get_node(id) else {
                continue;
            };
            let mut object = handle.write();
            let descriptor = match resolver.descriptor_for_object(&*object) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "cannot commit object without descriptor");
                    continue;
                }
            };
            let meta = descriptor.descriptor();
            let saved = state.after_save();
            meta.write_state(&mut *object, saved)?;
            if saved == PersistenceState::Transient {
                meta.write_registry(&mut *object, None)?;
                drop(object);
                self.store.unregister_node(id);
            }
        }

        if !rekeyed.is_empty() {
            let mapping: AHashMap<ObjectId, ObjectId> = rekeyed.iter().cloned().collect();
            for (temporary, permanent) in &rekeyed {
                if let Some(handle) = self.store.get_node(temporary) {
                    let mut object = handle.write();
                    let descriptor = resolver.descriptor_for_object(&*object)?;
                    descriptor
                        .descriptor()
                        .write_object_id(&mut *object, Some(permanent.clone()))?;
                }
                self.store.rekey(temporary, permanent.clone());
            }
            self.remap_references(&resolver, &mapping)?;
        }

        self.diffs.clear();
        let summary = CommitSummary {
            inserted: changes.inserted.len(),
            updated: changes.updated.len(),
            deleted: changes.deleted.len(),
            rekeyed,
        };
        tracing::debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            rekeyed = summary.rekeyed.len(),
            "committed changes"
        );
        Ok(summary)
    }

    /// Rewrite relationship values that still name re-keyed temporary ids.
    fn remap_references(
        &self,
        resolver: &EntityResolver,
        mapping: &AHashMap<ObjectId, ObjectId>,
    ) -> Result<()> {
        for (_, handle) in self.store.iter() {
            let mut object = handle.write();
            let descriptor = resolver.descriptor_for_object(&*object)?;
            for property in descriptor.properties() {
                if property.as_arc().is_none() {
                    continue;
                }
                let current = property.read_property_directly(&*object)?;
                let remapped = match &current {
                    Value::Object(id) => match mapping.get(id) {
                        Some(permanent) => Value::Object(permanent.clone()),
                        None => continue,
                    },
                    Value::Objects(ids) if ids.iter().any(|id| mapping.contains_key(id)) => {
                        Value::Objects(
                            ids.iter()
                                .map(|id| mapping.get(id).unwrap_or(id).clone())
                                .collect(),
                        )
                    }
                    _ => continue,
                };
                property.write_property_directly(&mut *object, &current, remapped)?;
            }
        }
        Ok(())
    }
}

impl NodeLookup for ObjectContext {
    fn get_node(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.object(id)
    }
}

impl std::fmt::Debug for ObjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectContext")
            .field("store", &self.store)
            .field("descriptors", &self.resolver.len())
            .field("pending_diffs", &self.diffs.len())
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn descriptor_of<'r>(resolver: &'r EntityResolver, handle: &ObjectHandle) -> Result<DescriptorRef<'r>> {
    let object = handle.read();
    resolver.descriptor_for_object(&*object)
}

fn lookup_property<'r>(descriptor: DescriptorRef<'r>, name: &str) -> Result<&'r Property> {
    descriptor.get_property(name).ok_or_else(|| {
        Error::configuration(descriptor.type_name(), format!("no property named `{name}`"))
    })
}

fn lookup_arc<'r>(descriptor: DescriptorRef<'r>, name: &str, to_many: bool) -> Result<&'r Property> {
    let property = lookup_property(descriptor, name)?;
    match (property, to_many) {
        (Property::ToMany(_), true) | (Property::ToOne(_), false) => Ok(property),
        _ => Err(Error::configuration(
            descriptor.type_name(),
            format!(
                "`{name}` is not a {} relationship",
                if to_many { "to-many" } else { "to-one" }
            ),
        )),
    }
}

/// HOLLOW and COMMITTED objects become MODIFIED on a local edit.
fn touch(descriptor: DescriptorRef<'_>, object: &mut dyn Persistent) -> Result<()> {
    let meta = descriptor.descriptor();
    let state = meta.read_state(object)?;
    meta.write_state(object, state.after_local_write())
}

fn collection(property: &Property, object: &dyn Persistent) -> Result<Vec<ObjectId>> {
    let value = property.read_property_directly(object)?;
    if value.is_absent() {
        return Ok(Vec::new());
    }
    Vec::<ObjectId>::try_from(value)
        .map_err(|err| AccessError::new(property.name(), object, err.into()).into())
}
