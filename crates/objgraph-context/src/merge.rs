//! Uniquing deep-merge operation.
//!
//! `DeepMergeOperation` is the visitor the merge algorithm in
//! `objgraph_reflect::merge` runs against. One operation is one top-level
//! merge call: its uniquing map lives exactly as long as the operation and
//! is shared by every root passed to `merge_all`, so two roots that reach the
//! same id still produce a single target.

use crate::registry::{GraphManager, NodeLookup};
use ahash::AHashMap;
use objgraph_model::{Error, ObjectHandle, ObjectId, PersistenceState, RegistryToken, Result};
use objgraph_reflect::{EntityResolver, ObjectGraphVisitor};

/// Counters collected during one merge operation. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Source objects whose merge was started
    pub visited: usize,
    /// Placeholders created in the destination
    pub created: usize,
    /// Targets left alone because they carry local changes
    pub skipped_dirty: usize,
    /// Targets whose properties were merged
    pub populated: usize,
}

pub struct DeepMergeOperation<'a> {
    resolver: &'a EntityResolver,
    source: &'a dyn NodeLookup,
    destination: Option<&'a mut dyn GraphManager>,
    merged: AHashMap<ObjectId, ObjectHandle>,
    depth: usize,
    max_depth: Option<usize>,
    stats: MergeStats,
}

impl<'a> DeepMergeOperation<'a> {
    /// Merge from `source` into `destination`. Without a destination the
    /// merge produces a detached graph of TRANSIENT copies.
    pub fn new(
        resolver: &'a EntityResolver,
        source: &'a dyn NodeLookup,
        destination: Option<&'a mut dyn GraphManager>,
    ) -> Self {
        Self {
            resolver,
            source,
            destination,
            merged: AHashMap::new(),
            depth: 0,
            max_depth: None,
            stats: MergeStats::default(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Target for `id`, if this operation merged or linked it.
    pub fn target(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.merged.get(id.lookup_key().as_ref()).cloned()
    }

    /// Deep-merge one root.
    pub fn merge(&mut self, root: &ObjectHandle) -> Result<ObjectHandle> {
        let resolver = self.resolver;
        let descriptor = {
            let object = root.read_recursive();
            resolver.descriptor_for_object(&*object)?
        };
        descriptor.deep_merge(root, self)
    }

    /// Deep-merge several roots under one uniquing map. Targets are returned
    /// in root order.
    pub fn merge_all(&mut self, roots: &[ObjectHandle]) -> Result<Vec<ObjectHandle>> {
        tracing::debug!(
            roots = roots.len(),
            destination = self.destination.is_some(),
            "deep merge started"
        );

        let mut targets = Vec::with_capacity(roots.len());
        for root in roots {
            targets.push(self.merge(root)?);
        }

        tracing::debug!(
            visited = self.stats.visited,
            created = self.stats.created,
            skipped_dirty = self.stats.skipped_dirty,
            "deep merge finished"
        );
        Ok(targets)
    }
}

impl ObjectGraphVisitor for DeepMergeOperation<'_> {
    fn merged(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.merged.get(id).cloned()
    }

    fn record_merged(&mut self, id: ObjectId, target: ObjectHandle) {
        self.merged.insert(id, target);
    }

    fn source_node(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.source.get_node(id)
    }

    fn destination_node(&self, id: &ObjectId) -> Option<ObjectHandle> {
        self.destination.as_ref()?.get_node(id)
    }

    fn destination_token(&self) -> Option<RegistryToken> {
        self.destination.as_ref().map(|registry| registry.token())
    }

    fn register_destination(&mut self, id: &ObjectId, target: ObjectHandle) -> Result<()> {
        if let Some(registry) = self.destination.as_mut() {
            registry.register_node(id.clone(), target);
        }
        Ok(())
    }

    fn enter(&mut self, id: &ObjectId) -> Result<()> {
        if let Some(limit) = self.max_depth {
            if self.depth >= limit {
                return Err(Error::DepthLimit {
                    limit,
                    id: id.clone(),
                });
            }
        }
        self.depth += 1;
        self.stats.visited += 1;
        tracing::trace!(id = %id, depth = self.depth, "merging object");
        Ok(())
    }

    fn leave(&mut self, _id: &ObjectId) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn on_placeholder_created(&mut self, _id: &ObjectId) {
        self.stats.created += 1;
    }

    fn on_skipped_dirty(&mut self, _id: &ObjectId, _state: PersistenceState) {
        self.stats.skipped_dirty += 1;
    }

    fn on_populated(&mut self, _id: &ObjectId) {
        self.stats.populated += 1;
    }
}
