//! Descriptor arena and inheritance walks.
//!
//! `EntityResolver` owns every `ClassDescriptor` of a model, indexed by type
//! name, with each descriptor optionally pointing at its superclass index. It
//! is built explicitly (register, validate, clear) and handed to consumers by
//! reference, so independent resolvers can coexist (e.g. one per test).
//!
//! `DescriptorRef` is a cheap view of one descriptor inside its resolver. The
//! cascading operations live there, as loops over the superclass chain:
//! superclass properties are always visited before the subclass's own.

use crate::descriptor::ClassDescriptor;
use crate::property::Property;
use ahash::AHashMap;
use objgraph_model::{Error, ObjectHandle, Persistent, Result};

/// Index of a descriptor inside its `EntityResolver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId(usize);

#[derive(Debug, Default)]
pub struct EntityResolver {
    descriptors: Vec<ClassDescriptor>,
    parents: Vec<Option<DescriptorId>>,
    by_name: AHashMap<String, DescriptorId>,
    /// Ancestry of runtime types that have no descriptor of their own.
    declared_types: AHashMap<String, String>,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Its superclass must already be registered.
    pub fn register(&mut self, descriptor: ClassDescriptor) -> Result<DescriptorId> {
        let name = descriptor.type_name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(Error::configuration(name, "descriptor already registered"));
        }

        let parent = match descriptor.superclass_name() {
            None => None,
            Some(superclass) => match self.by_name.get(superclass) {
                Some(id) => Some(*id),
                None => {
                    return Err(Error::configuration(
                        name,
                        format!("superclass `{superclass}` is not registered"),
                    ))
                }
            },
        };

        let id = DescriptorId(self.descriptors.len());
        self.descriptors.push(descriptor);
        self.parents.push(parent);
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Declare the parent of a runtime type that has no descriptor.
    pub fn declare_type(&mut self, type_name: impl Into<String>, parent: impl Into<String>) {
        self.declared_types.insert(type_name.into(), parent.into());
    }

    /// Check that every registered descriptor is valid.
    pub fn validate(&self) -> Result<()> {
        for descriptor in &self.descriptors {
            descriptor.ensure_valid()?;
        }
        Ok(())
    }

    /// Drop every descriptor and declared type.
    pub fn clear(&mut self) {
        self.descriptors.clear();
        self.parents.clear();
        self.by_name.clear();
        self.declared_types.clear();
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, type_name: &str) -> Option<DescriptorRef<'_>> {
        let id = *self.by_name.get(type_name)?;
        Some(DescriptorRef { resolver: self, id })
    }

    /// Like [`Self::descriptor`], but a missing descriptor is a configuration error.
    pub fn require(&self, type_name: &str) -> Result<DescriptorRef<'_>> {
        self.descriptor(type_name)
            .ok_or_else(|| Error::configuration(type_name, "no descriptor registered"))
    }

    pub fn get(&self, id: DescriptorId) -> Option<DescriptorRef<'_>> {
        (id.0 < self.descriptors.len()).then_some(DescriptorRef { resolver: self, id })
    }

    pub fn descriptors(&self) -> impl Iterator<Item = DescriptorRef<'_>> {
        (0..self.descriptors.len()).map(move |i| DescriptorRef {
            resolver: self,
            id: DescriptorId(i),
        })
    }

    /// Descriptor for the runtime type of `object`, falling back through its
    /// declared ancestry.
    pub fn descriptor_for_object(&self, object: &dyn Persistent) -> Result<DescriptorRef<'_>> {
        let mut current = Some(object.type_name().to_string());
        let mut steps = 0;
        while let Some(name) = current {
            if let Some(descriptor) = self.descriptor(&name) {
                return Ok(descriptor);
            }
            steps += 1;
            if steps > self.declared_types.len() {
                break;
            }
            current = self.declared_types.get(&name).cloned();
        }
        Err(Error::configuration(
            object.type_name(),
            "no descriptor registered",
        ))
    }

    fn parent_type_of(&self, type_name: &str) -> Option<&str> {
        if let Some(parent) = self.declared_types.get(type_name) {
            return Some(parent.as_str());
        }
        self.descriptor(type_name)?
            .descriptor()
            .superclass_name()
    }
}

// ============================================================================
// DescriptorRef
// ============================================================================

/// A descriptor viewed through its resolver.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorRef<'r> {
    pub(crate) resolver: &'r EntityResolver,
    pub(crate) id: DescriptorId,
}

impl<'r> DescriptorRef<'r> {
    pub fn id(self) -> DescriptorId {
        self.id
    }

    pub fn resolver(self) -> &'r EntityResolver {
        self.resolver
    }

    pub fn descriptor(self) -> &'r ClassDescriptor {
        &self.resolver.descriptors[self.id.0]
    }

    pub fn type_name(self) -> &'r str {
        self.descriptor().type_name()
    }

    pub fn superclass(self) -> Option<DescriptorRef<'r>> {
        let parent = self.resolver.parents[self.id.0]?;
        Some(DescriptorRef {
            resolver: self.resolver,
            id: parent,
        })
    }

    /// The superclass chain, root first, ending with `self`.
    pub fn lineage(self) -> Vec<DescriptorRef<'r>> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.superclass() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    pub fn is_subtype_of(self, ancestor: DescriptorId) -> bool {
        let mut current = Some(self);
        while let Some(descriptor) = current {
            if descriptor.id == ancestor {
                return true;
            }
            current = descriptor.superclass();
        }
        false
    }

    /// Valid only if this descriptor and all of its superclasses are.
    pub fn is_valid(self) -> bool {
        self.lineage().iter().all(|d| d.descriptor().is_valid())
    }

    pub fn ensure_valid(self) -> Result<()> {
        for descriptor in self.lineage() {
            descriptor.descriptor().ensure_valid()?;
        }
        Ok(())
    }

    /// Property lookup that walks up the superclass chain.
    pub fn get_property(self, name: &str) -> Option<&'r Property> {
        let mut current = Some(self);
        while let Some(descriptor) = current {
            if let Some(property) = descriptor.get_declared_property(name) {
                return Some(property);
            }
            current = descriptor.superclass();
        }
        None
    }

    pub fn get_declared_property(self, name: &str) -> Option<&'r Property> {
        self.descriptor().declared_property(name)
    }

    /// All properties, superclass properties first.
    pub fn properties(self) -> impl Iterator<Item = &'r Property> {
        self.lineage()
            .into_iter()
            .flat_map(|d| d.descriptor().declared_properties())
    }

    /// Most specific registered descriptor for `concrete_type` that is this
    /// descriptor or one of its subclasses; `self` if there is none.
    pub fn resolve_descriptor(self, concrete_type: &str) -> DescriptorRef<'r> {
        let limit = self.resolver.descriptors.len() + self.resolver.declared_types.len() + 1;
        let mut current = Some(concrete_type);
        let mut steps = 0;
        while let Some(name) = current {
            if name == self.type_name() {
                return self;
            }
            if let Some(candidate) = self.resolver.descriptor(name) {
                if candidate.is_subtype_of(self.id) {
                    return candidate;
                }
            }
            steps += 1;
            if steps > limit {
                break;
            }
            current = self.resolver.parent_type_of(name);
        }
        self
    }

    pub fn create_object(self) -> Result<ObjectHandle> {
        self.ensure_valid()?;
        self.descriptor().create_object()
    }

    /// Superclass preparation first, then each declared property.
    pub fn prepare_for_access(self, object: &mut dyn Persistent) -> Result<()> {
        for descriptor in self.lineage() {
            for property in descriptor.descriptor().declared_properties() {
                property.prepare_for_access(object)?;
            }
        }
        Ok(())
    }

    /// Copy scalar state; superclass properties first. Never traverses arcs.
    pub fn shallow_merge(self, from: &dyn Persistent, to: &mut dyn Persistent) -> Result<()> {
        for descriptor in self.lineage() {
            for property in descriptor.descriptor().declared_properties() {
                property.shallow_merge(from, to)?;
            }
        }
        Ok(())
    }
}
