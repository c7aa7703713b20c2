//! Per-type class descriptors.
//!
//! A `ClassDescriptor` holds everything needed to work with objects of one
//! type without knowing it statically: a factory, the declared properties (in
//! declaration order), and accessors for object id, persistence state and
//! owning registry. Inheritance is expressed by naming a superclass; the
//! chain itself is walked by [`crate::DescriptorRef`] through the
//! [`crate::EntityResolver`] arena.
//!
//! A descriptor is usable only once it is *valid* (all parts set). Invalid
//! descriptors are rejected with `Error::Configuration` before any creation
//! or merge touches them.

use crate::accessor::{
    object_id_accessor, registry_accessor, state_accessor, ObjectIdAccessor, RegistryAccessor,
    StateAccessor,
};
use crate::property::Property;
use indexmap::IndexMap;
use objgraph_model::{
    into_handle, DataObject, Error, HasObjectMeta, ObjectHandle, ObjectId, PersistenceState,
    Persistent, RegistryToken, Result,
};
use std::fmt;
use std::sync::Arc;

/// Instantiates a bare object of the described type.
pub type Factory = Arc<dyn Fn() -> Result<ObjectHandle, String> + Send + Sync>;

#[derive(Clone)]
pub struct ClassDescriptor {
    type_name: String,
    superclass: Option<String>,
    factory: Option<Factory>,
    declared: Option<IndexMap<String, Property>>,
    object_id_accessor: Option<ObjectIdAccessor>,
    state_accessor: Option<StateAccessor>,
    registry_accessor: Option<RegistryAccessor>,
}

impl ClassDescriptor {
    /// An empty (invalid) descriptor; parts are supplied with the setters.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            superclass: None,
            factory: None,
            declared: None,
            object_id_accessor: None,
            state_accessor: None,
            registry_accessor: None,
        }
    }

    /// Descriptor for a concrete type that embeds `ObjectMeta`.
    pub fn for_type<T, F>(type_name: impl Into<String>, make: F) -> Self
    where
        T: HasObjectMeta,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move || -> Result<ObjectHandle, String> { Ok(into_handle(make())) });
        let mut descriptor = Self::new(type_name);
        descriptor.factory = Some(factory);
        descriptor.declared = Some(IndexMap::new());
        descriptor.object_id_accessor = Some(object_id_accessor::<T>());
        descriptor.state_accessor = Some(state_accessor::<T>());
        descriptor.registry_accessor = Some(registry_accessor::<T>());
        descriptor
    }

    /// Descriptor for map-backed `DataObject`s of the given type name.
    pub fn data_object(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let object_type = type_name.clone();
        Self::for_type::<DataObject, _>(type_name, move || DataObject::new(object_type.clone()))
    }

    // ------------------------------------------------------------------------
    // Builder-style configuration
    // ------------------------------------------------------------------------

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.add_property(property);
        self
    }

    pub fn with_attribute(self, name: &str) -> Self {
        self.with_property(Property::map_attribute(name))
    }

    pub fn with_to_one(self, name: &str, target_type: &str, reverse: Option<&str>) -> Self {
        self.with_property(Property::map_to_one(name, target_type, reverse))
    }

    pub fn with_to_many(self, name: &str, target_type: &str, reverse: Option<&str>) -> Self {
        self.with_property(Property::map_to_many(name, target_type, reverse))
    }

    /// Declare a property, replacing an earlier one with the same name in place.
    pub fn add_property(&mut self, property: Property) {
        self.declared
            .get_or_insert_with(IndexMap::new)
            .insert(property.name().to_string(), property);
    }

    pub fn set_factory(&mut self, factory: Factory) {
        self.factory = Some(factory);
    }

    pub fn set_properties(&mut self, properties: IndexMap<String, Property>) {
        self.declared = Some(properties);
    }

    pub fn set_object_id_accessor(&mut self, accessor: ObjectIdAccessor) {
        self.object_id_accessor = Some(accessor);
    }

    pub fn set_state_accessor(&mut self, accessor: StateAccessor) {
        self.state_accessor = Some(accessor);
    }

    pub fn set_registry_accessor(&mut self, accessor: RegistryAccessor) {
        self.registry_accessor = Some(accessor);
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn superclass_name(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Parts that still have to be supplied before the descriptor is valid.
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.factory.is_none() {
            missing.push("object class");
        }
        if self.declared.is_none() {
            missing.push("property set");
        }
        if self.object_id_accessor.is_none() {
            missing.push("object id accessor");
        }
        if self.registry_accessor.is_none() {
            missing.push("context accessor");
        }
        if self.state_accessor.is_none() {
            missing.push("persistence state accessor");
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_parts().is_empty()
    }

    pub fn ensure_valid(&self) -> Result<()> {
        let missing = self.missing_parts();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::configuration(
            &self.type_name,
            format!("missing {}", missing.join(", ")),
        ))
    }

    pub fn declared_property(&self, name: &str) -> Option<&Property> {
        self.declared.as_ref()?.get(name)
    }

    pub fn declared_properties(&self) -> impl Iterator<Item = &Property> {
        self.declared.iter().flat_map(|map| map.values())
    }

    // ------------------------------------------------------------------------
    // Object operations
    // ------------------------------------------------------------------------

    pub fn create_object(&self) -> Result<ObjectHandle> {
        self.ensure_valid()?;
        let Some(factory) = &self.factory else {
            return Err(Error::configuration(&self.type_name, "missing object class"));
        };
        factory().map_err(|reason| Error::Construction {
            type_name: self.type_name.clone(),
            reason,
        })
    }

    pub fn read_object_id(&self, object: &dyn Persistent) -> Result<Option<ObjectId>> {
        Ok(self.id_accessor()?.read(object)?)
    }

    pub fn write_object_id(&self, object: &mut dyn Persistent, id: Option<ObjectId>) -> Result<()> {
        Ok(self.id_accessor()?.write(object, id)?)
    }

    pub fn read_state(&self, object: &dyn Persistent) -> Result<PersistenceState> {
        Ok(self.state_accessor()?.read(object)?)
    }

    pub fn write_state(&self, object: &mut dyn Persistent, state: PersistenceState) -> Result<()> {
        Ok(self.state_accessor()?.write(object, state)?)
    }

    pub fn read_registry(&self, object: &dyn Persistent) -> Result<Option<RegistryToken>> {
        Ok(self.registry_accessor()?.read(object)?)
    }

    pub fn write_registry(
        &self,
        object: &mut dyn Persistent,
        token: Option<RegistryToken>,
    ) -> Result<()> {
        Ok(self.registry_accessor()?.write(object, token)?)
    }

    fn id_accessor(&self) -> Result<&ObjectIdAccessor> {
        self.object_id_accessor
            .as_ref()
            .ok_or_else(|| Error::configuration(&self.type_name, "missing object id accessor"))
    }

    fn state_accessor(&self) -> Result<&StateAccessor> {
        self.state_accessor.as_ref().ok_or_else(|| {
            Error::configuration(&self.type_name, "missing persistence state accessor")
        })
    }

    fn registry_accessor(&self) -> Result<&RegistryAccessor> {
        self.registry_accessor
            .as_ref()
            .ok_or_else(|| Error::configuration(&self.type_name, "missing context accessor"))
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("type_name", &self.type_name)
            .field("superclass", &self.superclass)
            .field(
                "declared",
                &self.declared_properties().map(Property::name).collect::<Vec<_>>(),
            )
            .field("valid", &self.is_valid())
            .finish()
    }
}
