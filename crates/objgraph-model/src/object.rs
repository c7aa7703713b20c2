//! Persistent objects and shared handles.
//!
//! Objects are stored behind an `ObjectHandle` (`Arc<RwLock<dyn Persistent>>`)
//! so a registry can own them while merge and graph code reads and writes
//! them without knowing the concrete type. Property access goes through the
//! accessors of a class descriptor; the `Persistent` trait itself only exposes
//! what those accessors need to downcast.

use crate::id::ObjectId;
use crate::state::PersistenceState;
use crate::token::RegistryToken;
use crate::value::Value;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A value that can live in an object graph.
pub trait Persistent: Any + Send + Sync + fmt::Debug {
    /// Runtime type name. Descriptors are resolved against it.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Short description for diagnostics.
    fn describe(&self) -> String {
        self.type_name().to_string()
    }
}

/// Shared, lockable reference to a persistent object.
pub type ObjectHandle = Arc<RwLock<dyn Persistent>>;

pub fn into_handle<T: Persistent>(object: T) -> ObjectHandle {
    Arc::new(RwLock::new(object))
}

pub fn downcast_ref<T: Persistent>(object: &dyn Persistent) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}

pub fn downcast_mut<T: Persistent>(object: &mut dyn Persistent) -> Option<&mut T> {
    object.as_any_mut().downcast_mut::<T>()
}

// ============================================================================
// Object metadata
// ============================================================================

/// Identity, lifecycle state and owning registry of an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMeta {
    pub object_id: Option<ObjectId>,
    pub state: PersistenceState,
    pub registry: Option<RegistryToken>,
}

/// Types that keep their metadata in an embedded `ObjectMeta`.
///
/// Descriptors build their id, state and registry accessors from this.
pub trait HasObjectMeta: Persistent {
    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

// ============================================================================
// DataObject
// ============================================================================

/// Generic map-backed persistent object.
#[derive(Debug, Clone)]
pub struct DataObject {
    type_name: String,
    meta: ObjectMeta,
    values: BTreeMap<String, Value>,
}

impl DataObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            meta: ObjectMeta::default(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_id(type_name: impl Into<String>, id: ObjectId) -> Self {
        let mut object = Self::new(type_name);
        object.meta.object_id = Some(id);
        object
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with_state(mut self, state: PersistenceState) -> Self {
        self.meta.state = state;
        self
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn remove_value(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn object_id(&self) -> Option<&ObjectId> {
        self.meta.object_id.as_ref()
    }

    pub fn state(&self) -> PersistenceState {
        self.meta.state
    }
}

impl Persistent for DataObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn describe(&self) -> String {
        match &self.meta.object_id {
            Some(id) => format!("{} {}", self.type_name, id),
            None => format!("{} (no id)", self.type_name),
        }
    }
}

impl HasObjectMeta for DataObject {
    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_object_values() {
        let mut object = DataObject::with_id("Artist", ObjectId::permanent("Artist", "ID", 1))
            .with_value("name", "Monet");
        assert_eq!(object.value("name"), Some(&Value::Text("Monet".into())));
        assert_eq!(object.describe(), "Artist Artist:ID=1");

        let previous = object.set_value("name", Value::Null);
        assert_eq!(previous, Some(Value::Text("Monet".into())));
        assert_eq!(object.values().count(), 1);
    }

    #[test]
    fn test_handle_downcast() {
        let handle = into_handle(DataObject::new("Artist"));
        let guard = handle.read();
        assert!(downcast_ref::<DataObject>(&*guard).is_some());
        assert_eq!(guard.type_name(), "Artist");
    }
}
