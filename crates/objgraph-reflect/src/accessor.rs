//! Low-level property access.
//!
//! Accessors are built once, when a descriptor is assembled, and reused for
//! every object of that type. Two storage shapes are supported out of the
//! box:
//! - `MapAccessor`: the value map of a `DataObject`
//! - `FieldAccessor<T>`: a getter/setter pair over a concrete struct
//!
//! Object identity, state and registry ownership have their own typed
//! accessors (`MetaAccessor`), usually derived from `HasObjectMeta`.

use objgraph_model::{
    downcast_mut, downcast_ref, AccessError, AccessErrorKind, DataObject, HasObjectMeta,
    ObjectId, ObjectMeta, PersistenceState, Persistent, RegistryToken, Value, ValueError,
};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// Raw read/write of one named property, without any relationship semantics.
pub trait PropertyAccessor: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn read_property_directly(&self, object: &dyn Persistent) -> Result<Value, AccessError>;

    fn write_property_directly(
        &self,
        object: &mut dyn Persistent,
        old_value: &Value,
        new_value: Value,
    ) -> Result<(), AccessError>;
}

fn missing_storage<T>() -> AccessErrorKind {
    AccessErrorKind::MissingBackingStorage {
        expected: type_name::<T>(),
    }
}

// ============================================================================
// Map-backed storage
// ============================================================================

/// Reads and writes an entry of a `DataObject` value map.
///
/// An absent entry reads as `Value::Null`.
#[derive(Debug, Clone)]
pub struct MapAccessor {
    name: String,
}

impl MapAccessor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PropertyAccessor for MapAccessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_property_directly(&self, object: &dyn Persistent) -> Result<Value, AccessError> {
        let data = downcast_ref::<DataObject>(object)
            .ok_or_else(|| AccessError::new(&self.name, object, missing_storage::<DataObject>()))?;
        Ok(data.value(&self.name).cloned().unwrap_or_default())
    }

    fn write_property_directly(
        &self,
        object: &mut dyn Persistent,
        _old_value: &Value,
        new_value: Value,
    ) -> Result<(), AccessError> {
        let Some(data) = downcast_mut::<DataObject>(object) else {
            return Err(AccessError::new(
                &self.name,
                object,
                missing_storage::<DataObject>(),
            ));
        };
        data.set_value(self.name.clone(), new_value);
        Ok(())
    }
}

// ============================================================================
// Struct fields
// ============================================================================

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, Value) -> Result<(), ValueError> + Send + Sync>;

/// Reads and writes a field of a concrete type through closures.
pub struct FieldAccessor<T> {
    name: String,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T: Persistent> FieldAccessor<T> {
    pub fn new<G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), ValueError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .finish()
    }
}

impl<T: Persistent> PropertyAccessor for FieldAccessor<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_property_directly(&self, object: &dyn Persistent) -> Result<Value, AccessError> {
        let typed = downcast_ref::<T>(object)
            .ok_or_else(|| AccessError::new(&self.name, object, missing_storage::<T>()))?;
        Ok((self.get)(typed))
    }

    fn write_property_directly(
        &self,
        object: &mut dyn Persistent,
        _old_value: &Value,
        new_value: Value,
    ) -> Result<(), AccessError> {
        let Some(typed) = downcast_mut::<T>(object) else {
            return Err(AccessError::new(&self.name, object, missing_storage::<T>()));
        };
        if let Err(err) = (self.set)(typed, new_value) {
            return Err(AccessError::new(
                &self.name,
                object,
                AccessErrorKind::TypeMismatch(err),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Identity / state / registry accessors
// ============================================================================

type MetaRead<V> = Arc<dyn Fn(&dyn Persistent) -> Result<V, AccessErrorKind> + Send + Sync>;
type MetaWrite<V> = Arc<dyn Fn(&mut dyn Persistent, V) -> Result<(), AccessErrorKind> + Send + Sync>;

/// Typed accessor for one piece of object metadata.
pub struct MetaAccessor<V> {
    name: &'static str,
    read: MetaRead<V>,
    write: MetaWrite<V>,
}

pub type ObjectIdAccessor = MetaAccessor<Option<ObjectId>>;
pub type StateAccessor = MetaAccessor<PersistenceState>;
pub type RegistryAccessor = MetaAccessor<Option<RegistryToken>>;

impl<V> MetaAccessor<V> {
    pub fn new<R, W>(name: &'static str, read: R, write: W) -> Self
    where
        R: Fn(&dyn Persistent) -> Result<V, AccessErrorKind> + Send + Sync + 'static,
        W: Fn(&mut dyn Persistent, V) -> Result<(), AccessErrorKind> + Send + Sync + 'static,
    {
        Self {
            name,
            read: Arc::new(read),
            write: Arc::new(write),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn read(&self, object: &dyn Persistent) -> Result<V, AccessError> {
        (self.read)(object).map_err(|kind| AccessError::new(self.name, object, kind))
    }

    pub fn write(&self, object: &mut dyn Persistent, value: V) -> Result<(), AccessError> {
        match (self.write)(object, value) {
            Ok(()) => Ok(()),
            Err(kind) => Err(AccessError::new(self.name, object, kind)),
        }
    }
}

impl<V> Clone for MetaAccessor<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            read: Arc::clone(&self.read),
            write: Arc::clone(&self.write),
        }
    }
}

impl<V> fmt::Debug for MetaAccessor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaAccessor")
            .field("name", &self.name)
            .finish()
    }
}

fn meta_of<T: HasObjectMeta>(object: &dyn Persistent) -> Result<&ObjectMeta, AccessErrorKind> {
    downcast_ref::<T>(object)
        .map(|o| o.meta())
        .ok_or_else(missing_storage::<T>)
}

fn meta_of_mut<T: HasObjectMeta>(
    object: &mut dyn Persistent,
) -> Result<&mut ObjectMeta, AccessErrorKind> {
    downcast_mut::<T>(object)
        .map(|o| o.meta_mut())
        .ok_or_else(missing_storage::<T>)
}

pub fn object_id_accessor<T: HasObjectMeta>() -> ObjectIdAccessor {
    MetaAccessor::new(
        "objectId",
        |object| Ok(meta_of::<T>(object)?.object_id.clone()),
        |object, id| {
            meta_of_mut::<T>(object)?.object_id = id;
            Ok(())
        },
    )
}

pub fn state_accessor<T: HasObjectMeta>() -> StateAccessor {
    MetaAccessor::new(
        "persistenceState",
        |object| Ok(meta_of::<T>(object)?.state),
        |object, state| {
            meta_of_mut::<T>(object)?.state = state;
            Ok(())
        },
    )
}

pub fn registry_accessor<T: HasObjectMeta>() -> RegistryAccessor {
    MetaAccessor::new(
        "registry",
        |object| Ok(meta_of::<T>(object)?.registry),
        |object, token| {
            meta_of_mut::<T>(object)?.registry = token;
            Ok(())
        },
    )
}
