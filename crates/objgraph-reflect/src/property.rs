//! Properties: named, typed views over one attribute or relationship.
//!
//! A `Property` is bound to a (type, name) pair when its descriptor is built
//! and carries no per-object state. The three variants share one contract:
//!
//! | operation           | attribute   | to-one                | to-many                          |
//! |---------------------|-------------|-----------------------|----------------------------------|
//! | `prepare_for_access`| no-op       | no-op                 | allocate empty collection        |
//! | `read_value`        | get         | get                   | access error                     |
//! | `write_value`       | set         | set                   | remove old, add new              |
//! | `shallow_merge`     | copy        | copy reference        | nothing                          |
//! | `deep_merge`        | copy        | merge target, link it | merge each element, add missing  |
//!
//! Writes never touch the inverse relationship; that is the job of the
//! context's graph actions.

use crate::accessor::{MapAccessor, PropertyAccessor};
use crate::merge::{merge_related, ObjectGraphVisitor};
use crate::resolver::EntityResolver;
use objgraph_model::{
    AccessError, AccessErrorKind, Fault, ObjectHandle, ObjectId, Persistent, Result, Value,
    ValueError,
};
use std::sync::Arc;

/// A scalar property.
#[derive(Debug, Clone)]
pub struct AttributeProperty {
    name: String,
    accessor: Arc<dyn PropertyAccessor>,
}

/// A relationship property (to-one or to-many).
#[derive(Debug, Clone)]
pub struct ArcProperty {
    name: String,
    accessor: Arc<dyn PropertyAccessor>,
    target_type: String,
    reverse_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Property {
    Attribute(AttributeProperty),
    ToOne(ArcProperty),
    ToMany(ArcProperty),
}

impl ArcProperty {
    pub fn new(
        name: impl Into<String>,
        accessor: Arc<dyn PropertyAccessor>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            accessor,
            target_type: target_type.into(),
            reverse_name: None,
        }
    }

    pub fn with_reverse(mut self, reverse_name: impl Into<String>) -> Self {
        self.reverse_name = Some(reverse_name.into());
        self
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn reverse_name(&self) -> Option<&str> {
        self.reverse_name.as_deref()
    }
}

impl Property {
    pub fn attribute(name: impl Into<String>, accessor: Arc<dyn PropertyAccessor>) -> Self {
        Property::Attribute(AttributeProperty {
            name: name.into(),
            accessor,
        })
    }

    /// Attribute stored in a `DataObject` value map.
    pub fn map_attribute(name: &str) -> Self {
        Self::attribute(name, Arc::new(MapAccessor::new(name)))
    }

    pub fn to_one(arc: ArcProperty) -> Self {
        Property::ToOne(arc)
    }

    pub fn to_many(arc: ArcProperty) -> Self {
        Property::ToMany(arc)
    }

    /// To-one relationship stored in a `DataObject` value map.
    pub fn map_to_one(name: &str, target_type: &str, reverse: Option<&str>) -> Self {
        Property::ToOne(map_arc(name, target_type, reverse))
    }

    /// To-many relationship stored in a `DataObject` value map.
    pub fn map_to_many(name: &str, target_type: &str, reverse: Option<&str>) -> Self {
        Property::ToMany(map_arc(name, target_type, reverse))
    }

    pub fn name(&self) -> &str {
        match self {
            Property::Attribute(p) => &p.name,
            Property::ToOne(p) | Property::ToMany(p) => &p.name,
        }
    }

    pub fn accessor(&self) -> &Arc<dyn PropertyAccessor> {
        match self {
            Property::Attribute(p) => &p.accessor,
            Property::ToOne(p) | Property::ToMany(p) => &p.accessor,
        }
    }

    pub fn as_arc(&self) -> Option<&ArcProperty> {
        match self {
            Property::Attribute(_) => None,
            Property::ToOne(p) | Property::ToMany(p) => Some(p),
        }
    }

    pub fn read_property_directly(&self, object: &dyn Persistent) -> Result<Value, AccessError> {
        self.accessor().read_property_directly(object)
    }

    pub fn write_property_directly(
        &self,
        object: &mut dyn Persistent,
        old_value: &Value,
        new_value: Value,
    ) -> Result<(), AccessError> {
        self.accessor()
            .write_property_directly(object, old_value, new_value)
    }

    /// Variant-specific setup before any read or write. Idempotent.
    pub fn prepare_for_access(&self, object: &mut dyn Persistent) -> Result<(), AccessError> {
        let Property::ToMany(_) = self else {
            return Ok(());
        };
        let current = self.read_property_directly(object)?;
        if current.is_absent() {
            self.write_property_directly(object, &current, Value::Objects(Vec::new()))?;
        }
        Ok(())
    }

    pub fn read_value(&self, object: &dyn Persistent) -> Result<Value, AccessError> {
        match self {
            Property::ToMany(p) => Err(AccessError::new(
                &p.name,
                object,
                AccessErrorKind::ToManyRead,
            )),
            _ => self.read_property_directly(object),
        }
    }

    /// Write one value.
    ///
    /// For a to-many property this means: remove `old_value` from the
    /// collection (if it is an object reference), then add `new_value` (if it
    /// is one and not already present).
    pub fn write_value(
        &self,
        object: &mut dyn Persistent,
        old_value: &Value,
        new_value: Value,
    ) -> Result<(), AccessError> {
        let Property::ToMany(p) = self else {
            return self.write_property_directly(object, old_value, new_value);
        };

        let current = self.read_property_directly(object)?;
        let mut ids = collection_of(&p.name, object, current.clone())?;

        match old_value {
            Value::Object(old) => ids.retain(|id| id != old),
            Value::Null => {}
            other => return Err(arc_mismatch(&p.name, object, other)),
        }
        match new_value {
            Value::Object(new) => {
                if !ids.contains(&new) {
                    ids.push(new);
                }
            }
            Value::Null => {}
            other => return Err(arc_mismatch(&p.name, object, &other)),
        }

        self.write_property_directly(object, &current, Value::Objects(ids))
    }

    /// Copy scalar state from `from` into `to`; relationships are not traversed.
    pub fn shallow_merge(
        &self,
        from: &dyn Persistent,
        to: &mut dyn Persistent,
    ) -> Result<(), AccessError> {
        match self {
            Property::Attribute(_) => {
                let value = self.read_property_directly(from)?;
                let old = self.read_property_directly(to)?;
                self.write_property_directly(to, &old, value)
            }
            Property::ToOne(_) => {
                let value = self.read_property_directly(from)?;
                if value.is_fault() {
                    return Ok(());
                }
                let old = self.read_property_directly(to)?;
                self.write_property_directly(to, &old, value)
            }
            Property::ToMany(_) => Ok(()),
        }
    }

    /// Merge this property from `from` into `to`, resolving related objects
    /// through the visitor's uniquing context.
    ///
    /// No lock is held while related objects are merged, so cycles that lead
    /// back to `from` or `to` are safe.
    pub fn deep_merge(
        &self,
        from: &ObjectHandle,
        to: &ObjectHandle,
        resolver: &EntityResolver,
        visitor: &mut dyn ObjectGraphVisitor,
    ) -> Result<()> {
        let source_value = {
            let from = from.read_recursive();
            self.read_property_directly(&*from)?
        };

        match self {
            Property::Attribute(_) => {
                let mut to = to.write();
                let old = self.read_property_directly(&*to)?;
                self.write_property_directly(&mut *to, &old, source_value)?;
            }
            Property::ToOne(p) => {
                let linked = match source_value {
                    Value::Fault(_) => return Ok(()),
                    Value::Null => Value::Null,
                    Value::Object(id) => {
                        let (key, _) = merge_related(resolver, &p.target_type, &id, visitor)?;
                        Value::Object(key)
                    }
                    other => {
                        let to = to.read();
                        return Err(arc_mismatch(&p.name, &*to, &other).into());
                    }
                };
                let mut to = to.write();
                let old = absent_as_null(self.read_property_directly(&*to)?);
                self.write_property_directly(&mut *to, &old, linked)?;
            }
            Property::ToMany(p) => {
                let source_ids = match source_value {
                    Value::Fault(_) => return Ok(()),
                    Value::Null => Vec::new(),
                    Value::Objects(ids) => ids,
                    other => {
                        let to = to.read();
                        return Err(arc_mismatch(&p.name, &*to, &other).into());
                    }
                };

                let mut linked = Vec::with_capacity(source_ids.len());
                for id in &source_ids {
                    let (key, _) = merge_related(resolver, &p.target_type, id, visitor)?;
                    linked.push(key);
                }

                // Existing members stay; merged targets are added in source order.
                let mut to = to.write();
                for key in linked {
                    self.write_value(&mut *to, &Value::Null, Value::Object(key))?;
                }
            }
        }
        Ok(())
    }
}

fn map_arc(name: &str, target_type: &str, reverse: Option<&str>) -> ArcProperty {
    let arc = ArcProperty::new(name, Arc::new(MapAccessor::new(name)), target_type);
    match reverse {
        Some(reverse) => arc.with_reverse(reverse),
        None => arc,
    }
}

fn absent_as_null(value: Value) -> Value {
    if value.is_fault() {
        Value::Null
    } else {
        value
    }
}

fn arc_mismatch(property: &str, object: &dyn Persistent, found: &Value) -> AccessError {
    AccessError::new(
        property,
        object,
        AccessErrorKind::TypeMismatch(ValueError::TypeMismatch {
            expected: "object",
            found: found.kind_name(),
        }),
    )
}

fn collection_of(
    property: &str,
    object: &dyn Persistent,
    value: Value,
) -> Result<Vec<ObjectId>, AccessError> {
    match value {
        Value::Fault(Fault::ToOne) => Err(arc_mismatch(property, object, &value)),
        other => Vec::<ObjectId>::try_from(other)
            .map_err(|err| AccessError::new(property, object, AccessErrorKind::TypeMismatch(err))),
    }
}
