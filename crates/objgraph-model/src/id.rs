//! Object identifiers.
//!
//! An `ObjectId` names one persistent object within its entity family. It is
//! either:
//! - **permanent**: a (possibly compound) key of typed values, or
//! - **temporary**: a random byte key handed out before the durable key is
//!   known (objects that were never saved).
//!
//! A temporary id can carry a *replacement*: the permanent id it turns into
//! once the save layer reports it. Replacement data is bookkeeping only and
//! takes no part in equality or hashing; registry lookups use
//! [`ObjectId::lookup_key`] so that an id with a known replacement resolves to
//! its permanent form.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

// ============================================================================
// Key values
// ============================================================================

/// One component of a permanent key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Text(v) => write!(f, "{v:?}"),
            KeyValue::Bytes(v) => write_hex(f, v),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(value as i64)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(value: Vec<u8>) -> Self {
        KeyValue::Bytes(value)
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02X}")?;
    }
    Ok(())
}

// ============================================================================
// ObjectId
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum IdKey {
    Temporary(Vec<u8>),
    Permanent(BTreeMap<String, KeyValue>),
}

/// Identifier of a persistent object.
#[derive(Clone, Serialize, Deserialize)]
pub struct ObjectId {
    entity: String,
    key: IdKey,
    #[serde(skip)]
    replacement: Option<Box<ObjectId>>,
    #[serde(skip)]
    replacement_values: BTreeMap<String, KeyValue>,
}

impl ObjectId {
    /// Permanent id with a single key column.
    pub fn permanent(
        entity: impl Into<String>,
        key_name: impl Into<String>,
        value: impl Into<KeyValue>,
    ) -> Self {
        let mut values = BTreeMap::new();
        values.insert(key_name.into(), value.into());
        Self::from_key(entity.into(), IdKey::Permanent(values))
    }

    /// Permanent id with a compound key.
    pub fn compound<K, I>(entity: impl Into<String>, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, KeyValue)>,
    {
        let values = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::from_key(entity.into(), IdKey::Permanent(values))
    }

    /// Fresh temporary id with a random key.
    pub fn temporary(entity: impl Into<String>) -> Self {
        Self::temporary_with_key(entity, Uuid::new_v4().as_bytes().to_vec())
    }

    pub fn temporary_with_key(entity: impl Into<String>, key: Vec<u8>) -> Self {
        Self::from_key(entity.into(), IdKey::Temporary(key))
    }

    fn from_key(entity: String, key: IdKey) -> Self {
        Self {
            entity,
            key,
            replacement: None,
            replacement_values: BTreeMap::new(),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.key, IdKey::Temporary(_))
    }

    /// Key columns of a permanent id; `None` for temporary ids.
    pub fn key_values(&self) -> Option<&BTreeMap<String, KeyValue>> {
        match &self.key {
            IdKey::Permanent(values) => Some(values),
            IdKey::Temporary(_) => None,
        }
    }

    pub fn key_value(&self, name: &str) -> Option<&KeyValue> {
        self.key_values()?.get(name)
    }

    // ------------------------------------------------------------------------
    // Replacement protocol
    // ------------------------------------------------------------------------

    /// The explicitly attached replacement id, if any.
    pub fn replacement_id(&self) -> Option<&ObjectId> {
        self.replacement.as_deref()
    }

    pub fn set_replacement_id(&mut self, id: ObjectId) {
        self.replacement = Some(Box::new(id.without_replacement()));
    }

    /// Key values gathered for the replacement, one column at a time.
    pub fn replacement_values_mut(&mut self) -> &mut BTreeMap<String, KeyValue> {
        &mut self.replacement_values
    }

    pub fn is_replacement_attached(&self) -> bool {
        self.replacement.is_some() || !self.replacement_values.is_empty()
    }

    /// Build the permanent id this id should be replaced with.
    ///
    /// An explicit replacement wins. Otherwise attached replacement values are
    /// overlaid on the current permanent key (or used alone for a temporary
    /// id). A permanent id with nothing attached replaces to itself.
    pub fn create_replacement_id(&self) -> Result<ObjectId> {
        if let Some(replacement) = &self.replacement {
            return Ok(replacement.as_ref().clone());
        }

        if !self.replacement_values.is_empty() {
            let mut values = self.key_values().cloned().unwrap_or_default();
            for (name, value) in &self.replacement_values {
                values.insert(name.clone(), value.clone());
            }
            return Ok(Self::from_key(self.entity.clone(), IdKey::Permanent(values)));
        }

        if self.is_temporary() {
            return Err(Error::UnresolvedTemporaryId { id: self.clone() });
        }
        Ok(self.without_replacement())
    }

    /// Key used for registry and uniquing lookups.
    pub fn lookup_key(&self) -> Cow<'_, ObjectId> {
        if self.is_temporary() && self.is_replacement_attached() {
            if let Ok(permanent) = self.create_replacement_id() {
                return Cow::Owned(permanent);
            }
        }
        Cow::Borrowed(self)
    }

    fn without_replacement(&self) -> ObjectId {
        Self::from_key(self.entity.clone(), self.key.clone())
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.key == other.key
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            IdKey::Temporary(bytes) => {
                write!(f, "{}<TEMP:", self.entity)?;
                write_hex(f, bytes)?;
                write!(f, ">")
            }
            IdKey::Permanent(values) => {
                write!(f, "{}:", self.entity)?;
                for (i, (name, value)) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_keys_are_interchangeable() {
        let a = ObjectId::permanent("Artist", "ID", 42);
        let b = ObjectId::permanent("Artist", "ID", 42i64);
        let c = ObjectId::permanent("Painting", "ID", 42);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn test_compound_key_order_does_not_matter() {
        let a = ObjectId::compound(
            "Link",
            [("A", KeyValue::Int(1)), ("B", KeyValue::Text("x".into()))],
        );
        let b = ObjectId::compound(
            "Link",
            [("B", KeyValue::Text("x".into())), ("A", KeyValue::Int(1))],
        );
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Link:A=1,B=\"x\"");
    }

    #[test]
    fn test_temporary_ids_are_unique() {
        let a = ObjectId::temporary("Artist");
        let b = ObjectId::temporary("Artist");
        assert!(a.is_temporary());
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("Artist<TEMP:"));
    }

    #[test]
    fn test_replacement_is_ignored_by_equality() {
        let mut a = ObjectId::temporary_with_key("Artist", vec![1, 2]);
        let b = ObjectId::temporary_with_key("Artist", vec![1, 2]);
        a.set_replacement_id(ObjectId::permanent("Artist", "ID", 5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_create_replacement_from_attached_values() {
        let mut id = ObjectId::temporary("Artist");
        assert!(matches!(
            id.create_replacement_id(),
            Err(Error::UnresolvedTemporaryId { .. })
        ));

        id.replacement_values_mut()
            .insert("ID".to_string(), KeyValue::Int(9));
        assert!(id.is_replacement_attached());
        let permanent = id.create_replacement_id().unwrap();
        assert!(!permanent.is_temporary());
        assert_eq!(permanent, ObjectId::permanent("Artist", "ID", 9));
    }

    #[test]
    fn test_replacement_values_overlay_permanent_key() {
        let mut id = ObjectId::compound(
            "Link",
            [("A", KeyValue::Int(1)), ("B", KeyValue::Int(2))],
        );
        id.replacement_values_mut()
            .insert("B".to_string(), KeyValue::Int(3));
        let replaced = id.create_replacement_id().unwrap();
        assert_eq!(replaced.key_value("A"), Some(&KeyValue::Int(1)));
        assert_eq!(replaced.key_value("B"), Some(&KeyValue::Int(3)));
    }

    #[test]
    fn test_lookup_key_prefers_permanent_replacement() {
        let permanent = ObjectId::permanent("Artist", "ID", 7);
        let mut temp = ObjectId::temporary("Artist");
        assert_eq!(temp.lookup_key().as_ref(), &temp);

        temp.set_replacement_id(permanent.clone());
        assert_eq!(temp.lookup_key().as_ref(), &permanent);
        assert_eq!(temp.replacement_id(), Some(&permanent));

        // Permanent ids always look themselves up.
        let mut p = permanent.clone();
        p.set_replacement_id(ObjectId::permanent("Artist", "ID", 8));
        assert_eq!(p.lookup_key().as_ref(), &permanent);
    }
}
