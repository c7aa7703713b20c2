//! Error taxonomy shared by all objgraph crates.

use crate::id::ObjectId;
use crate::object::Persistent;
use crate::value::ValueError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a property could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum AccessErrorKind {
    #[error("a to-many relationship has no single value to read")]
    ToManyRead,

    #[error("object has no backing storage of type `{expected}`")]
    MissingBackingStorage { expected: &'static str },

    #[error(transparent)]
    TypeMismatch(#[from] ValueError),

    #[error("{0}")]
    Custom(String),
}

/// A property read/write failed on a particular object.
#[derive(Debug, thiserror::Error)]
#[error("cannot access property `{property}` of {object}")]
pub struct AccessError {
    pub property: String,
    pub object: String,
    #[source]
    pub kind: AccessErrorKind,
}

impl AccessError {
    pub fn new(property: &str, object: &dyn Persistent, kind: AccessErrorKind) -> Self {
        Self {
            property: property.to_string(),
            object: object.describe(),
            kind,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("cannot merge {object}: it has no object id")]
    MissingIdentity { object: String },

    #[error("cannot instantiate `{type_name}`: {reason}")]
    Construction { type_name: String, reason: String },

    #[error("descriptor for `{type_name}` cannot be used: {reason}")]
    Configuration { type_name: String, reason: String },

    #[error("{id} is already owned by {owner}")]
    ForeignRegistry {
        id: ObjectId,
        owner: crate::token::RegistryToken,
    },

    #[error("another object is already registered as {id}")]
    DuplicateId { id: ObjectId },

    #[error("{id} is not registered in this context")]
    NotRegistered { id: ObjectId },

    #[error("temporary id {id} has no permanent replacement")]
    UnresolvedTemporaryId { id: ObjectId },

    #[error("merge depth limit of {limit} exceeded at {id}")]
    DepthLimit { limit: usize, id: ObjectId },

    #[error("save failed: {0}")]
    Save(String),
}

impl Error {
    pub fn configuration(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}
