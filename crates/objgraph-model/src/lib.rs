//! Objgraph model: the vocabulary of a persistent object graph.
//!
//! - `id`: object identifiers, temporary ids and the replacement protocol
//! - `value`: property values, relationship references and fault markers
//! - `state`: the persistence state machine
//! - `object`: the `Persistent` trait, `ObjectHandle`, and the map-backed
//!   `DataObject`
//! - `token`: process-local registry ownership tokens
//! - `error`: the error taxonomy used by descriptors, merges and contexts

pub mod error;
pub mod id;
pub mod object;
pub mod state;
pub mod token;
pub mod value;

pub use error::{AccessError, AccessErrorKind, Error, Result};
pub use id::{KeyValue, ObjectId};
pub use object::{
    downcast_mut, downcast_ref, into_handle, DataObject, HasObjectMeta, ObjectHandle, ObjectMeta,
    Persistent,
};
pub use state::PersistenceState;
pub use token::RegistryToken;
pub use value::{Fault, Value, ValueError};
