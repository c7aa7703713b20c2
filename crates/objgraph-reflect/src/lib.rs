//! Objgraph reflect: describing object types at runtime.
//!
//! ## Module Organization
//!
//! - `accessor`: raw property storage access (map-backed, struct fields,
//!   object metadata)
//! - `property`: the `Property` sum type (attribute, to-one, to-many)
//! - `descriptor`: per-type `ClassDescriptor`
//! - `resolver`: the `EntityResolver` descriptor arena and `DescriptorRef`
//!   cascading operations
//! - `merge`: the `ObjectGraphVisitor` seam and the deep-merge algorithm

pub mod accessor;
pub mod descriptor;
pub mod merge;
pub mod property;
pub mod resolver;


pub use accessor::{
    object_id_accessor, registry_accessor, state_accessor, FieldAccessor, MapAccessor,
    MetaAccessor, ObjectIdAccessor, PropertyAccessor, RegistryAccessor, StateAccessor,
};
pub use descriptor::{ClassDescriptor, Factory};
pub use merge::{merge_related, ObjectGraphVisitor};
pub use property::{ArcProperty, AttributeProperty, Property};
pub use resolver::{DescriptorId, DescriptorRef, EntityResolver};
