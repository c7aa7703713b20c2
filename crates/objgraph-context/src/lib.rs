//! Objgraph context: registries, uniquing merges and the object lifecycle.
//!
//! ```text
//!   source graph (NodeLookup)
//!          │
//!          ▼
//!   DeepMergeOperation ──(ObjectGraphVisitor)──► objgraph_reflect merge
//!          │
//!          ▼
//!   destination registry (GraphManager: ObjectStore / SharedObjectStore)
//! ```
//!
//! ## Module Organization
//!
//! - `registry`: `NodeLookup` / `GraphManager` and the two stores
//! - `merge`: `DeepMergeOperation`, the per-call uniquing visitor
//! - `context`: `ObjectContext` (registration, local edits with inverse
//!   arcs, deletion, commit)
//! - `graph_diff`: log of local edits
//! - `config`: `ContextConfig`

pub mod config;
pub mod context;
pub mod graph_diff;
pub mod merge;
pub mod registry;


pub use config::ContextConfig;
pub use context::{ChangeSet, ChangeSink, CommitSummary, MergeReport, ObjectContext, SaveOutcome};
pub use graph_diff::{GraphDiff, GraphDiffLog};
pub use merge::{DeepMergeOperation, MergeStats};
pub use registry::{GraphManager, NodeLookup, ObjectStore, SharedObjectStore};
