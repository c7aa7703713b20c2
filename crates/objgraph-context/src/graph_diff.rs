//! Log of local graph edits since the last commit.

use objgraph_model::{ObjectId, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphDiff {
    NodeCreated {
        id: ObjectId,
    },
    NodeRemoved {
        id: ObjectId,
    },
    PropertyChanged {
        id: ObjectId,
        property: String,
        old: Value,
        new: Value,
    },
    ArcCreated {
        id: ObjectId,
        property: String,
        target: ObjectId,
    },
    ArcDeleted {
        id: ObjectId,
        property: String,
        target: ObjectId,
    },
}

impl GraphDiff {
    /// The object the edit was made on.
    pub fn node(&self) -> &ObjectId {
        match self {
            GraphDiff::NodeCreated { id }
            | GraphDiff::NodeRemoved { id }
            | GraphDiff::PropertyChanged { id, .. }
            | GraphDiff::ArcCreated { id, .. }
            | GraphDiff::ArcDeleted { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphDiffLog {
    enabled: bool,
    entries: Vec<GraphDiff>,
}

impl GraphDiffLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, diff: GraphDiff) {
        if self.enabled {
            self.entries.push(diff);
        }
    }

    pub fn entries(&self) -> &[GraphDiff] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
