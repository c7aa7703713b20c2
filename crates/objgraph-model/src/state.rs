//! Persistence state machine.
//!
//! ```text
//! TRANSIENT ── register, temporary id ──► NEW
//! TRANSIENT ── register, permanent id ──► HOLLOW
//! HOLLOW    ── merge ─────────────────────► COMMITTED
//! COMMITTED ── local write ───────────────► MODIFIED
//! NEW, MODIFIED ── save ──────────────────► COMMITTED
//! any registered ── delete ───────────────► DELETED ── save ──► TRANSIENT
//! ```

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PersistenceState {
    /// Not registered in any registry.
    #[default]
    Transient,
    /// Registered, never saved.
    New,
    /// Registered with a known id, properties not populated yet.
    Hollow,
    /// Registered, matches the durable store.
    Committed,
    /// Registered, edited locally since the last commit.
    Modified,
    /// Registered, marked for removal.
    Deleted,
}

impl PersistenceState {
    pub const ALL: [PersistenceState; 6] = [
        PersistenceState::Transient,
        PersistenceState::New,
        PersistenceState::Hollow,
        PersistenceState::Committed,
        PersistenceState::Modified,
        PersistenceState::Deleted,
    ];

    /// State an object takes when it is registered under `id`.
    pub fn on_registration(id: &ObjectId) -> Self {
        if id.is_temporary() {
            PersistenceState::New
        } else {
            PersistenceState::Hollow
        }
    }

    /// Objects carrying unsaved local changes or a pending deletion.
    pub fn is_dirty(self) -> bool {
        matches!(
            self,
            PersistenceState::New | PersistenceState::Modified | PersistenceState::Deleted
        )
    }

    /// Whether an incoming merge may overwrite properties in this state.
    pub fn accepts_merge(self) -> bool {
        !self.is_dirty()
    }

    pub fn after_merge(self) -> Self {
        match self {
            PersistenceState::Hollow => PersistenceState::Committed,
            other => other,
        }
    }

    pub fn after_local_write(self) -> Self {
        match self {
            PersistenceState::Hollow | PersistenceState::Committed => PersistenceState::Modified,
            other => other,
        }
    }

    pub fn after_delete(self) -> Self {
        match self {
            PersistenceState::Transient => PersistenceState::Transient,
            _ => PersistenceState::Deleted,
        }
    }

    pub fn after_save(self) -> Self {
        match self {
            PersistenceState::New | PersistenceState::Modified => PersistenceState::Committed,
            PersistenceState::Deleted => PersistenceState::Transient,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PersistenceState::Transient => "transient",
            PersistenceState::New => "new",
            PersistenceState::Hollow => "hollow",
            PersistenceState::Committed => "committed",
            PersistenceState::Modified => "modified",
            PersistenceState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for PersistenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PersistenceState::*;

    #[test]
    fn test_registration_depends_on_id_kind() {
        assert_eq!(
            PersistenceState::on_registration(&ObjectId::temporary("A")),
            New
        );
        assert_eq!(
            PersistenceState::on_registration(&ObjectId::permanent("A", "ID", 1)),
            Hollow
        );
    }

    #[test]
    fn test_only_clean_states_accept_merge() {
        let accepting: Vec<_> = PersistenceState::ALL
            .into_iter()
            .filter(|s| s.accepts_merge())
            .collect();
        assert_eq!(accepting, vec![Transient, Hollow, Committed]);
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert_eq!(Hollow.after_merge(), Committed);
        assert_eq!(Committed.after_merge(), Committed);
        assert_eq!(Committed.after_local_write(), Modified);
        assert_eq!(New.after_local_write(), New);
        assert_eq!(Modified.after_save(), Committed);
        assert_eq!(New.after_save(), Committed);
        assert_eq!(Deleted.after_save(), Transient);
        for s in [New, Hollow, Committed, Modified, Deleted] {
            assert_eq!(s.after_delete(), Deleted);
        }
        assert_eq!(Transient.after_delete(), Transient);
    }
}
