//! Runtime "branding" for registry ownership.
//!
//! A persistent object belongs to at most one registry at a time. Each
//! registry instance gets a fresh `RegistryToken`, and objects record the
//! token of the registry that owns them so a second registration can be
//! detected at the registry boundary.
//!
//! This is a process-local mechanism, not a persistence identity, and is
//! never serialized.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REGISTRY_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A process-local token identifying one registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryToken(NonZeroU64);

impl RegistryToken {
    pub fn new() -> Self {
        let raw = NEXT_REGISTRY_TOKEN.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 registries to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl Default for RegistryToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry#{}", self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_distinct() {
        let a = RegistryToken::new();
        let b = RegistryToken::new();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }
}
