//! Versioned dirty tracking.
//!
//! Every mutable value that feeds the GPU carries a [`VersionedObject`]. Its
//! `global_id` is unique for the lifetime of the process and its `revision`
//! moves forward on each mutation. Consumers keep a [`Version`] snapshot and
//! re-upload only when the snapshot differs from the source.

use std::sync::atomic::{AtomicU32, Ordering};

/// Next id handed out to a versioned object. Zero is reserved for
/// [`Version::default`], so a fresh snapshot never matches a live object.
static NEXT_GLOBAL_ID: AtomicU32 = AtomicU32::new(1);

/// Snapshot of a versioned object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub global_id: u32,
    pub revision: u32,
}

impl Version {
    /// Take over the id and revision of another snapshot.
    pub fn copy_from(&mut self, other: Version) {
        self.global_id = other.global_id;
        self.revision = other.revision;
    }
}

/// Owner of a monotonically advancing [`Version`].
///
/// The revision is a `u32` and wraps after `u32::MAX` increments, so it only
/// increases strictly up to that many mutations of one object.
#[derive(Debug)]
pub struct VersionedObject {
    version: Version,
}

impl VersionedObject {
    pub fn new() -> Self {
        let global_id = NEXT_GLOBAL_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            version: Version {
                global_id,
                revision: 0,
            },
        }
    }

    /// Advance the revision. The global id never changes.
    pub fn increment(&mut self) {
        self.version.revision = self.version.revision.wrapping_add(1);
    }

    pub fn version(&self) -> Version {
        self.version
    }
}

/// A clone is a distinct object: it gets a fresh global id and starts from
/// the source's revision.
impl Clone for VersionedObject {
    fn clone(&self) -> Self {
        let mut clone = Self::new();
        clone.version.revision = self.version.revision;
        clone
    }
}

impl Default for VersionedObject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_ids_are_unique() {
        let a = VersionedObject::new();
        let b = VersionedObject::new();
        assert_ne!(a.version().global_id, b.version().global_id);
        assert!(a.version().global_id >= 1);
        assert_eq!(a.version().revision, 0);
    }

    #[test]
    fn test_increment_only_bumps_revision() {
        let mut object = VersionedObject::new();
        let before = object.version();
        object.increment();
        object.increment();
        let after = object.version();
        assert_eq!(after.global_id, before.global_id);
        assert_eq!(after.revision, before.revision + 2);
        assert_ne!(before, after);
    }

    #[test]
    fn test_clone_takes_a_fresh_id() {
        let mut object = VersionedObject::new();
        object.increment();
        let clone = object.clone();
        assert_ne!(clone.version().global_id, object.version().global_id);
        assert_eq!(clone.version().revision, 1);
        assert_ne!(clone.version(), object.version());
    }

    #[test]
    fn test_default_version_never_matches() {
        let object = VersionedObject::new();
        let mut snapshot = Version::default();
        assert_eq!(snapshot, Version { global_id: 0, revision: 0 });
        assert_ne!(snapshot, object.version());

        snapshot.copy_from(object.version());
        assert_eq!(snapshot, object.version());
    }
}
