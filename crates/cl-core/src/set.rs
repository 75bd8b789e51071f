//! The ordered integer set contract shared by every list variant.
//!
//! # Key domain
//!
//! | Constant | Value | Role |
//! |----------|-------|------|
//! | `KEY_MIN` | `i32::MIN` | head sentinel, never stored |
//! | `KEY_MAX` | `i32::MAX` | tail sentinel, never stored |
//!
//! Keys strictly between the two sentinels are valid. Operations on a
//! sentinel-valued key report `false` and leave the set untouched.

use crate::progress::ProgressGuarantee;

/// Key stored in the sets.
pub type Key = i32;

/// Key held by the permanent head sentinel.
pub const KEY_MIN: Key = Key::MIN;

/// Key held by the permanent tail sentinel.
pub const KEY_MAX: Key = Key::MAX;

/// Whether `key` may be stored in a set.
#[inline]
#[must_use]
pub fn is_valid_key(key: Key) -> bool {
    key > KEY_MIN && key < KEY_MAX
}

/// Render keys separated by single spaces, e.g. `"17 19 20"`.
#[must_use]
pub fn format_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Contract shared by the coarse-grained, lazy and lock-free sets.
///
/// Every method takes `&self`: a single instance is shared between
/// threads and all synchronization is internal.
pub trait ConcurrentSet: Send + Sync {
    /// Short name used in reports.
    const NAME: &'static str;

    /// Whether `key` is currently in the set. Never mutates.
    fn search(&self, key: Key) -> bool;

    /// Add `key`. Returns `true` if the key was newly added.
    ///
    /// The coarse-grained variant also returns `true` when the key was
    /// already present (the set is left unchanged).
    fn insert(&self, key: Key) -> bool;

    /// Remove `key`. Returns `true` if it was removed, `false` if absent.
    fn delete(&self, key: Key) -> bool;

    /// Keys in ascending order.
    ///
    /// Best effort under concurrent mutation: the walk is not atomic
    /// across the whole structure.
    fn snapshot(&self) -> Vec<Key>;

    /// Progress guarantee of the mutating operations.
    fn progress_guarantee(&self) -> ProgressGuarantee;

    /// Snapshot rendered as space-separated keys.
    fn render(&self) -> String {
        format_keys(&self.snapshot())
    }

    /// Number of keys in a snapshot.
    fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether a snapshot is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hook invoked each time an optimistic operation has to start over.
///
/// The retry loops themselves are unbounded; a policy only changes the
/// timing between attempts, never the outcome. `State` lives for one
/// operation so policies can grow their delay across attempts.
pub trait RetryPolicy: Send + Sync {
    /// Per-operation state.
    type State;

    /// Called once when an operation begins.
    fn start(&self) -> Self::State;

    /// Called before every retry of the operation.
    fn on_retry(&self, state: &mut Self::State);
}

/// Retry immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl RetryPolicy for NoBackoff {
    type State = ();

    #[inline]
    fn start(&self) -> Self::State {}

    #[inline]
    fn on_retry(&self, _state: &mut Self::State) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_not_valid_keys() {
        assert!(!is_valid_key(KEY_MIN));
        assert!(!is_valid_key(KEY_MAX));
        assert!(is_valid_key(KEY_MIN + 1));
        assert!(is_valid_key(KEY_MAX - 1));
        assert!(is_valid_key(0));
    }

    #[test]
    fn test_format_keys() {
        assert_eq!(format_keys(&[]), "");
        assert_eq!(format_keys(&[19]), "19");
        assert_eq!(format_keys(&[17, 19, 20]), "17 19 20");
        assert_eq!(format_keys(&[-3, 0, 4]), "-3 0 4");
    }
}
