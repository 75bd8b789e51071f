//! Coarse-grained set: one lock serializes every writer.
//!
//! Search and snapshot walk the list without taking the lock, so readers
//! never block and never block writers. A reader can therefore be standing
//! on a node that a concurrent delete unlinks; the node is retired through
//! the epoch collector and stays valid (including its `next` link) until
//! every such reader has unpinned.
//!
//! Insert reports `true` for any in-domain key, including one that is
//! already present. A duplicate is never linked: the set is unchanged.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_epoch::{self as epoch, Guard, Owned, Shared};

use cl_core::{is_valid_key, ConcurrentSet, Key, ProgressGuarantee};

use crate::node::{free_chain, sentinel_pair, PlainNode};

/// Ordered set guarded by a single list-wide lock.
pub struct CoarseGrainedSet {
    head: PlainNode,
    write_lock: Mutex<()>,
}

impl CoarseGrainedSet {
    /// Create an empty set (head and tail sentinels only).
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: sentinel_pair(),
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Walk to the first node whose key is `>= key`.
    ///
    /// Returns that node's predecessor and the node itself. The tail
    /// sentinel bounds the walk for every in-domain key.
    fn find<'g>(&'g self, key: Key, guard: &'g Guard) -> (&'g PlainNode, Shared<'g, PlainNode>) {
        let mut pred = &self.head;
        let mut curr = pred.next.load(Ordering::Acquire, guard);

        loop {
            // SAFETY: links are never null before the tail, and unlinked
            // nodes are only destroyed after `guard` is released.
            let curr_ref = unsafe { curr.deref() };
            if curr_ref.key >= key {
                return (pred, curr);
            }
            pred = curr_ref;
            curr = curr_ref.next.load(Ordering::Acquire, guard);
        }
    }
}

impl Default for CoarseGrainedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentSet for CoarseGrainedSet {
    const NAME: &'static str = "CoarseGrainedSet";

    fn search(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let guard = epoch::pin();
        let (_, curr) = self.find(key, &guard);
        // SAFETY: see `find`.
        unsafe { curr.deref() }.key == key
    }

    fn insert(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let _write = self.lock();
        let guard = epoch::pin();
        let (pred, curr) = self.find(key, &guard);

        // SAFETY: see `find`.
        if unsafe { curr.deref() }.key != key {
            let node = Owned::new(PlainNode::new(key, curr));
            pred.next.store(node, Ordering::Release);
        }
        true
    }

    fn delete(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let _write = self.lock();
        let guard = epoch::pin();
        let (pred, curr) = self.find(key, &guard);

        // SAFETY: see `find`.
        let curr_ref = unsafe { curr.deref() };
        if curr_ref.key != key {
            return false;
        }

        let succ = curr_ref.next.load(Ordering::Acquire, &guard);
        pred.next.store(succ, Ordering::Release);
        // SAFETY: `curr` is no longer reachable from the list, and the
        // write lock guarantees no other writer unlinks it a second time.
        unsafe { guard.defer_destroy(curr) };
        true
    }

    fn snapshot(&self) -> Vec<Key> {
        let guard = epoch::pin();
        let mut keys = Vec::new();
        let mut curr = self.head.next.load(Ordering::Acquire, &guard);

        loop {
            // SAFETY: see `find`.
            let curr_ref = unsafe { curr.deref() };
            let next = curr_ref.next.load(Ordering::Acquire, &guard);
            if next.is_null() {
                return keys;
            }
            keys.push(curr_ref.key);
            curr = next;
        }
    }

    fn progress_guarantee(&self) -> ProgressGuarantee {
        ProgressGuarantee::Blocking
    }
}

impl Drop for CoarseGrainedSet {
    fn drop(&mut self) {
        // SAFETY: `&mut self` excludes every other accessor.
        let freed = unsafe { free_chain(&self.head) };
        log::trace!("{} dropped with {} nodes", Self::NAME, freed);
    }
}
