//! Lazy set: optimistic traversal, per-node locks, validation and retry.
//!
//! Mutations walk without locks to a window `(pred, curr)` where `curr` is
//! the first node with `curr.key >= key`, lock `pred` then `curr`, and
//! validate that neither is marked and `pred.next == curr` still holds.
//! A failed validation releases both locks and restarts from the head.
//!
//! Delete marks `curr` before unlinking it, so a lock-free search can
//! treat any marked node as absent. The flag never goes back to false.
//! Unlinked nodes are retired through the epoch collector.

use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Guard, Owned, Shared};

use cl_core::{is_valid_key, ConcurrentSet, Key, NoBackoff, ProgressGuarantee, RetryPolicy};

use crate::node::{free_chain, sentinel_pair, LockedNode};

/// Ordered set with per-node locks and lazy (mark-then-unlink) deletion.
pub struct LazySet<R: RetryPolicy = NoBackoff> {
    head: LockedNode,
    retry: R,
}

/// Result of one locked attempt on a window.
enum Attempt {
    Done(bool),
    Invalid,
}

impl LazySet<NoBackoff> {
    /// Create an empty set that retries immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retry_policy(NoBackoff)
    }
}

impl<R: RetryPolicy> LazySet<R> {
    /// Create an empty set using `retry` between failed validations.
    #[must_use]
    pub fn with_retry_policy(retry: R) -> Self {
        Self {
            head: sentinel_pair(),
            retry,
        }
    }

    /// The retry policy in use.
    pub fn retry_policy(&self) -> &R {
        &self.retry
    }

    /// Unsynchronized walk to the window around `key`.
    fn locate<'g>(&'g self, key: Key, guard: &'g Guard) -> (&'g LockedNode, Shared<'g, LockedNode>) {
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

    /// Window is still accurate: both ends live and still adjacent.
    ///
    /// Must be called with both locks held.
    fn validate(pred: &LockedNode, curr: Shared<'_, LockedNode>, guard: &Guard) -> bool {
        // SAFETY: `curr` was obtained under `guard`.
        let curr_ref = unsafe { curr.deref() };
        !pred.is_marked() && !curr_ref.is_marked() && pred.next.load(Ordering::Acquire, guard) == curr
    }

    /// Locate, lock and validate a window, then run `apply` on it.
    ///
    /// Retries until a window validates; `apply` runs with both locks held.
    fn with_window<F>(&self, key: Key, mut apply: F) -> bool
    where
        F: FnMut(&LockedNode, Shared<'_, LockedNode>, &Guard) -> bool,
    {
        let guard = epoch::pin();
        let mut state = self.retry.start();

        loop {
            let (pred, curr) = self.locate(key, &guard);
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };

            let attempt = {
                let _pred_lock = pred.lock();
                let _curr_lock = curr_ref.lock();
                if Self::validate(pred, curr, &guard) {
                    Attempt::Done(apply(pred, curr, &guard))
                } else {
                    Attempt::Invalid
                }
            };

            match attempt {
                Attempt::Done(result) => return result,
                Attempt::Invalid => self.retry.on_retry(&mut state),
            }
        }
    }
}

impl Default for LazySet<NoBackoff> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RetryPolicy> ConcurrentSet for LazySet<R> {
    const NAME: &'static str = "LazySet";

    fn search(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let guard = epoch::pin();
        let (_, curr) = self.locate(key, &guard);
        // SAFETY: see `locate`.
        let curr_ref = unsafe { curr.deref() };
        curr_ref.key == key && !curr_ref.is_marked()
    }

    fn insert(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        self.with_window(key, |pred, curr, _guard| {
            // SAFETY: locked and validated, so `curr` is linked.
            if unsafe { curr.deref() }.key == key {
                return false;
            }
            let node = Owned::new(LockedNode::new(key, curr));
            pred.next.store(node, Ordering::Release);
            true
        })
    }

    fn delete(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        self.with_window(key, |pred, curr, guard| {
            // SAFETY: locked and validated, so `curr` is linked.
            let curr_ref = unsafe { curr.deref() };
            if curr_ref.key != key {
                return false;
            }

            curr_ref.marked.store(true, Ordering::Release);
            let succ = curr_ref.next.load(Ordering::Acquire, guard);
            pred.next.store(succ, Ordering::Release);
            // SAFETY: `curr` is marked and unlinked while both locks are
            // held; no later window can validate on it, so it is retired
            // exactly once.
            unsafe { guard.defer_destroy(curr) };
            true
        })
    }

    fn snapshot(&self) -> Vec<Key> {
        let guard = epoch::pin();
        let mut keys = Vec::new();
        let mut curr = self.head.next.load(Ordering::Acquire, &guard);

        loop {
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };
            let next = curr_ref.next.load(Ordering::Acquire, &guard);
            if next.is_null() {
                return keys;
            }
            if !curr_ref.is_marked() {
                keys.push(curr_ref.key);
            }
            curr = next;
        }
    }

    fn progress_guarantee(&self) -> ProgressGuarantee {
        ProgressGuarantee::Blocking
    }
}

impl<R: RetryPolicy> Drop for LazySet<R> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` excludes every other accessor, and deleted
        // nodes were unlinked before being retired.
        let freed = unsafe { free_chain(&self.head) };
        log::trace!("{} dropped with {} nodes", Self::NAME, freed);
    }
}
