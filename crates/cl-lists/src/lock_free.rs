//! Lock-free set: Harris-Michael list with the deletion mark in the link.
//!
//! A node is logically deleted once the tag bit of its own `next` link is
//! set; from then on that link never changes again, so an insert or unlink
//! that CASes a marked node's successor always fails. Physical removal is
//! a second CAS on the predecessor. Whoever wins that CAS (the deleter or
//! any traversal that helps) retires the node through the epoch collector.
//!
//! Every CAS failure restarts the affected operation from the head. Some
//! thread's CAS succeeded in between, so the system as a whole progresses.

use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Guard, Owned, Shared};

use cl_core::{is_valid_key, ConcurrentSet, Key, NoBackoff, ProgressGuarantee, RetryPolicy};

use crate::node::{free_chain, is_marked, sentinel_pair, ListNode, MarkedNode, MARKED, UNMARKED};

/// Ordered set built only from single-word compare-and-swap.
pub struct LockFreeSet<R: RetryPolicy = NoBackoff> {
    head: MarkedNode,
    retry: R,
}

impl LockFreeSet<NoBackoff> {
    /// Create an empty set that retries immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retry_policy(NoBackoff)
    }
}

impl<R: RetryPolicy> LockFreeSet<R> {
    /// Create an empty set using `retry` after every failed CAS.
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

    /// Find the window `(pred, curr)` around `key`, unlinking marked nodes
    /// met on the way.
    ///
    /// On return `curr` is the first unmarked node with `curr.key >= key`
    /// and `pred` was its unmarked predecessor when last observed.
    fn locate<'g>(
        &'g self,
        key: Key,
        guard: &'g Guard,
        state: &mut R::State,
    ) -> (&'g MarkedNode, Shared<'g, MarkedNode>) {
        'retry: loop {
            let mut pred = &self.head;
            let mut curr = pred.next.load(Ordering::Acquire, guard);

            loop {
                // SAFETY: links are never null before the tail, and retired
                // nodes are only destroyed after `guard` is released.
                let mut curr_ref = unsafe { curr.deref() };
                let mut succ = curr_ref.next.load(Ordering::Acquire, guard);

                while is_marked(succ) {
                    let unmarked = succ.with_tag(UNMARKED);
                    match pred.next.compare_exchange(
                        curr,
                        unmarked,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        guard,
                    ) {
                        Ok(_) => {
                            // SAFETY: this CAS removed `curr` from the list,
                            // and a marked node is never relinked.
                            unsafe { guard.defer_destroy(curr) };
                        }
                        Err(_) => {
                            self.retry.on_retry(state);
                            continue 'retry;
                        }
                    }
                    curr = unmarked;
                    // SAFETY: as above.
                    curr_ref = unsafe { curr.deref() };
                    succ = curr_ref.next.load(Ordering::Acquire, guard);
                }

                if curr_ref.key >= key {
                    return (pred, curr);
                }
                pred = curr_ref;
                curr = succ;
            }
        }
    }
}

impl Default for LockFreeSet<NoBackoff> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RetryPolicy> ConcurrentSet for LockFreeSet<R> {
    const NAME: &'static str = "LockFreeSet";

    /// Wait-free: a single pass that never writes and never restarts.
    fn search(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let guard = epoch::pin();
        let mut curr = self.head.next.load(Ordering::Acquire, &guard);

        loop {
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };
            let succ = curr_ref.next.load(Ordering::Acquire, &guard);
            if curr_ref.key >= key {
                return curr_ref.key == key && !is_marked(succ);
            }
            curr = succ.with_tag(UNMARKED);
        }
    }

    fn insert(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let guard = epoch::pin();
        let mut state = self.retry.start();
        let mut node = Owned::new(MarkedNode::with_key(key));

        loop {
            let (pred, curr) = self.locate(key, &guard, &mut state);
            // SAFETY: see `locate`.
            if unsafe { curr.deref() }.key == key {
                return false;
            }

            node.next.store(curr, Ordering::Relaxed);
            match pred.next.compare_exchange(
                curr,
                node,
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => return true,
                Err(e) => {
                    node = e.new;
                    self.retry.on_retry(&mut state);
                }
            }
        }
    }

    fn delete(&self, key: Key) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let guard = epoch::pin();
        let mut state = self.retry.start();

        loop {
            let (pred, curr) = self.locate(key, &guard, &mut state);
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };
            if curr_ref.key != key {
                return false;
            }

            // Logical deletion: the linearization point of a successful delete.
            let succ = curr_ref.next.load(Ordering::Acquire, &guard).with_tag(UNMARKED);
            if curr_ref
                .next
                .compare_exchange(
                    succ,
                    succ.with_tag(MARKED),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    &guard,
                )
                .is_err()
            {
                self.retry.on_retry(&mut state);
                continue;
            }

            // Physical removal is best effort; a later traversal finishes it.
            if pred
                .next
                .compare_exchange(curr, succ, Ordering::AcqRel, Ordering::Acquire, &guard)
                .is_ok()
            {
                // SAFETY: this CAS removed `curr`, which is marked and so
                // can never be linked again.
                unsafe { guard.defer_destroy(curr) };
            }
            return true;
        }
    }

    fn snapshot(&self) -> Vec<Key> {
        let guard = epoch::pin();
        let mut keys = Vec::new();
        let mut curr = self.head.next.load(Ordering::Acquire, &guard);

        loop {
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };
            let succ = curr_ref.next.load(Ordering::Acquire, &guard);
            if succ.is_null() {
                return keys;
            }
            if !is_marked(succ) {
                keys.push(curr_ref.key);
            }
            curr = succ.with_tag(UNMARKED);
        }
    }

    fn progress_guarantee(&self) -> ProgressGuarantee {
        ProgressGuarantee::LockFree
    }
}

impl<R: RetryPolicy> Drop for LockFreeSet<R> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` excludes every other accessor. Retired nodes
        // were unlinked by the CAS that retired them; marked nodes still
        // linked are owned by the chain and freed here.
        let freed = unsafe { free_chain(&self.head) };
        log::trace!("{} dropped with {} nodes", Self::NAME, freed);
    }
}
