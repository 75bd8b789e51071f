//! Node representations and the marked-link primitives.
//!
//! Every list starts at an inline head sentinel holding `KEY_MIN` and ends
//! at a heap-allocated tail sentinel holding `KEY_MAX` whose successor is
//! null. Links are crossbeam-epoch `Atomic` pointers so that unlinked
//! nodes can be retired through the epoch collector instead of being
//! freed under a concurrent reader.
//!
//! The lock-free list stores its logical-deletion mark in the low tag bit
//! of the successor link. Nodes are at least 4-byte aligned, so the bit is
//! always free and the (successor, mark) pair is read and CASed as one word.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_epoch::{unprotected, Atomic, Owned, Shared};

use cl_core::{Key, KEY_MAX, KEY_MIN};

/// Tag value of a link whose owner is logically deleted.
pub(crate) const MARKED: usize = 1;

/// Tag value of a live link.
pub(crate) const UNMARKED: usize = 0;

/// Whether the link read from a node's `next` carries the deletion mark.
#[inline]
pub(crate) fn is_marked<T>(link: Shared<'_, T>) -> bool {
    link.tag() == MARKED
}

/// Node of the coarse-grained list. Writers are serialized by the list's
/// lock; readers rely on the atomic link and the epoch guard.
pub(crate) struct PlainNode {
    pub(crate) key: Key,
    pub(crate) next: Atomic<PlainNode>,
}

/// Node of the lazy list, carrying its own lock and deletion flag.
pub(crate) struct LockedNode {
    pub(crate) key: Key,
    pub(crate) next: Atomic<LockedNode>,
    /// Only ever transitions from false to true.
    pub(crate) marked: AtomicBool,
    lock: Mutex<()>,
}

/// Node of the lock-free list. The deletion mark lives in `next`'s tag.
pub(crate) struct MarkedNode {
    pub(crate) key: Key,
    pub(crate) next: Atomic<MarkedNode>,
}

/// Shared shape of the three node kinds, used for construction and teardown.
pub(crate) trait ListNode: Sized {
    fn with_key(key: Key) -> Self;
    fn key(&self) -> Key;
    fn next(&self) -> &Atomic<Self>;
}

impl ListNode for PlainNode {
    fn with_key(key: Key) -> Self {
        Self {
            key,
            next: Atomic::null(),
        }
    }

    fn key(&self) -> Key {
        self.key
    }

    fn next(&self) -> &Atomic<Self> {
        &self.next
    }
}

impl ListNode for LockedNode {
    fn with_key(key: Key) -> Self {
        Self {
            key,
            next: Atomic::null(),
            marked: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    fn key(&self) -> Key {
        self.key
    }

    fn next(&self) -> &Atomic<Self> {
        &self.next
    }
}

impl ListNode for MarkedNode {
    fn with_key(key: Key) -> Self {
        Self {
            key,
            next: Atomic::null(),
        }
    }

    fn key(&self) -> Key {
        self.key
    }

    fn next(&self) -> &Atomic<Self> {
        &self.next
    }
}

impl PlainNode {
    pub(crate) fn new(key: Key, next: Shared<'_, PlainNode>) -> Self {
        Self {
            key,
            next: next.into(),
        }
    }
}

impl LockedNode {
    pub(crate) fn new(key: Key, next: Shared<'_, LockedNode>) -> Self {
        Self {
            next: next.into(),
            ..Self::with_key(key)
        }
    }

    /// Acquire this node's lock.
    ///
    /// The critical sections never panic, so a poisoned lock still guards
    /// a consistent node and is taken over.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }
}

/// Build the head sentinel already linked to a fresh tail sentinel.
pub(crate) fn sentinel_pair<N: ListNode>() -> N {
    let head = N::with_key(KEY_MIN);
    head.next()
        .store(Owned::new(N::with_key(KEY_MAX)), Ordering::Relaxed);
    head
}

/// Free every node reachable from `head`, tail sentinel included.
///
/// Returns the number of interior nodes freed.
///
/// # Safety
///
/// No other thread may access the list. Nodes already handed to the epoch
/// collector must no longer be reachable from `head`.
pub(crate) unsafe fn free_chain<N: ListNode>(head: &N) -> usize {
    let guard = unprotected();
    let mut freed = 0;
    let mut curr = head.next().load(Ordering::Relaxed, guard).with_tag(UNMARKED);

    while !curr.is_null() {
        let next = curr.deref().next().load(Ordering::Relaxed, guard).with_tag(UNMARKED);
        if curr.deref().key() != KEY_MAX {
            freed += 1;
        }
        drop(curr.into_owned());
        curr = next;
    }

    freed
}
