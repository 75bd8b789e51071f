//! # cl-lists
//!
//! Three concurrent ordered integer sets over a sorted singly linked list,
//! one per synchronization strategy:
//!
//! | Set | Writers | Readers | Progress |
//! |-----|---------|---------|----------|
//! | [`CoarseGrainedSet`] | one list-wide lock | unlocked walk | blocking |
//! | [`LazySet`] | lock `pred` and `curr`, validate, retry | unlocked walk, mark check | blocking |
//! | [`LockFreeSet`] | CAS on marked links, help unlink | unlocked walk, mark check | lock-free |
//!
//! All three implement [`cl_core::ConcurrentSet`]. Unlinked nodes are
//! retired through `crossbeam-epoch`, so a reader standing on a node that
//! is concurrently removed never observes freed memory.
//!
//! The optimistic sets take a [`cl_core::RetryPolicy`] that runs between
//! failed attempts: [`cl_core::NoBackoff`] by default,
//! [`ExponentialBackoff`] for contended workloads, or the fault-injecting
//! policy from `cl-dst` in tests.

mod backoff;
pub mod coarse;
pub mod lazy;
pub mod lock_free;
mod node;

pub use backoff::ExponentialBackoff;
pub use coarse::CoarseGrainedSet;
pub use lazy::LazySet;
pub use lock_free::LockFreeSet;
