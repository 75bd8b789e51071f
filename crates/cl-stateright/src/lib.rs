//! # cl-stateright
//!
//! Stateright model of the lock-free list protocol.
//!
//! The model explores every interleaving of a few small thread programs
//! and checks the list invariants in each reachable state.

pub mod lock_free_list;

pub use lock_free_list::{ListAction, ListModel, ListOp, ListState};
