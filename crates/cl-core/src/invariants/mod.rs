//! Invariant traits for the ordered set variants.
//!
//! Each module defines the properties that implementations must satisfy
//! once every operation of a run has completed.

pub mod set;

pub use set::{SetHistory, SetOpKind, SetOperation, SetProperties, SetPropertyChecker};
