//! # cl-core
//!
//! Shared vocabulary for the concurrent ordered list sets.
//!
//! - [`set`]: the key domain, the `ConcurrentSet` contract and the retry hook
//! - [`progress`]: progress guarantees reported by each variant
//! - [`property`] and [`invariants`]: checkable properties over a finished run
//! - [`counterexample`]: reproduction data attached to failed properties

pub mod counterexample;
pub mod invariants;
pub mod progress;
pub mod property;
pub mod set;

pub use counterexample::{Counterexample, StateSnapshot};
pub use invariants::{SetHistory, SetOpKind, SetOperation, SetProperties, SetPropertyChecker};
pub use progress::ProgressGuarantee;
pub use property::{PropertyChecker, PropertyResult, PropertySummary};
pub use set::{format_keys, is_valid_key, ConcurrentSet, Key, NoBackoff, RetryPolicy, KEY_MAX, KEY_MIN};
