//! Progress guarantees.
//!
//! | Guarantee | Description |
//! |-----------|-------------|
//! | WaitFree | Every thread completes in bounded steps |
//! | LockFree | At least one thread makes progress |
//! | ObstructionFree | Progress if run in isolation |
//! | Blocking | May block indefinitely |
//!
//! The coarse-grained and lazy sets are `Blocking` (their writers take
//! locks); the lock-free set is `LockFree`. None of them is wait-free.

/// Progress guarantee levels for concurrent algorithms.
///
/// Ordered from weakest (Blocking) to strongest (WaitFree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProgressGuarantee {
    /// May block waiting for another thread
    Blocking = 0,
    /// Makes progress if run in isolation (no interference)
    ObstructionFree = 1,
    /// At least one thread makes progress in any execution
    LockFree = 2,
    /// Every thread completes in bounded steps
    WaitFree = 3,
}

impl ProgressGuarantee {
    /// Get a description of this guarantee level.
    pub fn description(&self) -> &'static str {
        match self {
            ProgressGuarantee::Blocking => "May block waiting for a lock holder",
            ProgressGuarantee::ObstructionFree => "Progress if run in isolation",
            ProgressGuarantee::LockFree => "At least one thread makes progress",
            ProgressGuarantee::WaitFree => "Every thread completes in bounded steps",
        }
    }

    /// Check if this guarantee is at least as strong as another.
    pub fn at_least(&self, other: ProgressGuarantee) -> bool {
        *self >= other
    }
}

impl std::fmt::Display for ProgressGuarantee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProgressGuarantee::Blocking => "blocking",
            ProgressGuarantee::ObstructionFree => "obstruction-free",
            ProgressGuarantee::LockFree => "lock-free",
            ProgressGuarantee::WaitFree => "wait-free",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_guarantee_ordering() {
        assert!(ProgressGuarantee::WaitFree > ProgressGuarantee::LockFree);
        assert!(ProgressGuarantee::LockFree > ProgressGuarantee::ObstructionFree);
        assert!(ProgressGuarantee::ObstructionFree > ProgressGuarantee::Blocking);
    }

    #[test]
    fn test_at_least() {
        assert!(ProgressGuarantee::LockFree.at_least(ProgressGuarantee::Blocking));
        assert!(ProgressGuarantee::LockFree.at_least(ProgressGuarantee::LockFree));
        assert!(!ProgressGuarantee::LockFree.at_least(ProgressGuarantee::WaitFree));
    }

    #[test]
    fn test_display() {
        assert_eq!(ProgressGuarantee::LockFree.to_string(), "lock-free");
        assert_eq!(ProgressGuarantee::Blocking.to_string(), "blocking");
    }
}
