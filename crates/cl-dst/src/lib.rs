//! # cl-dst
//!
//! Deterministic simulation support for the concurrent list sets.
//!
//! Workload generation and stress tests draw every random decision from a
//! seeded RNG. The seed is printed when a run starts so that a failure can
//! be replayed.
//!
//! ## Usage
//!
//! ```rust
//! use cl_dst::{DeterministicRng, FaultConfig, InjectedRetry};
//!
//! let seed = 12345;
//! let mut rng = DeterministicRng::new(seed);
//! let key = rng.gen_key(100);
//! assert!((1..=100).contains(&key));
//!
//! // Retry policy that yields/spins on contention
//! let policy = InjectedRetry::new(seed, FaultConfig::aggressive());
//! policy.perturb();
//! ```
//!
//! ## Reproducibility
//!
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

pub mod fault;
pub mod random;

pub use fault::{FaultAction, FaultConfig, FaultInjector, FaultStats, InjectedRetry};
pub use random::DeterministicRng;

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
///
/// # Panics
///
/// Panics if `DST_SEED` is set but is not a valid non-zero `u64`.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("DST_SEED") {
        Ok(s) => {
            let seed = parse_seed(&s).expect("DST_SEED must be a valid non-zero u64");
            println!("DST_SEED={} (from environment)", seed);
            seed
        }
        Err(_) => {
            let seed = random_seed();
            println!("DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}

/// Parse a seed, rejecting zero.
#[must_use]
pub fn parse_seed(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok().filter(|seed| *seed != 0)
}

/// A fresh non-zero seed.
#[must_use]
pub fn random_seed() -> u64 {
    rand::random::<u64>().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("42"), Some(42));
        assert_eq!(parse_seed(" 7 \n"), Some(7));
        assert_eq!(parse_seed("0"), None);
        assert_eq!(parse_seed("-1"), None);
        assert_eq!(parse_seed("abc"), None);
    }

    #[test]
    fn test_random_seed_is_non_zero() {
        for _ in 0..100 {
            assert_ne!(random_seed(), 0);
        }
    }
}
