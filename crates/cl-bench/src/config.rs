//! Benchmark configuration.

use cl_core::{Key, KEY_MAX};

use crate::error::BenchError;

/// Parameters of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Highest thread count; every count in `1..=threads` is measured
    pub threads: usize,
    /// Operations per trial, split across the worker threads
    pub operations: usize,
    /// Trials averaged per (profile, thread count, set)
    pub repeats: usize,
    /// Keys are drawn uniformly from `1..=max_key`
    pub max_key: Key,
    /// Workload seed (if None, generates random)
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            operations: 100_000,
            repeats: 5,
            max_key: 100,
            seed: None,
        }
    }
}

impl BenchConfig {
    /// Small run for smoke testing.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            threads: num_cpus::get().min(4),
            operations: 10_000,
            repeats: 1,
            ..Default::default()
        }
    }

    /// Long run with more trials for stable averages.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            operations: 1_000_000,
            repeats: 10,
            ..Default::default()
        }
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.threads == 0 {
            return Err(BenchError::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }
        if self.operations == 0 {
            return Err(BenchError::InvalidConfig(
                "operation count must be at least 1".to_string(),
            ));
        }
        if self.repeats == 0 {
            return Err(BenchError::InvalidConfig(
                "repeat count must be at least 1".to_string(),
            ));
        }
        if self.max_key < 1 || self.max_key >= KEY_MAX {
            return Err(BenchError::InvalidConfig(format!(
                "max key must be in 1..{}, got {}",
                KEY_MAX, self.max_key
            )));
        }
        if self.seed == Some(0) {
            return Err(BenchError::InvalidConfig("seed must be non-zero".to_string()));
        }
        Ok(())
    }
}
