//! Benchmark results and their textual rendering.

use std::fmt;

use serde::Serialize;

use cl_core::{ConcurrentSet, Key};
use cl_lists::{CoarseGrainedSet, LazySet, LockFreeSet};

use crate::error::BenchError;
use crate::workload::WorkloadProfile;

/// Averaged elapsed times for one thread count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadRow {
    pub threads: usize,
    pub coarse_grained_ns: u64,
    pub lazy_ns: u64,
    pub lock_free_ns: u64,
}

/// All rows measured under one profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub profile: WorkloadProfile,
    pub rows: Vec<ThreadRow>,
}

/// Complete benchmark outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    /// Seed the workloads were generated from
    pub seed: u64,
    pub threads: usize,
    pub operations: usize,
    pub repeats: usize,
    pub max_key: Key,
    pub profiles: Vec<ProfileReport>,
}

impl BenchReport {
    /// One table per profile: a description line, a header naming the
    /// three sets, then one row per thread count. Times in nanoseconds.
    pub fn render_tables(&self) -> String {
        self.to_string()
    }

    /// Report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, BenchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.profiles {
            writeln!(
                f,
                "{} Thread Number: 1 ~ {}, Operation Number: {}, test times: {}, Time Unit: Nanosecond",
                report.profile.describe(),
                self.threads,
                self.operations,
                self.repeats
            )?;
            writeln!(
                f,
                "ThreadNumber, {}, {}, {}",
                CoarseGrainedSet::NAME,
                <LazySet>::NAME,
                <LockFreeSet>::NAME
            )?;
            for row in &report.rows {
                writeln!(
                    f,
                    "{}, {}, {}, {}",
                    row.threads, row.coarse_grained_ns, row.lazy_ns, row.lock_free_ns
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
