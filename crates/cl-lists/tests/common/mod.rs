//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;

use cl_core::{ConcurrentSet, Key, PropertyChecker, SetHistory, SetOpKind, SetProperties, SetPropertyChecker};
use cl_dst::DeterministicRng;

/// A finished run: what the set held before, after, and what happened in between.
pub struct RecordedRun {
    pub initial: BTreeSet<Key>,
    pub contents: Vec<Key>,
    pub history: SetHistory,
}

impl SetProperties for RecordedRun {
    fn initial_contents(&self) -> BTreeSet<Key> {
        self.initial.clone()
    }

    fn final_contents(&self) -> Vec<Key> {
        self.contents.clone()
    }

    fn history(&self) -> &SetHistory {
        &self.history
    }
}

/// Shape of a concurrent stress run.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    pub threads: u64,
    pub ops_per_thread: u64,
    pub max_key: Key,
    /// Number of keys inserted before the workers start.
    pub prefill: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops_per_thread: 2_000,
            max_key: 32,
            prefill: 16,
        }
    }
}

/// Hammer `set` from several threads with a seeded mix of operations.
///
/// `between_ops` runs after every operation, e.g. to inject faults.
pub fn run_stress<S, F>(set: &S, seed: u64, config: StressConfig, between_ops: F) -> RecordedRun
where
    S: ConcurrentSet,
    F: Fn() + Sync,
{
    let mut rng = DeterministicRng::new(seed);

    for _ in 0..config.prefill {
        set.insert(rng.gen_key(config.max_key));
    }
    let initial: BTreeSet<Key> = set.snapshot().into_iter().collect();

    let mut rngs: Vec<DeterministicRng> = (0..config.threads).map(|_| rng.fork()).collect();
    let mut history = SetHistory::new();

    std::thread::scope(|s| {
        let handles: Vec<_> = rngs
            .iter_mut()
            .enumerate()
            .map(|(thread_id, rng)| {
                let between_ops = &between_ops;
                s.spawn(move || {
                    let mut local = SetHistory::new();
                    for _ in 0..config.ops_per_thread {
                        let key = rng.gen_key(config.max_key);
                        let (kind, result) = match rng.gen_range(0..3u8) {
                            0 => (SetOpKind::Search, set.search(key)),
                            1 => (SetOpKind::Insert, set.insert(key)),
                            _ => (SetOpKind::Delete, set.delete(key)),
                        };
                        local.record(thread_id as u64, kind, key, result);
                        between_ops();
                    }
                    local
                })
            })
            .collect();

        for handle in handles {
            history.merge(handle.join().expect("worker panicked"));
        }
    });

    RecordedRun {
        initial,
        contents: set.snapshot(),
        history,
    }
}

/// Check every set property, panicking with the full report on failure.
pub fn assert_run_consistent(run: &RecordedRun, seed: u64, insert_results_reliable: bool) {
    let mut checker = SetPropertyChecker::new(run).with_seed(seed);
    if !insert_results_reliable {
        checker = checker.ignoring_insert_results();
    }

    let summary = checker.summary();
    assert!(summary.failed == 0, "{}", summary.format_report());
}
