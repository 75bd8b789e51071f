//! Trial execution and aggregation.

use std::time::{Duration, Instant};

use cl_core::ConcurrentSet;
use cl_dst::{random_seed, DeterministicRng};
use cl_lists::{CoarseGrainedSet, LazySet, LockFreeSet};

use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::report::{BenchReport, ProfileReport, ThreadRow};
use crate::workload::{generate_operations, Operation, WorkloadProfile};

/// Run one trial: a fresh `S`, one thread per group, each executing its
/// operations in order.
///
/// Returns the wall time from the first spawn until every thread joined.
/// With trace logging enabled every operation and its result is logged,
/// which dominates the measured time.
pub fn run_trial<S: ConcurrentSet + Default>(groups: &[Vec<Operation>]) -> Result<Duration, BenchError> {
    let set = S::default();
    let traced = log::log_enabled!(log::Level::Trace);

    std::thread::scope(|s| {
        let begin = Instant::now();

        let handles: Vec<_> = groups
            .iter()
            .enumerate()
            .map(|(thread, operations)| {
                let set = &set;
                s.spawn(move || {
                    if traced {
                        for operation in operations {
                            let result = operation.apply(set);
                            log::trace!("[thread {}] {}::{} = {}", thread, S::NAME, operation, result);
                        }
                    } else {
                        for operation in operations {
                            operation.apply(set);
                        }
                    }
                })
            })
            .collect();

        let mut outcome = Ok(());
        for (thread, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && outcome.is_ok() {
                outcome = Err(BenchError::WorkerPanicked {
                    variant: S::NAME,
                    thread,
                });
            }
        }

        outcome.map(|()| begin.elapsed())
    })
}

/// Running sum of one variant's trial times.
#[derive(Debug, Clone, Copy, Default)]
struct Elapsed {
    total: Duration,
}

impl Elapsed {
    fn add(&mut self, duration: Duration) {
        self.total += duration;
    }

    fn average_nanos(&self, repeats: usize) -> u64 {
        debug_assert!(repeats > 0);
        let average = self.total.as_nanos() / repeats as u128;
        u64::try_from(average).unwrap_or(u64::MAX)
    }
}

/// The benchmark: every profile, every thread count, every set variant.
pub struct Benchmark {
    config: BenchConfig,
    profiles: Vec<WorkloadProfile>,
}

impl Benchmark {
    /// Create a benchmark over the three standard profiles.
    pub fn new(config: BenchConfig) -> Result<Self, BenchError> {
        Self::with_profiles(config, WorkloadProfile::standard())
    }

    /// Create a benchmark over custom profiles.
    pub fn with_profiles(config: BenchConfig, profiles: Vec<WorkloadProfile>) -> Result<Self, BenchError> {
        config.validate()?;
        if profiles.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one workload profile is required".to_string(),
            ));
        }

        Ok(Self { config, profiles })
    }

    /// Get current config.
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run every trial and average the elapsed times.
    ///
    /// Each trial regenerates the workload; within a trial the same groups
    /// run against a fresh instance of every set.
    pub fn run(&self) -> Result<BenchReport, BenchError> {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(random_seed);
        log::info!("DST_SEED={}", seed);

        let mut rng = DeterministicRng::new(seed);
        let mut profiles = Vec::with_capacity(self.profiles.len());

        for profile in &self.profiles {
            log::info!("Profile {}", profile.describe());
            let mut rows = Vec::with_capacity(config.threads);

            for threads in 1..=config.threads {
                let mut coarse = Elapsed::default();
                let mut lazy = Elapsed::default();
                let mut lock_free = Elapsed::default();

                for repeat in 0..config.repeats {
                    let groups =
                        generate_operations(profile, threads, config.operations, config.max_key, &mut rng);

                    let coarse_trial = run_trial::<CoarseGrainedSet>(&groups)?;
                    let lazy_trial = run_trial::<LazySet>(&groups)?;
                    let lock_free_trial = run_trial::<LockFreeSet>(&groups)?;
                    log::debug!(
                        "[{}] threads={} trial={} {}={}ns {}={}ns {}={}ns",
                        profile.name,
                        threads,
                        repeat,
                        CoarseGrainedSet::NAME,
                        coarse_trial.as_nanos(),
                        <LazySet>::NAME,
                        lazy_trial.as_nanos(),
                        <LockFreeSet>::NAME,
                        lock_free_trial.as_nanos(),
                    );

                    coarse.add(coarse_trial);
                    lazy.add(lazy_trial);
                    lock_free.add(lock_free_trial);
                }

                rows.push(ThreadRow {
                    threads,
                    coarse_grained_ns: coarse.average_nanos(config.repeats),
                    lazy_ns: lazy.average_nanos(config.repeats),
                    lock_free_ns: lock_free.average_nanos(config.repeats),
                });
            }

            profiles.push(ProfileReport {
                profile: profile.clone(),
                rows,
            });
        }

        Ok(BenchReport {
            seed,
            threads: config.threads,
            operations: config.operations,
            repeats: config.repeats,
            max_key: config.max_key,
            profiles,
        })
    }
}
