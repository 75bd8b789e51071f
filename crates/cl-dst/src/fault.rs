//! Deterministic perturbation of retry paths.
//!
//! Optimistic and lock-free operations race only in narrow windows. The
//! injector widens them by yielding or spinning when an operation retries
//! (and, optionally, between operations), with every decision drawn from
//! a seeded RNG so a configuration is reproducible from its seed.
//!
//! The OS scheduler still decides the actual interleaving; the seed fixes
//! the sequence of injected pauses, not the schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use cl_core::RetryPolicy;

use crate::random::DeterministicRng;

/// Configuration for fault injection.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability of yielding the thread at an injection point
    pub yield_probability: f64,
    /// Probability of busy-spinning at an injection point
    pub spin_probability: f64,
    /// Maximum spin iterations
    pub spin_iterations_max: u32,
    /// Whether fault injection is enabled
    pub enabled: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            yield_probability: 0.05,
            spin_probability: 0.10,
            spin_iterations_max: 256,
            enabled: true,
        }
    }
}

impl FaultConfig {
    /// No faults - useful for baseline testing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            yield_probability: 0.0,
            spin_probability: 0.0,
            spin_iterations_max: 0,
            enabled: false,
        }
    }

    /// Aggressive perturbation for stress testing.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            yield_probability: 0.30,
            spin_probability: 0.30,
            spin_iterations_max: 4096,
            enabled: true,
        }
    }
}

/// What to do at an injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Continue immediately
    Proceed,
    /// Give up the rest of the time slice
    Yield,
    /// Busy-spin for the given number of iterations
    Spin(u32),
}

impl FaultAction {
    /// Carry out the action on the calling thread.
    pub fn apply(self) {
        match self {
            FaultAction::Proceed => {}
            FaultAction::Yield => std::thread::yield_now(),
            FaultAction::Spin(iterations) => {
                for _ in 0..iterations {
                    std::hint::spin_loop();
                }
            }
        }
    }
}

/// Deterministic fault injector.
///
/// The same seed and config produce the same sequence of actions.
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    yields_injected_count: u64,
    spins_injected_count: u64,
}

/// Maximum number of injected faults before warning.
const FAULTS_COUNT_WARNING_MAX: u64 = 100_000_000;

impl FaultInjector {
    /// Create a new fault injector with the given RNG and config.
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.yield_probability),
            "Yield probability must be in [0.0, 1.0]"
        );
        debug_assert!(
            (0.0..=1.0).contains(&config.spin_probability),
            "Spin probability must be in [0.0, 1.0]"
        );

        Self {
            rng,
            config,
            yields_injected_count: 0,
            spins_injected_count: 0,
        }
    }

    /// Create with default config.
    pub fn with_default_config(rng: DeterministicRng) -> Self {
        Self::new(rng, FaultConfig::default())
    }

    /// Decide the next action.
    pub fn next_action(&mut self) -> FaultAction {
        if !self.config.enabled {
            return FaultAction::Proceed;
        }

        if self.rng.gen_bool(self.config.yield_probability) {
            self.yields_injected_count += 1;
            debug_assert!(
                self.yields_injected_count < FAULTS_COUNT_WARNING_MAX,
                "Very high number of injected yields - possible livelock"
            );
            return FaultAction::Yield;
        }

        if self.config.spin_iterations_max > 0 && self.rng.gen_bool(self.config.spin_probability) {
            self.spins_injected_count += 1;
            return FaultAction::Spin(self.rng.gen_range(1..=self.config.spin_iterations_max));
        }

        FaultAction::Proceed
    }

    /// Get statistics about injected faults.
    #[must_use]
    pub fn stats(&self) -> FaultStats {
        FaultStats {
            yields_count: self.yields_injected_count,
            spins_count: self.spins_injected_count,
            retries_count: 0,
        }
    }
}

/// Statistics about injected faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultStats {
    /// Number of yields injected
    pub yields_count: u64,
    /// Number of spins injected
    pub spins_count: u64,
    /// Number of retries observed (only tracked by `InjectedRetry`)
    pub retries_count: u64,
}

/// Retry policy that perturbs every retry with injected faults.
///
/// Shared by all threads of a run; decisions are serialized through a
/// mutex, which only sits on the (rare) retry path and the explicit
/// [`InjectedRetry::perturb`] calls made by test workers.
pub struct InjectedRetry {
    injector: Mutex<FaultInjector>,
    retries_count: AtomicU64,
}

impl InjectedRetry {
    /// Create a policy seeded with `seed`.
    pub fn new(seed: u64, config: FaultConfig) -> Self {
        Self {
            injector: Mutex::new(FaultInjector::new(DeterministicRng::new(seed), config)),
            retries_count: AtomicU64::new(0),
        }
    }

    /// Inject a fault outside any retry loop, e.g. between two operations.
    pub fn perturb(&self) {
        self.next_action().apply();
    }

    /// Number of retries observed so far.
    #[must_use]
    pub fn retries_count(&self) -> u64 {
        self.retries_count.load(Ordering::Relaxed)
    }

    /// Injection and retry statistics.
    #[must_use]
    pub fn stats(&self) -> FaultStats {
        let mut stats = match self.injector.lock() {
            Ok(injector) => injector.stats(),
            Err(poisoned) => poisoned.into_inner().stats(),
        };
        stats.retries_count = self.retries_count();
        stats
    }

    fn next_action(&self) -> FaultAction {
        // A panicking test thread must not hide the injector from the others.
        match self.injector.lock() {
            Ok(mut injector) => injector.next_action(),
            Err(poisoned) => poisoned.into_inner().next_action(),
        }
    }
}

impl RetryPolicy for InjectedRetry {
    type State = ();

    fn start(&self) -> Self::State {}

    fn on_retry(&self, _state: &mut Self::State) {
        self.retries_count.fetch_add(1, Ordering::Relaxed);
        self.next_action().apply();
    }
}
