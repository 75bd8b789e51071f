//! # cl-bench
//!
//! Throughput benchmark for the three concurrent list sets.
//!
//! For each workload profile and each thread count `1..=N`, the harness
//! generates a seeded batch of operations, splits it across worker
//! threads, and times the batch against a fresh instance of every set.
//! Times are averaged over repeated trials and reported in nanoseconds.
//!
//! ```rust,no_run
//! use cl_bench::{BenchConfig, Benchmark};
//!
//! let benchmark = Benchmark::new(BenchConfig::quick())?;
//! let report = benchmark.run()?;
//! print!("{}", report.render_tables());
//! # Ok::<(), cl_bench::BenchError>(())
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod workload;

pub use config::BenchConfig;
pub use error::BenchError;
pub use report::{BenchReport, ProfileReport, ThreadRow};
pub use runner::{run_trial, Benchmark};
pub use workload::{generate_operations, Operation, OperationKind, WorkloadProfile};
