//! CLI for benchmarking the concurrent list sets.
//!
//! # Usage
//!
//! ```bash
//! # Default run: 1..=num_cpus threads, 100000 operations, 5 repeats
//! cargo run --release -p cl-bench --features cli --bin list-bench
//!
//! # Explicit parameters and a fixed workload seed
//! cargo run --release -p cl-bench --features cli --bin list-bench -- \
//!     --threads 8 --operations 200000 --repeats 3 --max-key 1000 --seed 42
//!
//! # JSON output, per-trial timings on stderr
//! RUST_LOG=debug cargo run --release -p cl-bench --features cli --bin list-bench -- --quick --json
//! ```

use std::process::ExitCode;

use clap::Parser;

use cl_bench::{BenchConfig, BenchError, Benchmark};
use cl_core::Key;
use cl_dst::parse_seed;

#[derive(Debug, Parser)]
#[command(name = "list-bench", version, about = "Benchmark the coarse-grained, lazy and lock-free list sets")]
struct Args {
    /// Highest thread count to measure (default: number of CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Operations per trial
    #[arg(short = 'n', long)]
    operations: Option<usize>,

    /// Trials averaged per measurement
    #[arg(short, long)]
    repeats: Option<usize>,

    /// Keys are drawn from 1..=MAX_KEY
    #[arg(short = 'k', long)]
    max_key: Option<Key>,

    /// Workload seed (default: DST_SEED, else random)
    #[arg(long)]
    seed: Option<u64>,

    /// Small smoke-test run
    #[arg(long, conflicts_with = "thorough")]
    quick: bool,

    /// Long run with more trials
    #[arg(long)]
    thorough: bool,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> Result<BenchConfig, BenchError> {
        let mut config = if self.quick {
            BenchConfig::quick()
        } else if self.thorough {
            BenchConfig::thorough()
        } else {
            BenchConfig::default()
        };

        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(operations) = self.operations {
            config.operations = operations;
        }
        if let Some(repeats) = self.repeats {
            config.repeats = repeats;
        }
        if let Some(max_key) = self.max_key {
            config.max_key = max_key;
        }

        config.seed = match self.seed {
            Some(seed) => Some(seed),
            None => match std::env::var("DST_SEED") {
                Ok(raw) => Some(parse_seed(&raw).ok_or_else(|| {
                    BenchError::InvalidConfig(format!("DST_SEED must be a non-zero u64, got {:?}", raw))
                })?),
                Err(_) => None,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let json = args.json;

    let benchmark = match args.into_config().and_then(Benchmark::new) {
        Ok(benchmark) => benchmark,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run with --help for usage information");
            return ExitCode::FAILURE;
        }
    };

    let config = benchmark.config();
    log::info!(
        "Threads 1..={}, {} operations, {} repeats, keys 1..={}",
        config.threads,
        config.operations,
        config.repeats,
        config.max_key
    );

    let report = match benchmark.run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if json {
        match report.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report.render_tables());
    }

    ExitCode::SUCCESS
}
