//! Errors surfaced by the benchmark harness.
//!
//! The list operations themselves never fail; everything here concerns
//! configuring and driving a run.

use thiserror::Error;

/// Harness errors.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker thread {thread} panicked while running {variant}")]
    WorkerPanicked { variant: &'static str, thread: usize },

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BenchError::InvalidConfig("repeats must be at least 1".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: repeats must be at least 1");

        let err = BenchError::WorkerPanicked {
            variant: "LazySet",
            thread: 3,
        };
        assert_eq!(err.to_string(), "Worker thread 3 panicked while running LazySet");
    }
}
