//! Bounded exponential backoff for the optimistic retry loops.

use crossbeam_utils::Backoff;

use cl_core::RetryPolicy;

/// Spin with exponentially growing pauses, then yield the thread.
///
/// Delegates to `crossbeam_utils::Backoff::snooze`; one `Backoff` lives for
/// the duration of a single operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialBackoff;

impl RetryPolicy for ExponentialBackoff {
    type State = Backoff;

    #[inline]
    fn start(&self) -> Self::State {
        Backoff::new()
    }

    #[inline]
    fn on_retry(&self, state: &mut Self::State) {
        state.snooze();
    }
}
