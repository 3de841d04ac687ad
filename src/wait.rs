//! Bounded, cancellable waits.
//!
//! After each input the driver sleeps for the input's duration, but never longer
//! than a global bound. The sleep runs as its own task; the caller waits for
//! whichever comes first, the task finishing or the bound elapsing. When the
//! bound wins, the task is aborted before the error is returned, so no timer
//! outlives the run.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tmux_tui_testing::{wait::sleep_within, TttError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! assert!(sleep_within(Duration::from_millis(5), Duration::from_secs(1)).await.is_ok());
//!
//! let err = sleep_within(Duration::from_secs(10), Duration::from_millis(5)).await.unwrap_err();
//! assert!(matches!(err, TttError::Timeout { timeout_ms: 5 }));
//! # }
//! ```

use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;

use crate::error::{Result, TttError};

/// A spawned task that is aborted when dropped.
#[derive(Debug)]
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs `task` on its own tokio task and waits at most `bound` for it.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns [`TttError::Timeout`] if `bound` elapses first, after aborting the
/// task, and [`TttError::Runtime`] if the task panicked.
pub async fn run_bounded<F>(task: F, bound: Duration) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut timer = AbortOnDrop(tokio::spawn(task));

    let joined = tokio::select! {
        biased;
        joined = &mut timer.0 => Some(joined),
        _ = tokio::time::sleep(bound) => None,
    };

    match joined {
        Some(joined) => {
            joined.map_err(|e| TttError::Runtime(format!("timer task failed: {}", e)))
        }
        None => {
            drop(timer);
            Err(TttError::Timeout {
                timeout_ms: bound.as_millis() as u64,
            })
        }
    }
}

/// Sleeps for `duration`, failing if that takes longer than `bound`.
///
/// # Errors
///
/// Returns [`TttError::Timeout`] if `duration` exceeds `bound`.
pub async fn sleep_within(duration: Duration, bound: Duration) -> Result<()> {
    run_bounded(tokio::time::sleep(duration), bound).await
}
