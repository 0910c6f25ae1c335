//! Retry backoff with cancellation.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Exponential backoff driver for retry loops.
///
/// The first `wait` returns immediately so the initial attempt is not
/// delayed; subsequent waits double from 100ms up to the cap. Cancellation
/// interrupts any in-progress wait promptly.
#[derive(Debug)]
pub struct Backoff {
    cap: Duration,
    next: Option<Duration>,
}

impl Backoff {
    pub fn up_to(cap: Duration) -> Self {
        Backoff { cap, next: None }
    }

    /// Wait for the next attempt, or fail with `Canceled`.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> ClientResult<()> {
        let Some(delay) = self.next else {
            self.next = Some(INITIAL_DELAY);
            if cancel.is_cancelled() {
                return Err(ClientError::Canceled);
            }
            return Ok(());
        };

        self.next = Some((delay * 2).min(self.cap));

        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Canceled),
            _ = tokio::time::sleep(delay.min(self.cap)) => Ok(()),
        }
    }
}
