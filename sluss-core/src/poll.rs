//! Deadline-bounded condition polling.
//!
//! Backs `wait_blocks` and every `assert*` task: distributed channel state
//! is eventually consistent, so a failed check is retried on a fixed
//! interval until the deadline. The poller always sleeps between attempts
//! and never reports timeout before the deadline has actually elapsed.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// The predicate never succeeded within the deadline. Carries the last
/// observed failure so reports can show what was seen, not just that
/// nothing matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTimeout<E> {
    pub timeout: Duration,
    pub last: Option<E>,
}

/// Retry `check` every `interval` until it succeeds or `timeout` elapses.
///
/// One final attempt is made exactly at the deadline, so a condition that
/// becomes true in the last interval still passes.
pub async fn poll_until<F, Fut, E>(
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<(), PollTimeout<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Debug,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match check().await {
            Ok(()) => return Ok(()),
            Err(last) => {
                trace!(attempts, ?last, "poll attempt failed");
                if Instant::now() + interval >= deadline {
                    tokio::time::sleep_until(deadline).await;
                    return match check().await {
                        Ok(()) => Ok(()),
                        Err(last) => Err(PollTimeout {
                            timeout,
                            last: Some(last),
                        }),
                    };
                }
                tokio::time::sleep(interval).await;
            }
        }
    }
}
