//! Fixed-delay retry for requests whose response may be unusable.
//!
//! Unlike exponential schemes, the platform's article pages are retried on a
//! flat schedule: up to `max_retries` extra attempts, `delay` apart, no
//! jitter. A response is retried when the caller's `is_good` predicate
//! rejects it; a transport error counts as a rejected attempt.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    /// Attempts after the first one.
    pub max_retries: usize,
    /// Pause before each retry.
    pub delay: Duration,
}

impl FixedBackoff {
    pub fn new(max_retries: usize, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Run `attempt` until `is_good` accepts its output.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Called with the zero-based attempt number; `0` is the
    ///   initial request and `1..=max_retries` are retries
    /// * `is_good` - Decides whether a successful output is usable
    ///
    /// # Returns
    ///
    /// The first accepted output, or `None` once every attempt has been
    /// rejected.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let backoff = FixedBackoff::new(5, Duration::from_secs(30));
    /// let page = backoff.run(|n| fetch(n), |r| r.status == 200).await;
    /// ```
    pub async fn run<T, E, F, Fut, G>(&self, mut attempt: F, is_good: G) -> Option<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: Fn(&T) -> bool,
        E: fmt::Display,
    {
        let total_t0 = Instant::now();
        let mut n = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            let reason = match attempt(n).await {
                Ok(value) if is_good(&value) => return Some(value),
                Ok(_) => "unusable response".to_string(),
                Err(e) => e.to_string(),
            };

            let elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64;
            let elapsed_ms_total = total_t0.elapsed().as_millis() as u64;
            if n >= self.max_retries {
                error!(
                    attempts = n + 1,
                    elapsed_ms_attempt,
                    elapsed_ms_total,
                    %reason,
                    "giving up after exhausting retries"
                );
                return None;
            }

            warn!(
                retry = n + 1,
                max = self.max_retries,
                elapsed_ms_attempt,
                elapsed_ms_total,
                delay = ?self.delay,
                %reason,
                "attempt rejected; sleeping before retry"
            );
            sleep(self.delay).await;
            n += 1;
        }
    }
}

impl fmt::Debug for FixedBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedBackoff")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish()
    }
}
