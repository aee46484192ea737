//! Exponential backoff, independent of what is being retried.

use std::{future::Future, time::Duration};

use tokio::time::{error::Elapsed, sleep, timeout, Instant};

/// Backoff schedule: `initial_delay * multiplier^(attempt - 1)`, capped at
/// `max_delay`, optionally bounded by attempts and/or elapsed time.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Stop after this many attempts. `None` retries until `max_elapsed`.
    pub max_attempts: Option<u32>,
    /// Overall time budget. Each attempt is cut off when it runs out, and no
    /// sleep is started that would overrun it.
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: None,
            max_elapsed: None,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn with_max_elapsed(mut self, budget: Duration) -> Self {
        self.max_elapsed = Some(budget);
        self
    }

    #[must_use]
    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let nanos = self.initial_delay.as_nanos() as f64 * factor;
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            self.max_delay
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Whether another attempt is allowed after `attempt` failures, given
    /// `elapsed` time so far and the sleep that would precede it.
    #[must_use]
    pub fn allows_another(&self, attempt: u32, elapsed: Duration, next_delay: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return false;
        }
        if let Some(budget) = self.max_elapsed {
            if elapsed.saturating_add(next_delay) > budget {
                return false;
            }
        }
        true
    }

    /// Time left in the elapsed budget, if there is one.
    #[must_use]
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.max_elapsed.map(|budget| budget.saturating_sub(elapsed))
    }
}

/// Run `op` until it succeeds, `should_retry` rejects its error, or `policy`
/// is exhausted. The last error is returned on exhaustion.
///
/// `op` receives the 1-based attempt number. `on_failure` is called for every
/// failed attempt, before any sleep. An attempt still running when
/// `max_elapsed` runs out is dropped and the [`Elapsed`] error is returned.
pub async fn retry<T, E, Op, Fut, Classify, Notify>(
    policy: &RetryPolicy,
    should_retry: Classify,
    mut on_failure: Notify,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
    Classify: Fn(&E) -> bool,
    Notify: FnMut(u32, &E),
{
    let started = Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        let outcome = match policy.remaining(started.elapsed()) {
            Some(left) => timeout(left, op(attempt)).await.map_err(E::from)?,
            None => op(attempt).await,
        };
        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        on_failure(attempt, &err);
        if !should_retry(&err) {
            return Err(err);
        }
        let delay = policy.delay_for(attempt);
        if !policy.allows_another(attempt, started.elapsed(), delay) {
            return Err(err);
        }
        sleep(delay).await;
    }
}
