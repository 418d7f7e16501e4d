use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::warn;

/// Exponential backoff with full jitter, bounded by a total time budget.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// Delay ceiling for the first retry. Doubles each attempt.
    pub base: Duration,
    /// Largest single delay.
    pub max_delay: Duration,
    /// Total time after which no further attempt is started.
    pub max_elapsed: Duration,
}

impl Backoff {
    pub const fn with_budget(max_elapsed: Duration) -> Self {
        Self {
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_elapsed,
        }
    }

    fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }
}

/// Run `op` until it succeeds or the budget in `backoff` would be exceeded,
/// sleeping a jittered exponential delay between attempts. Returns the last
/// error once the budget is spent.
pub async fn retry_with_backoff<T, E, F, Fut>(
    label: &str,
    backoff: Backoff,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let delay = backoff.delay(attempt);
                if started.elapsed() + delay >= backoff.max_elapsed {
                    warn!(label, attempts = attempt + 1, error = %e, "retry: budget exhausted");
                    return Err(e);
                }
                warn!(
                    label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retry: attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
