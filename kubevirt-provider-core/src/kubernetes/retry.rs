use std::{future::Future, time::Duration};

use log::warn;
use rand::Rng;

use super::is_conflict;

/// Bounded exponential backoff, mirrors the defaults used by Kubernetes
/// clients for optimistic concurrency retries.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// maximum number of attempts
    pub steps: u32,
    pub duration: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            steps: 4,
            duration: Duration::from_millis(10),
            factor: 5.0,
            jitter: 0.1,
        }
    }
}

impl Backoff {
    /// Delay before the retry following `attempt` (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.duration.as_nanos() as f64 * self.factor.powi(attempt as i32);
        let jitter = if self.jitter > 0.0 {
            base * self.jitter * rand::thread_rng().gen_range(0.0..1.0)
        } else {
            0.0
        };

        Duration::from_nanos((base + jitter).round() as u64)
    }
}

/// Runs `operation` until it succeeds, fails with an error `retriable`
/// rejects, or the backoff is exhausted. The last error is returned.
pub async fn retry_on<T, E, F, Fut, P>(
    backoff: &Backoff,
    retriable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let steps = backoff.steps.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if retriable(&error) && attempt + 1 < steps => {
                let delay = backoff.delay(attempt);
                warn!("Attempt {} failed, retrying in {delay:?}...", attempt + 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Retries read-modify-write cycles that lost an optimistic concurrency race.
pub async fn retry_on_conflict<T, F, Fut>(backoff: &Backoff, operation: F) -> Result<T, kube::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    retry_on(backoff, is_conflict, operation).await
}
