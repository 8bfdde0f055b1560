//! Exponential backoff with jitter for startup retries.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Delay schedule: `base * 2^(attempt-1)`, capped at `max`, plus up to 10% jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based). Attempt 0 waits nothing.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempt - 1);
        let capped = base_ms.saturating_mul(factor).min(max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}

/// Run `op` up to `attempts` times, sleeping between failures.
///
/// Returns the last error once attempts are exhausted.
pub async fn retry<T, E, F, Fut>(
    what: &str,
    attempts: u32,
    backoff: Backoff,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                tracing::error!(what, attempts, error = %e, "Giving up");
                return Err(e);
            }
            Err(e) => {
                let wait = backoff.delay(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    retry_in_ms = wait.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> Backoff {
        Backoff {
            base: Duration::from_millis(1),
            max: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let backoff = Backoff {
            base: Duration::from_millis(100),
            max: Duration::from_millis(1000),
        };
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert!(backoff.delay(1) >= Duration::from_millis(100));
        assert!(backoff.delay(2) >= Duration::from_millis(200));

        let capped = backoff.delay(10);
        assert!(capped >= Duration::from_millis(1000));
        assert!(capped < Duration::from_millis(1100));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry("test", 5, fast(), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("attempt {n}"))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry("test", 3, fast(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("down".to_string())
        })
        .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
