//! Fixed-delay retries for flaky RPC and indexer calls

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry an async operation with a fixed delay between attempts.
pub async fn retry_fixed<F, Fut, T, E>(mut op: F, attempts: usize, delay: Duration) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts => {
                tracing::debug!(attempt, error = %e, "Retrying after transient error");
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, String> = retry_fixed(
            |_| {
                let current = counter.fetch_add(1, Ordering::Relaxed);
                async move {
                    if current < 2 {
                        Err("flaky".to_string())
                    } else {
                        Ok(7)
                    }
                }
            },
            4,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(res.unwrap(), 7);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_last_attempt() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, String> = retry_fixed(
            |attempt| {
                counter.fetch_add(1, Ordering::Relaxed);
                async move { Err(format!("attempt {attempt} failed")) }
            },
            3,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(res.unwrap_err(), "attempt 3 failed");
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }
}
