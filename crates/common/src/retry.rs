//! Exponential-backoff retries for calls to external services

use crate::errors::{AppError, Result};
use backoff::{future::retry_notify, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;

/// Run `op` until it succeeds, fails permanently, or `max_retries` retries
/// have been spent. Only errors for which [`AppError::is_retryable`] holds
/// are retried.
pub async fn with_retry<T, F, Fut>(operation: &str, max_retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(100))
        .with_max_interval(Duration::from_secs(5))
        .with_max_elapsed_time(None)
        .build();

    let mut attempts = 0u32;

    retry_notify(
        policy,
        || {
            attempts += 1;
            let exhausted = attempts > max_retries;
            let fut = op();
            async move {
                fut.await.map_err(|e| {
                    if e.is_retryable() && !exhausted {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        },
        |err: AppError, delay: Duration| {
            tracing::warn!(
                operation = operation,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Request failed, retrying"
            );
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);

        let result = with_retry("test", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::ModelTimeout { timeout_ms: 1 })
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(tokio_test::assert_ok!(result), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retry("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AppError::Upstream {
                    service: "chat".into(),
                    status: 401,
                    message: "invalid key".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retry("test", 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::EmbeddingTimeout { timeout_ms: 1 }) }
        })
        .await;

        assert!(matches!(result, Err(AppError::EmbeddingTimeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
