use std::future::Future;
use std::time::Duration;

use crate::common::error::AppError;

// ---
// Helper de conflito: refaz a operação inteira (novas leituras, nova validação)
// quando o Postgres aborta a transação por serialização ou deadlock.
// ---
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    max_attempts: u32,
    operation: &str,
    mut attempt_fn: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match attempt_fn().await {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(operation, attempt, error = %e, "Conflito de transação, tentando de novo");
                tokio::time::sleep(backoff(attempt)).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(20 * u64::from(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> = retry_on_conflict(5, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::MemberRequiredForGift) }
        })
        .await;

        assert!(matches!(result, Err(AppError::MemberRequiredForGift)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_is_passed_through() {
        let result = retry_on_conflict(3, "test", || async { Ok::<_, AppError>(42) }).await;
        assert_eq!(result.ok(), Some(42));
    }
}
