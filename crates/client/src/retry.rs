use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::port::ClientError;

pub(crate) const BASE_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Base delay used after the upstream answered 429.
pub(crate) const RATE_LIMIT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub(crate) const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
const JITTER_FRACTION: f64 = 0.1;

/// Map a non-success HTTP status to a [`ClientError`].
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ClientError {
    match status.as_u16() {
        401 | 403 => ClientError::Unauthorized(format!("{status}: {body}")),
        429 => ClientError::RateLimited,
        s if s >= 500 => ClientError::Unavailable(format!("{status}: {body}")),
        _ => ClientError::RequestFailed(format!("{status}: {body}")),
    }
}

/// Exponential backoff: `base * 2^attempt`, capped at [`MAX_RETRY_DELAY`].
pub(crate) fn backoff(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Add up to 10% random jitter.
pub(crate) fn with_jitter(delay: Duration) -> Duration {
    let fraction: f64 = rand::thread_rng().gen_range(0.0..=JITTER_FRACTION);
    delay + delay.mul_f64(fraction)
}

/// Run `op` up to `max_attempts` times, sleeping with backoff between transient failures.
/// Non-transient errors (bad credentials) are returned immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &str,
    max_attempts: u32,
    base: Duration,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(e);
                }
                let base = if matches!(e, ClientError::RateLimited) {
                    base.max(RATE_LIMIT_RETRY_DELAY)
                } else {
                    base
                };
                let delay = with_jitter(backoff(attempt - 1, base));
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    retry_delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_until_cap() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff(0, base), Duration::from_secs(1));
        assert_eq!(backoff(1, base), Duration::from_secs(2));
        assert_eq!(backoff(3, base), Duration::from_secs(8));
        assert_eq!(backoff(6, base), MAX_RETRY_DELAY);
        assert_eq!(backoff(40, base), MAX_RETRY_DELAY);
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let delay = Duration::from_secs(8);
        for _ in 0..100 {
            let jittered = with_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= Duration::from_millis(8_801));
        }
        assert_eq!(with_jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn status_classification() {
        use reqwest::StatusCode;
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, String::new()), ClientError::Unauthorized(_)));
        assert!(matches!(status_error(StatusCode::TOO_MANY_REQUESTS, String::new()), ClientError::RateLimited));
        assert!(matches!(status_error(StatusCode::BAD_GATEWAY, String::new()), ClientError::Unavailable(_)));
        assert!(matches!(status_error(StatusCode::BAD_REQUEST, String::new()), ClientError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", 3, Duration::ZERO, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClientError::Unavailable("down".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", 3, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::RequestFailed("500".into())) }
        })
        .await;
        assert!(matches!(result, Err(ClientError::RequestFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", 5, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClientError::Unauthorized("expired".into())) }
        })
        .await;
        assert!(matches!(result, Err(ClientError::Unauthorized(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
