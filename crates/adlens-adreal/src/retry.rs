//! Retry with exponential back-off and jitter for the AdReal client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 5xx). Everything else — rejected
//! credentials, malformed responses — is returned immediately: retrying
//! cannot fix it and only delays the run.

use std::future::Future;
use std::time::Duration;

use crate::error::AdRealError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 5xx responses: transient server/infrastructure errors.
///
/// **Not retriable (hard stop):**
/// - [`AdRealError::LoginFailed`] / [`AdRealError::MissingCsrfToken`] —
///   credential or session problems; a retry will fail identically.
/// - [`AdRealError::Deserialize`] — malformed response; retrying won't fix it.
/// - [`AdRealError::InvalidBaseUrl`] — configuration problem.
pub(crate) fn is_retriable(err: &AdRealError) -> bool {
    match err {
        AdRealError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        AdRealError::LoginFailed { .. }
        | AdRealError::MissingCsrfToken { .. }
        | AdRealError::InvalidBaseUrl { .. }
        | AdRealError::Deserialize { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off doubles per attempt from `backoff_base_ms`, with ±25 % jitter,
/// capped at 60 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, AdRealError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdRealError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "AdReal transient error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
