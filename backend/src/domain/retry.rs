//! Bounded retry for transient infrastructure failures.
//!
//! Only infrastructure errors (connection loss, pool exhaustion) are eligible
//! for transparent retry; logical conflicts indicate a real state
//! disagreement and must surface immediately.

use std::future::Future;
use std::time::Duration;

/// Pause between the first failed attempt and the single retry.
pub(crate) const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Run `attempt`, retrying exactly once after a short backoff when the error
/// is classified transient by `is_transient`.
pub(crate) async fn retry_once<T, E, F, Fut>(is_transient: impl Fn(&E) -> bool, mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match attempt().await {
        Err(error) if is_transient(&error) => {
            tokio::time::sleep(RETRY_BACKOFF).await;
            attempt().await
        }
        outcome => outcome,
    }
}
