//! Sequential retry loop for idempotent requests.

use std::future::Future;

use crate::context::CallContext;
use crate::error::AscError;
use crate::retry::RetryPolicy;

/// Run `attempt` until it succeeds, fails permanently, or the attempt budget
/// is spent.
///
/// Only [`AscError::Retryable`] failures are repeated. The last retryable
/// error is returned with the number of attempts folded in. Sleeps between
/// attempts end early with [`AscError::Cancelled`] or [`AscError::Timeout`]
/// when `ctx` fires.
pub(crate) async fn retry_transient<T, F, Fut>(
    ctx: &CallContext,
    policy: &RetryPolicy,
    log_retries: bool,
    label: &str,
    mut attempt: F,
) -> Result<T, AscError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AscError>>,
{
    let mut attempt_number = 1u32;

    loop {
        let error = match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let mut retryable = match error {
            AscError::Retryable(retryable) => retryable,
            other => return Err(other),
        };

        if attempt_number >= policy.max_attempts {
            retryable.attempts = attempt_number;
            return Err(AscError::Retryable(retryable));
        }

        let mut delay = policy.backoff(attempt_number);
        if let Some(hint) = retryable.retry_after.filter(|hint| *hint > delay) {
            delay = hint;
        }

        if log_retries {
            tracing::warn!(
                request = label,
                status = retryable.status,
                attempt = attempt_number,
                max_attempts = policy.max_attempts,
                ?delay,
                "Retrying after transient failure"
            );
        } else {
            tracing::debug!(
                request = label,
                status = retryable.status,
                attempt = attempt_number,
                ?delay,
                "Retrying after transient failure"
            );
        }

        ctx.sleep(delay).await?;
        attempt_number += 1;
    }
}
