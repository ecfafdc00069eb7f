//! Per-call cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AscError;

/// Cancellation and deadline for one logical API call, including all of its
/// retry attempts and the sleeps between them.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use asc_api_client::CallContext;
///
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
/// let token = ctx.cancellation_token().clone();
/// // Another task may call `token.cancel()` to abort the call.
/// # drop(token);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never times out and is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up once `timeout` has elapsed from now.
    ///
    /// A timeout too large to represent leaves the deadline unchanged.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Give up at `deadline`. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The token that cancels this call.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel the call.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail fast if the call is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), AscError> {
        if self.cancel.is_cancelled() {
            return Err(AscError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(AscError::Timeout);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the call is cancelled or times out first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, AscError>
    where
        F: Future,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AscError::Cancelled),
            _ = deadline => Err(AscError::Timeout),
            output = fut => Ok(output),
        }
    }

    /// Sleep for `duration`, waking early if the call is cancelled or times out.
    pub async fn sleep(&self, duration: Duration) -> Result<(), AscError> {
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes() {
        let ctx = CallContext::new();
        ctx.sleep(Duration::from_millis(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_wakes_sleep() {
        let ctx = CallContext::new();
        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let started = std::time::Instant::now();
        let result = ctx.sleep(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(AscError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_wakes_sleep() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx.sleep(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(AscError::Timeout)));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert!(matches!(ctx.check(), Err(AscError::Cancelled)));
        assert!(matches!(ctx.run(async { 1 }).await, Err(AscError::Cancelled)));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_has_no_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.sleep(Duration::from_millis(1)).await.ok(), Some(()));

        let bounded = CallContext::new()
            .with_timeout(Duration::from_secs(5))
            .with_timeout(Duration::MAX);
        assert!(bounded.deadline().is_some());
    }
}
