//! Request context carried through every store and secret call.
//!
//! `RequestContext` bundles a request id, an optional deadline, and a
//! cancellation token. Backends wrap each I/O wait in [`RequestContext::run`]
//! so that a cancelled or expired request abandons the in-flight future
//! instead of completing it.

use std::future::Future;
use std::time::Duration;

use debate_types::error::Interrupted;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Deadline and cancellation scope for one inbound request.
///
/// Child contexts share the parent's request id, inherit the earlier of the
/// two deadlines, and receive a child cancellation token: cancelling a parent
/// cancels all children, but not vice versa.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (shared with children).
    pub request_id: Uuid,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// A context with no deadline.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            deadline: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::new()
        }
    }

    /// Derive a child context whose deadline is at most `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };

        Self {
            request_id: self.request_id,
            deadline: Some(deadline),
            cancellation: self.cancellation.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancel this context (and all child contexts derived from it).
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Fail fast if the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancellation.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. An abandoned future is dropped.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
            _ = expiry => Err(Interrupted::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes_without_deadline() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { 42 }).await.unwrap();
        assert_eq!(value, 42);
        assert!(ctx.remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(100));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert_eq!(ctx.check(), Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Interrupted::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_context_never_polls_future() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let mut polled = false;
        let result = ctx
            .run(async {
                polled = true;
            })
            .await;
        assert_eq!(result, Err(Interrupted::Cancelled));
        assert!(!polled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_inherits_earlier_deadline() {
        let parent = RequestContext::with_timeout(Duration::from_millis(50));
        let child = parent.child_with_timeout(Duration::from_secs(5));
        assert_eq!(child.deadline(), parent.deadline());
        assert_eq!(child.request_id, parent.request_id);

        let short = RequestContext::new().child_with_timeout(Duration::from_millis(20));
        assert!(short.remaining().unwrap() <= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_parent_cancel_propagates_to_child() {
        let parent = RequestContext::new();
        let child = parent.child_with_timeout(Duration::from_secs(1));
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.check(), Err(Interrupted::Cancelled));
    }
}
