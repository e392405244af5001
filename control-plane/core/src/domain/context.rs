// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Call Context
//!
//! Cancellation scope handed to every unit, store, provider, stream and
//! watch. Wraps a [`CancellationToken`] with an optional deadline plus the
//! request/trace identifiers the transport propagates.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::errors::{UnitError, UnitResult};

#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    request_id: String,
    trace_id: String,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// Root context: never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            request_id: new_request_id(),
            trace_id: new_trace_id(),
        }
    }

    /// Root context driven by an existing token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::background()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Child scope: cancelled with the parent, cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            request_id: self.request_id.clone(),
            trace_id: self.trace_id.clone(),
        }
    }

    /// Child scope that also expires after `timeout`. An earlier parent
    /// deadline still wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            ..self.child()
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// The error a finished context reports: `deadline_exceeded` when the
    /// deadline has passed, `cancelled` otherwise.
    pub fn err(&self) -> UnitError {
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            UnitError::deadline_exceeded()
        } else {
            UnitError::cancelled()
        }
    }

    /// Race `fut` against the context.
    pub async fn run<T, F>(&self, fut: F) -> UnitResult<T>
    where
        F: Future<Output = UnitResult<T>>,
    {
        if self.is_done() {
            return Err(self.err());
        }
        tokio::select! {
            biased;
            _ = self.done() => Err(self.err()),
            result = fut => result,
        }
    }
}

fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

fn new_trace_id() -> String {
    format!("trc_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorCode;

    #[test]
    fn test_identifier_shapes() {
        let ctx = CallContext::background();
        assert!(ctx.request_id().starts_with("req_"));
        assert_eq!(ctx.request_id().len(), 4 + 32);
        assert!(ctx.trace_id().starts_with("trc_"));
        assert!(ctx.trace_id()[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_child_is_cancelled_with_parent() {
        let parent = CallContext::background();
        let child = parent.child();
        assert_eq!(child.request_id(), parent.request_id());

        parent.cancel();
        child.done().await;
        assert!(child.is_done());
        assert_eq!(child.err().code(), ErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn test_done_stays_pending_until_cancel() {
        let ctx = CallContext::background();
        let mut done = tokio_test::task::spawn(ctx.done());
        tokio_test::assert_pending!(done.poll());

        ctx.cancel();
        assert!(done.is_woken());
        tokio_test::assert_ready!(done.poll());
    }

    #[tokio::test]
    async fn test_cancelling_child_leaves_parent_alive() {
        let parent = CallContext::background();
        let child = parent.child();
        child.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_deadline_exceeded() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(100));
        ctx.done().await;
        assert!(ctx.is_done());
        assert_eq!(ctx.err().code(), ErrorCode::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_context_error_when_future_outlives_it() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
        let result: UnitResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert_eq!(result.unwrap_err().code(), ErrorCode::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let ctx = CallContext::background();
        let value = ctx.run(async { Ok::<_, UnitError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
