use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline attached to a request.
///
/// Cancelling the context stops the in-flight attempt and prevents any
/// further attempts. A passed deadline behaves the same way.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context driven by an existing cancellation token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a context cancelled together with this one, keeping the deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token observed by in-flight attempts.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Absolute deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// True once cancelled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Caps `timeout` by the time left to the deadline.
    pub(crate) fn clamp_timeout(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }
}
