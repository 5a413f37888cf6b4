use std::{fmt, future::Future};

use crate::{
    observer::{AttemptObserver, AttemptOutcome, RequestSummary},
    ReplayableResponse, RequestError, Result,
};

/// Why a single attempt failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The attempt hit its timeout.
    Timeout,
    /// Any other transport-level failure (connect, reset, protocol).
    Transport,
}

/// A failed attempt, kept for logging and for [`RequestError::failures`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttemptFailure {
    /// 1-based attempt number.
    pub attempt: u32,
    pub kind: FailureKind,
    /// Underlying transport error text.
    pub message: String,
}

impl AttemptFailure {
    pub(crate) fn from_transport(attempt: u32, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Transport
        };
        Self {
            attempt,
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Timeout => write!(f, "attempt {} timed out: {}", self.attempt, self.message),
            FailureKind::Transport => {
                write!(f, "call failed at attempt {}: {}", self.attempt, self.message)
            }
        }
    }
}

/// Result of one attempt as seen by the retry loop.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Counted against the budget; the loop moves on to the next attempt.
    Retryable(AttemptFailure),
    /// Stops the loop and is returned to the caller as is.
    Fatal(RequestError),
}

/// Runs `attempt` up to `attempts` times, stopping at the first response.
///
/// Attempts are numbered from 1 and run back to back. A budget of zero is
/// treated as one attempt. Every outcome is reported to `observer`.
pub(crate) async fn run_attempts<F, Fut>(
    attempts: u32,
    observer: &dyn AttemptObserver,
    request: &RequestSummary<'_>,
    mut attempt: F,
) -> Result<ReplayableResponse>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<ReplayableResponse, AttemptError>>,
{
    let budget = attempts.max(1);
    let mut failures = Vec::new();

    for number in 1..=budget {
        match attempt(number).await {
            Ok(response) => {
                observer.on_attempt(
                    request,
                    &AttemptOutcome::Succeeded {
                        attempt: number,
                        response: &response,
                    },
                );
                return Ok(response);
            }
            Err(AttemptError::Retryable(failure)) => {
                observer.on_attempt(
                    request,
                    &AttemptOutcome::Failed {
                        failure: &failure,
                        remaining: budget - number,
                    },
                );
                failures.push(failure);
            }
            Err(AttemptError::Fatal(err)) => return Err(err),
        }
    }

    observer.on_attempt(request, &AttemptOutcome::Exhausted { attempts: budget });
    Err(RequestError::Exhausted {
        attempts: budget,
        failures,
    })
}
