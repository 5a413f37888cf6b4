//! Attempt observers.
//!
//! The retry loop reports every attempt outcome to an [`AttemptObserver`]
//! instead of logging directly. [`TracingObserver`] is installed by default
//! when the `tracing` feature is enabled.

use std::sync::Arc;

use reqwest::{header, header::HeaderMap, Method, Url};

use crate::{retry::AttemptFailure, ReplayableResponse};

/// Request metadata passed along with every attempt outcome.
#[derive(Clone, Copy, Debug)]
pub struct RequestSummary<'a> {
    pub method: &'a Method,
    pub uri: &'a Url,
    /// Request body exactly as sent on each attempt.
    pub payload: &'a [u8],
    pub headers: &'a HeaderMap,
}

/// Outcome of a single step of the retry loop.
#[derive(Debug)]
pub enum AttemptOutcome<'a> {
    /// The attempt produced a response; no further attempts follow.
    Succeeded {
        attempt: u32,
        response: &'a ReplayableResponse,
    },
    /// The attempt failed at the transport level.
    Failed {
        failure: &'a AttemptFailure,
        /// Attempts still left in the budget.
        remaining: u32,
    },
    /// The budget ran out without a response.
    Exhausted { attempts: u32 },
}

/// Receives attempt outcomes from the retry loop.
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, request: &RequestSummary<'_>, outcome: &AttemptOutcome<'_>);
}

/// Observer that discards every outcome.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn on_attempt(&self, _request: &RequestSummary<'_>, _outcome: &AttemptOutcome<'_>) {}
}

/// Observer that emits structured `tracing` events.
///
/// Failures are logged at error level with `method`, `uri`, `payload`,
/// `headers`, and `error` fields. Success adds `response_payload` and
/// `status_code` at info level.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, request: &RequestSummary<'_>, outcome: &AttemptOutcome<'_>) {
        use crate::retry::FailureKind;

        let payload = String::from_utf8_lossy(request.payload);
        let headers = redacted_headers(request.headers);
        match outcome {
            AttemptOutcome::Succeeded { attempt, response } => {
                tracing::info!(
                    method = %request.method,
                    uri = %request.uri,
                    payload = %payload,
                    headers = ?headers,
                    attempt,
                    response_payload = %String::from_utf8_lossy(response.bytes()),
                    status_code = response.status().as_u16(),
                    "request completed"
                );
            }
            AttemptOutcome::Failed { failure, remaining } => {
                match failure.kind {
                    FailureKind::Timeout => tracing::error!(
                        method = %request.method,
                        uri = %request.uri,
                        payload = %payload,
                        headers = ?headers,
                        attempt = failure.attempt,
                        error = %failure,
                        "request timed out"
                    ),
                    FailureKind::Transport => tracing::error!(
                        method = %request.method,
                        uri = %request.uri,
                        payload = %payload,
                        headers = ?headers,
                        attempt = failure.attempt,
                        error = %failure,
                        "request failed"
                    ),
                }
                if *remaining > 0 {
                    tracing::debug!(remaining, "retrying request");
                }
            }
            AttemptOutcome::Exhausted { attempts } => {
                tracing::error!(
                    method = %request.method,
                    uri = %request.uri,
                    attempts,
                    "request failed after exhausting retries"
                );
            }
        }
    }
}

pub(crate) fn default_observer() -> Arc<dyn AttemptObserver> {
    #[cfg(feature = "tracing")]
    {
        Arc::new(TracingObserver)
    }
    #[cfg(not(feature = "tracing"))]
    {
        Arc::new(NoopObserver)
    }
}

const SECRET_HEADERS: [header::HeaderName; 2] = [header::AUTHORIZATION, header::PROXY_AUTHORIZATION];

/// Header pairs with credential-bearing values replaced by `<redacted>`.
///
/// `Cookie` keeps each cookie name and hides only the values.
pub(crate) fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if SECRET_HEADERS.contains(name) {
                "<redacted>".to_owned()
            } else if *name == header::COOKIE {
                redacted_cookies(&String::from_utf8_lossy(value.as_bytes()))
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_owned(), value)
        })
        .collect()
}

fn redacted_cookies(cookies: &str) -> String {
    cookies
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let name = pair.split('=').next().unwrap_or_default();
            format!("{name}=<redacted>")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE};

    use super::redacted_headers;

    #[test]
    fn credentials_are_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert(COOKIE, HeaderValue::from_static("session=secret"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let pairs = redacted_headers(&headers);
        let rendered = format!("{pairs:?}");

        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("text/plain"));
        assert!(pairs.contains(&("authorization".to_owned(), "<redacted>".to_owned())));
    }

    #[test]
    fn cookie_names_stay_visible() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("session=abc123; theme=dark=mode"),
        );

        let pairs = redacted_headers(&headers);

        assert_eq!(
            pairs,
            vec![(
                "cookie".to_owned(),
                "session=<redacted>; theme=<redacted>".to_owned()
            )]
        );
    }
}
