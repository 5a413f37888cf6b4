//! `replay-http` is a fluent async HTTP request builder with fixed-count retries.
//!
//! A [`RequestBuilder`] collects method, URI, headers, cookies, payload,
//! timeout, context, and retry count, then [`RequestBuilder::send`] performs
//! the call:
//! - request bodies are held in memory and re-sent unchanged on every attempt
//! - transport failures are retried back to back, with no backoff
//! - the first response wins and is returned fully buffered as a
//!   [`ReplayableResponse`]
//!
//! Attempt outcomes go to an [`AttemptObserver`]; with the default `tracing`
//! feature they are logged as structured `tracing` events.

mod context;
mod error;
pub mod observer;
mod options;
mod payload;
mod request;
mod response;
mod retry;

pub use context::RequestContext;
pub use error::RequestError;
pub use observer::{AttemptObserver, AttemptOutcome, NoopObserver, RequestSummary};
#[cfg(feature = "tracing")]
pub use observer::TracingObserver;
pub use options::RequestOptions;
pub use request::RequestBuilder;
pub use response::ReplayableResponse;
pub use retry::{AttemptFailure, FailureKind};

pub use reqwest::{header, Method, StatusCode, Url};
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, RequestError>;
