use std::{fmt, sync::Arc, time::Duration};

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Url,
};
use serde::Serialize;
use tokio::io::AsyncRead;

use crate::{
    observer::{default_observer, redacted_headers, AttemptObserver, RequestSummary},
    payload::Payload,
    retry::{run_attempts, AttemptError, AttemptFailure},
    ReplayableResponse, RequestContext, RequestError, RequestOptions, Result,
};

const SUPPORTED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Fluent builder for a single logical HTTP call.
///
/// Setters mutate the builder in place. Fallible setters return an error and
/// leave the builder untouched, so chains read naturally with `?`:
///
/// ```no_run
/// use replay_http::RequestBuilder;
///
/// # async fn run() -> replay_http::Result<()> {
/// let mut request = RequestBuilder::new();
/// request
///     .set_method("POST")?
///     .set_uri("https://example.com/items")?
///     .set_header("x-request-id", "42")?
///     .set_payload(br#"{"name":"kit"}"#.to_vec())
///     .set_retries(2);
///
/// let response = request.send().await?;
/// println!("{}", response.text()?);
/// # Ok(())
/// # }
/// ```
pub struct RequestBuilder {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    payload: Payload,
    timeout: Duration,
    retries: u32,
    context: RequestContext,
    observer: Arc<dyn AttemptObserver>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("headers", &redacted_headers(&self.headers))
            .field("payload", &self.payload)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Creates a `GET` builder with no URI, a 30 second timeout, and no retries.
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            url: None,
            headers: HeaderMap::new(),
            payload: Payload::Empty,
            timeout: RequestOptions::default().timeout(),
            retries: 0,
            context: RequestContext::new(),
            observer: default_observer(),
        }
    }

    /// Sets the HTTP method. Only `GET`, `POST`, `PUT`, and `DELETE` are accepted.
    pub fn set_method(&mut self, method: &str) -> Result<&mut Self> {
        let method = SUPPORTED_METHODS
            .iter()
            .find(|supported| supported.as_str() == method)
            .cloned()
            .ok_or_else(|| reject(RequestError::InvalidMethod(method.to_owned())))?;
        self.method = method;
        Ok(self)
    }

    /// Sets the target URL. Relative references are rejected.
    pub fn set_uri(&mut self, uri: &str) -> Result<&mut Self> {
        let url = Url::parse(uri).map_err(|err| {
            reject(RequestError::InvalidUri {
                uri: uri.to_owned(),
                reason: err.to_string(),
            })
        })?;
        self.url = Some(url);
        Ok(self)
    }

    /// Sets the request body from bytes.
    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) -> &mut Self {
        self.payload = Payload::Bytes(payload.into());
        self
    }

    /// Sets the request body from a stream.
    ///
    /// The stream is read to the end when [`send`](Self::send) runs, before
    /// the first attempt.
    pub fn set_payload_from_reader<R>(&mut self, reader: R) -> &mut Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.payload = Payload::Reader(Box::new(reader));
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// Sets `Content-Type: application/json` unless a content type is already set.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        let body = serde_json::to_vec(value)
            .map_err(|err| reject(RequestError::Encode(err.to_string())))?;
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        Ok(self.set_payload(body))
    }

    /// Sets a header, replacing any previous value for the same name.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
            reject(RequestError::InvalidHeader {
                name: key.to_owned(),
                reason: err.to_string(),
            })
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| {
            reject(RequestError::InvalidHeader {
                name: key.to_owned(),
                reason: err.to_string(),
            })
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a cookie to the `Cookie` header.
    ///
    /// A cookie with the same name replaces the earlier one; others are kept.
    pub fn set_cookie(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        if name.is_empty() || name.contains(['=', ';', ' ']) || value.contains(';') {
            return Err(reject(RequestError::InvalidHeader {
                name: header::COOKIE.to_string(),
                reason: format!("invalid cookie pair {name:?}"),
            }));
        }

        let existing = self
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let mut pairs: Vec<&str> = existing
            .split("; ")
            .filter(|pair| !pair.is_empty())
            .filter(|pair| pair.split('=').next() != Some(name))
            .collect();
        let cookie = format!("{name}={value}");
        pairs.push(&cookie);

        let joined = HeaderValue::from_str(&pairs.join("; ")).map_err(|err| {
            reject(RequestError::InvalidHeader {
                name: header::COOKIE.to_string(),
                reason: err.to_string(),
            })
        })?;
        self.headers.insert(header::COOKIE, joined);
        Ok(self)
    }

    /// Sets the timeout applied to each attempt.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of retries after the initial attempt.
    ///
    /// `0` means exactly one attempt; `n` allows up to `n + 1`.
    pub fn set_retries(&mut self, retries: u32) -> &mut Self {
        self.retries = retries;
        self
    }

    /// Attaches the cancellation and deadline context for the whole call.
    pub fn set_context(&mut self, context: RequestContext) -> &mut Self {
        self.context = context;
        self
    }

    /// Replaces the observer that receives attempt outcomes.
    pub fn set_observer(&mut self, observer: Arc<dyn AttemptObserver>) -> &mut Self {
        self.observer = observer;
        self
    }

    /// Applies timeout and retry settings in one call.
    pub fn with_options(&mut self, options: RequestOptions) -> &mut Self {
        self.timeout = options.timeout();
        self.retries = options.retries;
        self
    }

    /// Configured HTTP method, `GET` unless set.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL, `None` until [`set_uri`](Self::set_uri) succeeds.
    pub fn uri(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Headers sent on every attempt, including the `Cookie` header.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Timeout applied to each attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retries after the initial attempt.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts `send` may make.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Executes the request, retrying transport failures back to back.
    ///
    /// Returns the first response received, whatever its status code. When
    /// every attempt fails, returns [`RequestError::Exhausted`]; individual
    /// failures are reported to the observer and kept in
    /// [`RequestError::failures`].
    pub async fn send(self) -> Result<ReplayableResponse> {
        let attempts = self.attempts();
        let url = self.url.ok_or(RequestError::MissingUri)?;
        let payload = self.payload.materialize().await?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(RequestError::Client)?;

        let call = Call {
            client,
            method: self.method,
            url,
            headers: self.headers,
            payload,
            timeout: self.timeout,
            context: self.context,
        };
        let summary = call.summary();

        run_attempts(
            attempts,
            self.observer.as_ref(),
            &summary,
            |number| call.attempt(number),
        )
        .await
    }
}

/// Everything one attempt needs, fixed for the whole retry loop.
struct Call {
    client: reqwest::Client,
    method: Method,
    url: Url,
    headers: HeaderMap,
    payload: Option<Vec<u8>>,
    timeout: Duration,
    context: RequestContext,
}

impl Call {
    fn summary(&self) -> RequestSummary<'_> {
        RequestSummary {
            method: &self.method,
            uri: &self.url,
            payload: self.payload.as_deref().unwrap_or_default(),
            headers: &self.headers,
        }
    }

    async fn attempt(&self, number: u32) -> std::result::Result<ReplayableResponse, AttemptError> {
        if self.context.is_done() {
            return Err(AttemptError::Fatal(RequestError::Cancelled));
        }

        let mut request = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .timeout(self.context.clamp_timeout(self.timeout));
        if let Some(payload) = &self.payload {
            request = request.body(payload.clone());
        }

        let exchange = async {
            let response = request.send().await.map_err(|err| {
                AttemptError::Retryable(AttemptFailure::from_transport(number, &err))
            })?;
            ReplayableResponse::drain(response)
                .await
                .map_err(AttemptError::Fatal)
        };

        tokio::select! {
            _ = self.context.cancellation_token().cancelled() => {
                Err(AttemptError::Fatal(RequestError::Cancelled))
            }
            result = exchange => result,
        }
    }
}

fn reject(err: RequestError) -> RequestError {
    #[cfg(feature = "tracing")]
    tracing::error!(error = %err, "rejected request configuration");
    err
}
