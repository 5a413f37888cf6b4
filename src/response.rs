use std::io::Cursor;

use reqwest::{header::HeaderMap, StatusCode, Url, Version};
use serde::de::DeserializeOwned;

use crate::{RequestError, Result};

/// HTTP response whose body has been drained into memory.
///
/// The body can be read any number of times; the underlying connection is
/// already released when the caller receives this value.
#[derive(Clone, Debug)]
pub struct ReplayableResponse {
    status: StatusCode,
    version: Version,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ReplayableResponse {
    pub(crate) fn new(
        status: StatusCode,
        version: Version,
        url: Url,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            version,
            url,
            headers,
            body,
        }
    }

    /// Reads the whole transport response into memory.
    pub(crate) async fn drain(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let version = response.version();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(RequestError::ResponseBody)?;
        Ok(Self::new(status, version, url, headers, body.to_vec()))
    }

    /// HTTP status code of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// HTTP version negotiated for the response.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Response headers as received.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Returns a fresh reader positioned at the start of the body.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.body)
    }

    /// Decodes the body as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|err| RequestError::Decode(format!("response body is not utf-8: {err}")))
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            RequestError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                String::from_utf8_lossy(&self.body)
            ))
        })
    }

    /// Consumes the response and returns the body bytes.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use reqwest::{header::HeaderMap, StatusCode, Url, Version};
    use serde_json::{json, Value as JsonValue};

    use super::ReplayableResponse;
    use crate::RequestError;

    fn response(body: &[u8]) -> ReplayableResponse {
        ReplayableResponse::new(
            StatusCode::OK,
            Version::HTTP_11,
            Url::parse("http://localhost/").expect("static url must parse"),
            HeaderMap::new(),
            body.to_vec(),
        )
    }

    #[test]
    fn reader_can_be_consumed_repeatedly() {
        let response = response(b"hello");
        for _ in 0..2 {
            let mut out = String::new();
            response
                .reader()
                .read_to_string(&mut out)
                .expect("in-memory read must succeed");
            assert_eq!(out, "hello");
        }
    }

    #[test]
    fn json_decodes_body() {
        let response = response(br#"{"ok":true}"#);
        let value: JsonValue = response.json().expect("valid json must decode");
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let response = response(&[0xff, 0xfe]);
        assert!(matches!(response.text(), Err(RequestError::Decode(_))));
    }
}
