//! HTTP response handling.
//!
//! [`Response`] provides access to status, headers, and body with JSON/text deserialization.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::request::find_header;

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HashMap<String, String>,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Server hint from a `Retry-After` header given in seconds.
    ///
    /// Absent, non-numeric and non-positive values yield `None`.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("Retry-After")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|seconds| *seconds > 0.0)
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HashMap<String, String>, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

impl Response<Bytes> {
    /// Turn a non-2xx response into [`crate::Error::Http`], keeping its body.
    pub fn error_for_status(self) -> crate::Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let message = http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("unexpected status");
        Err(crate::Error::http_with_body(
            self.status,
            message,
            self.body,
        ))
    }

    /// Deserialize the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    pub fn text(self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(status: u16, name: &str, value: &str) -> Response {
        let mut headers = HashMap::new();
        headers.insert(name.to_string(), value.to_string());
        Response::new(status, headers, Bytes::new())
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = with_header(200, "content-type", "application/json");
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
        assert!(response.header("Accept").is_none());
    }

    #[test]
    fn retry_after_seconds() {
        let response = with_header(429, "retry-after", "20");
        assert_eq!(response.retry_after(), Some(Duration::from_secs(20)));

        let response = with_header(429, "Retry-After", "0");
        assert_eq!(response.retry_after(), None);

        let response = with_header(503, "Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(response.retry_after(), None);
    }

    #[test]
    fn error_for_status_keeps_body() {
        let response = Response::new(503, HashMap::new(), Bytes::from("down"));
        let err = response.error_for_status().expect_err("5xx");

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "HTTP error 503: Service Unavailable");
        assert_eq!(err.body(), Some(&Bytes::from("down")));

        let response = Response::new(204, HashMap::new(), Bytes::new());
        assert!(response.error_for_status().is_ok());
    }

    #[test]
    fn response_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let body = Bytes::from(r#"{"id":1,"name":"test"}"#);
        let response = Response::new(200, HashMap::new(), body);

        let user: User = response.json().expect("deserialize");
        assert_eq!(
            user,
            User {
                id: 1,
                name: "test".to_string()
            }
        );
    }
}
