//! Built-in credential providers.
//!
//! Each provider validates its secret and hands out an interceptor that signs
//! outgoing requests:
//!
//! - [`HeaderAuth`] - API key in a request header
//! - [`QueryAuth`] - API key in a query parameter
//! - [`BearerAuth`] - `Authorization: Bearer <token>`
//! - [`BasicAuth`] - `Authorization: Basic <base64(user:pass)>`

use std::sync::Arc;

use base64::Engine;
use courier_core::{
    BoxFuture, CredentialProvider, Interceptor, Next, Request, Response, Result,
};

/// Interceptor setting one header, replacing any value of the same name.
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: Arc<str>,
    value: Arc<str>,
}

impl SetHeader {
    /// Create the interceptor.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            value: Arc::from(value.into()),
        }
    }
}

impl Interceptor for SetHeader {
    fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>> {
        request.set_header(&*self.name, &*self.value);
        next.run(request)
    }
}

/// Interceptor appending one query parameter.
#[derive(Debug, Clone)]
pub struct AppendQuery {
    name: Arc<str>,
    value: Arc<str>,
}

impl AppendQuery {
    /// Create the interceptor.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            value: Arc::from(value.into()),
        }
    }
}

impl Interceptor for AppendQuery {
    fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>> {
        request.append_query(&self.name, &self.value);
        next.run(request)
    }
}

/// API key sent in a request header.
///
/// # Example
///
/// ```
/// use courier::auth::HeaderAuth;
/// use courier::CredentialProvider;
///
/// let auth = HeaderAuth::new("X-API-Key", "");
/// assert!(!auth.is_valid());
/// assert_eq!(auth.error_message(), "X-API-Key value is empty!");
/// ```
#[derive(Debug, Clone)]
pub struct HeaderAuth {
    header: String,
    value: String,
}

impl HeaderAuth {
    /// Send `value` in the `header` header.
    pub fn new(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            value: value.into(),
        }
    }
}

impl CredentialProvider for HeaderAuth {
    fn is_valid(&self) -> bool {
        !self.value.trim().is_empty()
    }

    fn error_message(&self) -> String {
        format!("{} value is empty!", self.header)
    }

    fn authenticator(&self) -> Arc<dyn Interceptor> {
        Arc::new(SetHeader::new(self.header.clone(), self.value.clone()))
    }
}

/// API key sent as a query parameter.
#[derive(Debug, Clone)]
pub struct QueryAuth {
    param: String,
    value: String,
}

impl QueryAuth {
    /// Send `value` in the `param` query parameter.
    pub fn new(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            value: value.into(),
        }
    }
}

impl CredentialProvider for QueryAuth {
    fn is_valid(&self) -> bool {
        !self.value.trim().is_empty()
    }

    fn error_message(&self) -> String {
        format!("{} value is empty!", self.param)
    }

    fn authenticator(&self) -> Arc<dyn Interceptor> {
        Arc::new(AppendQuery::new(self.param.clone(), self.value.clone()))
    }
}

/// Bearer token authentication.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    /// Authenticate with `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl CredentialProvider for BearerAuth {
    fn is_valid(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn error_message(&self) -> String {
        "bearer token value is empty!".to_string()
    }

    fn authenticator(&self) -> Arc<dyn Interceptor> {
        Arc::new(SetHeader::new(
            "Authorization",
            format!("Bearer {}", self.token),
        ))
    }
}

/// HTTP basic authentication.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    username: String,
    /// Base64-encoded "username:password".
    encoded_credentials: String,
}

impl BasicAuth {
    /// Authenticate with a username and password.
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Self {
            username: username.as_ref().to_string(),
            encoded_credentials: encoded,
        }
    }
}

impl CredentialProvider for BasicAuth {
    fn is_valid(&self) -> bool {
        !self.username.trim().is_empty()
    }

    fn error_message(&self) -> String {
        "basic auth username value is empty!".to_string()
    }

    fn authenticator(&self) -> Arc<dyn Interceptor> {
        Arc::new(SetHeader::new(
            "Authorization",
            format!("Basic {}", self.encoded_credentials),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use courier_core::{Chain, Method, RequestBuilder, Transport};

    use super::*;

    /// Echoes the `Authorization` header and the query string.
    struct Echo;

    impl Transport for Echo {
        fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
            let body = format!(
                "{}|{}",
                request.header("authorization").unwrap_or_default(),
                request.url().query().unwrap_or_default()
            );
            Box::pin(async move { Ok(Response::new(200, HashMap::new(), Bytes::from(body))) })
        }
    }

    async fn signed(provider: &dyn CredentialProvider) -> String {
        let request = RequestBuilder::new(Method::Get, "http://localhost/items")
            .query_param("page", &1)
            .finalize()
            .expect("request");
        let chain = Chain::new().with(provider.authenticator());
        let response = chain.run(&Echo, request).await.expect("response");
        response.text().expect("utf-8")
    }

    #[test]
    fn basic_auth_encodes_correctly() {
        // "user:pass" -> "dXNlcjpwYXNz"
        let auth = BasicAuth::new("user", "pass");
        assert_eq!(auth.encoded_credentials, "dXNlcjpwYXNz");
    }

    #[test]
    fn empty_secrets_are_invalid() {
        assert!(!HeaderAuth::new("X-API-Key", " ").is_valid());
        assert!(!QueryAuth::new("api_key", "").is_valid());
        assert!(!BearerAuth::new("").is_valid());
        assert!(!BasicAuth::new("", "secret").is_valid());
        assert_eq!(QueryAuth::new("api_key", "").error_message(), "api_key value is empty!");
    }

    #[tokio::test]
    async fn bearer_sets_authorization() {
        assert_eq!(signed(&BearerAuth::new("t0k3n")).await, "Bearer t0k3n|page=1");
    }

    #[tokio::test]
    async fn basic_sets_authorization() {
        assert_eq!(
            signed(&BasicAuth::new("user", "pass")).await,
            "Basic dXNlcjpwYXNz|page=1"
        );
    }

    #[tokio::test]
    async fn query_auth_appends_parameter() {
        assert_eq!(
            signed(&QueryAuth::new("api_key", "s3cr3t")).await,
            "|page=1&api_key=s3cr3t"
        );
    }

    #[tokio::test]
    async fn header_auth_replaces_existing_header() {
        let request = RequestBuilder::new(Method::Get, "http://localhost")
            .header("authorization", "stale")
            .finalize()
            .expect("request");
        let chain = Chain::new().with(HeaderAuth::new("Authorization", "fresh").authenticator());

        let response = chain.run(&Echo, request).await.expect("response");
        assert_eq!(response.text().expect("utf-8"), "fresh|");
    }
}
