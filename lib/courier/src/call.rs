//! One logical call: request building, authentication, interceptors and retries.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{
    ArraySerializationOption, AuthExpression, Chain, Error, Interceptor, Method, Part,
    RequestBuilder, Response, Result, RetryDecision, RetryMode,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Client;

/// A call being prepared, created by [`Client::request`] and friends.
///
/// Request setters mirror [`RequestBuilder`] and never fail: the first
/// invalid input is reported by [`Call::send`] before anything is sent.
///
/// The pipeline run by [`Call::send`] is, from the outside in: the retry loop,
/// client interceptors, call interceptors, credential interceptors, transport.
#[must_use]
pub struct Call {
    client: Client,
    builder: RequestBuilder,
    auth: Option<AuthExpression>,
    retry_mode: RetryMode,
    interceptors: Vec<Arc<dyn Interceptor>>,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("builder", &self.builder)
            .field("auth", &self.auth)
            .field("retry_mode", &self.retry_mode)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

impl Call {
    pub(crate) fn new(client: Client, method: Method, path: &str) -> Self {
        let config = client.config();
        let builder = config.default_headers.iter().fold(
            RequestBuilder::new(method, client.base_url())
                .path(path)
                .array_serialization(config.array_serialization),
            |builder, (name, value)| builder.default_header(name.as_str(), value.as_str()),
        );

        Self {
            client,
            builder,
            auth: None,
            retry_mode: RetryMode::Default,
            interceptors: Vec::new(),
            cancellation: None,
        }
    }

    fn map(mut self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
        self.builder = f(self.builder);
        self
    }

    // ========================================================================
    // Request
    // ========================================================================

    /// Set the method from its name, ignoring ASCII case.
    pub fn method_name(self, name: &str) -> Self {
        self.map(|b| b.method_name(name))
    }

    /// Join a fragment onto the path.
    pub fn append_path(self, path: &str) -> Self {
        self.map(|b| b.append_path(path))
    }

    /// Fill `%s` path placeholders with escaped values.
    pub fn template_params<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map(|b| b.template_params(values))
    }

    /// Set a header; the last value for a name wins.
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|b| b.header(name, value))
    }

    /// Set a header used only if not set explicitly.
    pub fn default_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|b| b.default_header(name, value))
    }

    /// Set the `Accept` header.
    pub fn accept(self, value: impl Into<String>) -> Self {
        self.map(|b| b.accept(value))
    }

    /// Set the `Content-Type` header.
    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.map(|b| b.content_type(value))
    }

    /// Override the client's array serialization option for this call.
    pub fn array_serialization(self, option: ArraySerializationOption) -> Self {
        self.map(|b| b.array_serialization(option))
    }

    /// Add a query parameter.
    pub fn query_param<T>(self, key: &str, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.query_param(key, value))
    }

    /// Add a query parameter with an explicit array serialization option.
    pub fn query_param_with<T>(self, key: &str, value: &T, option: ArraySerializationOption) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.query_param_with(key, value, option))
    }

    /// Use a plain text body.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.map(|b| b.text(text))
    }

    /// Use a JSON body.
    pub fn json<T>(self, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.json(value))
    }

    /// Add a URL-encoded form field.
    pub fn form_param<T>(self, key: &str, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.form_param(key, value))
    }

    /// Add a URL-encoded form field with an explicit array serialization option.
    pub fn form_param_with<T>(self, key: &str, value: &T, option: ArraySerializationOption) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.form_param_with(key, value, option))
    }

    /// Add every field of a value as URL-encoded form fields.
    pub fn form<T>(self, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.form(value))
    }

    /// Add multipart fields for a value.
    pub fn multipart_param<T>(self, key: &str, value: &T) -> Self
    where
        T: serde::Serialize + ?Sized,
    {
        self.map(|b| b.multipart_param(key, value))
    }

    /// Add a multipart file part.
    pub fn multipart_file(self, key: &str, filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.map(|b| b.multipart_file(key, filename, data))
    }

    /// Add a prepared multipart part.
    pub fn multipart_part(self, part: Part) -> Self {
        self.map(|b| b.multipart_part(part))
    }

    /// Use a raw byte body.
    pub fn stream(self, data: impl Into<Bytes>) -> Self {
        self.map(|b| b.stream(data))
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Require credentials; resolved against the client's registry at send time.
    pub fn authenticate(mut self, expression: AuthExpression) -> Self {
        self.auth = Some(expression);
        self
    }

    /// Override retries for this call.
    pub const fn retry_mode(mut self, mode: RetryMode) -> Self {
        self.retry_mode = mode;
        self
    }

    /// Add an interceptor for this call only, after the client's own.
    pub fn intercept(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Abort the call, including any wait between attempts, once `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Send the call and return the last response.
    ///
    /// A non-2xx status is returned as a response once retries are exhausted.
    ///
    /// # Errors
    ///
    /// Build and authentication errors are returned before any network call.
    /// Otherwise returns the last transport error, [`Error::Timeout`] when an
    /// attempt exceeds the configured timeout, or [`Error::Cancelled`].
    pub async fn send(self) -> Result<Response> {
        let Self {
            client,
            builder,
            auth,
            retry_mode,
            interceptors,
            cancellation,
        } = self;

        let method = builder.method();
        let request = builder.finalize()?;

        let mut chain: Chain = client.interceptors().iter().cloned().collect();
        chain.extend(interceptors);
        if let Some(expression) = &auth {
            match expression.resolve(client.credentials()) {
                Ok(authenticators) => chain.extend(authenticators),
                Err(err) => {
                    warn!(auth = %expression, error = %err, "credentials unsatisfied");
                    return Err(err);
                }
            }
        }

        let config = client.config();
        let retry = &config.retry;
        let retryable = retry.should_retry(retry_mode, Some(method));
        let token = cancellation.unwrap_or_default();
        let mut attempt: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::Cancelled),
                result = tokio::time::timeout(
                    config.timeout,
                    chain.run(client.transport(), request.clone()),
                ) => result.unwrap_or(Err(Error::Timeout)),
            };

            if !retryable || matches!(&outcome, Ok(response) if response.is_success()) {
                return outcome;
            }

            attempt += 1;
            let budget = retry.maximum_retry_wait_time.saturating_sub(waited);
            let decision = match &outcome {
                Ok(response) => retry.retry_wait_time(budget, attempt, Some(response), None),
                Err(err) => retry.retry_wait_time(budget, attempt, None, Some(err)),
            };
            let RetryDecision::Retry(wait) = decision else {
                debug!(%method, attempt, "giving up");
                return outcome;
            };

            let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
            match &outcome {
                Ok(response) => debug!(%method, attempt, wait_ms, status = response.status(), "retrying request"),
                Err(err) => debug!(%method, attempt, wait_ms, error = %err, "retrying request"),
            }

            tokio::select! {
                biased;
                () = token.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
            waited += wait;
        }
    }

    /// Send the call and decode a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Call::send`]; additionally a non-2xx status or an empty body
    /// becomes [`Error::Http`], and an undecodable body a deserialization error.
    pub async fn send_json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let response = self.send().await?.error_for_status()?;
        if response.body().is_empty() {
            return Err(Error::http(response.status(), "empty response body"));
        }
        response.json()
    }

    /// Send the call and return the body as text.
    ///
    /// # Errors
    ///
    /// Same as [`Call::send`]; additionally a non-2xx status becomes
    /// [`Error::Http`], and a body that is not UTF-8 an encoding error.
    pub async fn send_text(self) -> Result<String> {
        let response = self.send().await?.error_for_status()?;
        response
            .text()
            .map_err(|e| Error::encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use courier_core::{BoxFuture, Request, RetryConfiguration, Transport};

    use super::*;

    /// Replays scripted statuses and records every request it receives.
    #[derive(Clone, Default)]
    struct Scripted {
        statuses: Arc<Mutex<Vec<u16>>>,
        seen: Arc<Mutex<Vec<Request>>>,
    }

    impl Scripted {
        fn new(statuses: &[u16]) -> Self {
            let scripted = Self::default();
            scripted
                .statuses
                .lock()
                .expect("lock")
                .extend(statuses.iter().rev());
            scripted
        }

        fn seen(&self) -> Vec<Request> {
            self.seen.lock().expect("lock").clone()
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
            self.seen.lock().expect("lock").push(request);
            let status = self.statuses.lock().expect("lock").pop().unwrap_or(200);
            Box::pin(async move { Ok(Response::new(status, HashMap::new(), Bytes::new())) })
        }
    }

    /// Never answers.
    struct Hang;

    impl Transport for Hang {
        fn execute(&self, _: Request) -> BoxFuture<'_, Result<Response>> {
            Box::pin(std::future::pending())
        }
    }

    fn retrying() -> RetryConfiguration {
        RetryConfiguration::default()
            .with_max_attempts(2)
            .with_retry_interval(Duration::from_millis(10))
            .with_maximum_retry_wait_time(Duration::from_secs(10))
    }

    fn client(transport: impl Transport + 'static, retry: RetryConfiguration) -> Client {
        Client::builder("http://localhost")
            .retry(retry)
            .default_header("User-Agent", "courier-test")
            .transport(transport)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let transport = Scripted::new(&[503, 502]);
        let client = client(transport.clone(), retrying());

        let response = client.get("/items").send().await.expect("response");

        assert_eq!(response.status(), 200);
        assert_eq!(transport.seen().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_response_when_attempts_run_out() {
        let transport = Scripted::new(&[503, 503, 503, 503]);
        let client = client(transport.clone(), retrying());

        let response = client.get("/items").send().await.expect("response");

        assert_eq!(response.status(), 503);
        assert_eq!(transport.seen().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_mode_overrides_method_check() {
        let transport = Scripted::new(&[503]);
        let client = client(transport.clone(), retrying());

        let response = client.post("/items").send().await.expect("response");
        assert_eq!(response.status(), 503);
        assert_eq!(transport.seen().len(), 1);

        let transport = Scripted::new(&[503]);
        let client = self::client(transport.clone(), retrying());
        let response = client
            .post("/items")
            .retry_mode(RetryMode::Enable)
            .send()
            .await
            .expect("response");
        assert_eq!(response.status(), 200);
        assert_eq!(transport.seen().len(), 2);

        let transport = Scripted::new(&[503]);
        let client = self::client(transport.clone(), retrying());
        let response = client
            .get("/items")
            .retry_mode(RetryMode::Disable)
            .send()
            .await
            .expect("response");
        assert_eq!(response.status(), 503);
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn build_errors_skip_the_transport() {
        let transport = Scripted::default();
        let client = client(transport.clone(), retrying());

        let err = client
            .get("/items")
            .method_name("FETCH")
            .send()
            .await
            .expect_err("invalid method");

        assert!(matches!(err, Error::InvalidMethod(_)));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn authentication_errors_skip_the_transport() {
        let transport = Scripted::default();
        let client = client(transport.clone(), retrying());

        let err = client
            .get("/items")
            .authenticate(AuthExpression::single("api_key"))
            .send()
            .await
            .expect_err("undefined credential");

        assert_eq!(err.to_string(), "api_key is undefined!");
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn default_headers_apply_unless_set() {
        let transport = Scripted::default();
        let client = client(transport.clone(), RetryConfiguration::default());

        client.get("/a").send().await.expect("first");
        client
            .get("/b")
            .header("user-agent", "override")
            .send()
            .await
            .expect("second");

        let seen = transport.seen();
        assert_eq!(seen[0].header("User-Agent"), Some("courier-test"));
        assert_eq!(seen[1].header("User-Agent"), Some("override"));
        assert_eq!(seen[1].headers().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_time_out() {
        let client = Client::builder("http://localhost")
            .timeout(Duration::from_millis(50))
            .retry(retrying())
            .transport(Hang)
            .build();

        let err = client.get("/slow").send().await.expect_err("timeout");
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let transport = Scripted::new(&[503, 503, 503]);
        let retry = retrying().with_retry_interval(Duration::from_secs(60)).with_maximum_retry_wait_time(Duration::from_secs(3600));
        let client = client(transport.clone(), retry);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = client
            .get("/items")
            .cancellation(token)
            .send()
            .await
            .expect_err("cancelled");

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_sending() {
        let transport = Scripted::default();
        let client = client(transport.clone(), retrying());
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .get("/items")
            .cancellation(token)
            .send()
            .await
            .expect_err("cancelled");

        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn call_interceptors_run_after_client_interceptors() {
        struct Tag(&'static str, Arc<AtomicUsize>);

        impl Interceptor for Tag {
            fn intercept<'a>(
                &'a self,
                mut request: Request,
                next: courier_core::Next<'a>,
            ) -> BoxFuture<'a, Result<Response>> {
                let order = self.1.fetch_add(1, Ordering::SeqCst);
                request.set_header(self.0, order.to_string());
                next.run(request)
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let transport = Scripted::default();
        let client = Client::builder("http://localhost")
            .interceptor(Tag("X-Client", Arc::clone(&counter)))
            .transport(transport.clone())
            .build();

        client
            .get("/items")
            .intercept(Tag("X-Call", Arc::clone(&counter)))
            .send()
            .await
            .expect("response");

        let seen = transport.seen();
        assert_eq!(seen[0].header("X-Client"), Some("0"));
        assert_eq!(seen[0].header("X-Call"), Some("1"));
    }
}
