//! Client shared by every call of a generated API.

use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    ArraySerializationOption, CredentialProvider, CredentialRegistry, Error, Interceptor, Method,
    Request, Response, RetryConfiguration, Transport,
};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::{
    Call, LoggingInterceptor,
    config::{ClientConfig, ClientConfigBuilder},
    transport::{BoxedService, HyperTransport, ServiceTransport, TransportService},
};

/// Entry point for issuing calls against one base URL.
///
/// Holds the transport, the client-wide interceptors, the credential
/// registry and the configuration. Cloning is cheap and clones share all of
/// them; nothing changes after [`ClientBuilder::build`].
///
/// # Example
///
/// ```no_run
/// use courier::{AuthExpression, Client, auth::BearerAuth};
///
/// # async fn run() -> courier::Result<()> {
/// let client = Client::builder("https://api.example.com")
///     .credential("bearer", BearerAuth::new("t0k3n"))
///     .build();
///
/// let response = client
///     .get("/users/%s")
///     .template_params(["42"])
///     .authenticate(AuthExpression::single("bearer"))
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    credentials: CredentialRegistry,
    config: ClientConfig,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("interceptors", &self.inner.interceptors.len())
            .field("credentials", &self.inner.credentials)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default configuration.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder(base_url).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Base URL every call starts from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Get the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Registered credentials.
    #[must_use]
    pub fn credentials(&self) -> &CredentialRegistry {
        &self.inner.credentials
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.inner.interceptors
    }

    /// Start a call to `path`.
    pub fn request(&self, method: Method, path: &str) -> Call {
        Call::new(self.clone(), method, path)
    }

    /// Start a `GET` call.
    pub fn get(&self, path: &str) -> Call {
        self.request(Method::Get, path)
    }

    /// Start a `POST` call.
    pub fn post(&self, path: &str) -> Call {
        self.request(Method::Post, path)
    }

    /// Start a `PUT` call.
    pub fn put(&self, path: &str) -> Call {
        self.request(Method::Put, path)
    }

    /// Start a `PATCH` call.
    pub fn patch(&self, path: &str) -> Call {
        self.request(Method::Patch, path)
    }

    /// Start a `DELETE` call.
    pub fn delete(&self, path: &str) -> Call {
        self.request(Method::Delete, path)
    }
}

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Builder for [`Client`].
pub struct ClientBuilder {
    base_url: String,
    config: ClientConfigBuilder,
    interceptors: Vec<Arc<dyn Interceptor>>,
    credentials: CredentialRegistry,
    transport: Option<Arc<dyn Transport>>,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .field("interceptors_count", &self.interceptors.len())
            .field("credentials", &self.credentials)
            .field("custom_transport", &self.transport.is_some())
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl ClientBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            config: ClientConfigBuilder::default(),
            interceptors: Vec::new(),
            credentials: CredentialRegistry::new(),
            transport: None,
            layers: Vec::new(),
        }
    }

    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfiguration) -> Self {
        self.config = self.config.retry(retry);
        self
    }

    /// Set how arrays are flattened in query strings and forms.
    #[must_use]
    pub fn array_serialization(mut self, option: ArraySerializationOption) -> Self {
        self.config = self.config.array_serialization(option);
        self
    }

    /// Send a header on every call that does not set it explicitly.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config = self.config.default_header(name, value);
        self
    }

    // ========================================================================
    // Interceptors and credentials
    // ========================================================================

    /// Add a client-wide interceptor.
    ///
    /// Interceptors see requests in registration order.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.interceptor(LoggingInterceptor::new())
    }

    /// Add debug-level logging (includes headers and more detail).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.interceptor(LoggingInterceptor::debug())
    }

    /// Register a credential provider under `name`.
    #[must_use]
    pub fn credential(
        mut self,
        name: impl Into<String>,
        provider: impl CredentialProvider + 'static,
    ) -> Self {
        self.credentials.insert(name, Arc::new(provider));
        self
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Replace the default hyper transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Add a Tower layer around the transport.
    ///
    /// Layers are applied in order: first added = innermost, closest to the
    /// transport. Layers run once per attempt.
    ///
    /// # Example
    ///
    /// ```
    /// use courier::Client;
    /// use courier::tower::limit::ConcurrencyLimitLayer;
    ///
    /// let client = Client::builder("https://api.example.com")
    ///     .layer(ConcurrencyLimitLayer::new(8))
    ///     .build();
    /// ```
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        let config = self.config.build();
        let base: Arc<dyn Transport> = self
            .transport
            .unwrap_or_else(|| Arc::new(HyperTransport::new(&config)));

        let transport: Arc<dyn Transport> = if self.layers.is_empty() {
            base
        } else {
            let mut service: BoxedService = BoxCloneService::new(TransportService::new(base));
            for layer_fn in self.layers {
                service = layer_fn(service);
            }
            Arc::new(ServiceTransport::new(service))
        };

        Client {
            inner: Arc::new(ClientInner {
                base_url: self.base_url,
                transport,
                interceptors: self.interceptors,
                credentials: self.credentials,
                config,
            }),
        }
    }
}
