//! Client configuration types.

use std::time::Duration;

use courier_core::{ArraySerializationOption, RetryConfiguration};

/// Configuration shared by every call of a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on a single attempt, interceptors included.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Retry policy.
    pub retry: RetryConfiguration,
    /// How arrays are flattened in query strings and forms.
    pub array_serialization: ArraySerializationOption,
    /// Headers sent unless a call sets the same header explicitly.
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            retry: RetryConfiguration::default(),
            array_serialization: ArraySerializationOption::default(),
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    retry: Option<RetryConfiguration>,
    array_serialization: Option<ArraySerializationOption>,
    default_headers: Vec<(String, String)>,
}

impl ClientConfigBuilder {
    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfiguration) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the array serialization option.
    #[must_use]
    pub fn array_serialization(mut self, option: ArraySerializationOption) -> Self {
        self.array_serialization = Some(option);
        self
    }

    /// Add a default header.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            retry: self.retry.unwrap_or(defaults.retry),
            array_serialization: self
                .array_serialization
                .unwrap_or(defaults.array_serialization),
            default_headers: self.default_headers,
        }
    }
}
