//! Request/response logging interceptor.
//!
//! Logs every attempt using the `tracing` crate. Register it like any other
//! interceptor; nothing is logged unless it is part of the chain.

use std::time::Instant;

use courier_core::{BoxFuture, Interceptor, Next, Request, Response, Result};
use tracing::{Instrument, Level, debug, info, span, warn};

/// Log level for the logging interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Interceptor logging requests and their outcome.
///
/// # Example
///
/// ```
/// use courier::{Client, LoggingInterceptor};
///
/// let client = Client::builder("https://api.example.com")
///     .interceptor(LoggingInterceptor::debug())
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor {
    level: LogLevel,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging interceptor that logs at debug level, headers included.
    ///
    /// Register it before credential interceptors run, as headers are logged verbatim.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>> {
        let method = request.method();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);

        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(
                            method = %method,
                            url = %url,
                            headers = ?request.headers(),
                            "sending request"
                        );
                    }
                    LogLevel::Info => {
                        info!(method = %method, url = %url, "sending request");
                    }
                }

                let result = next.run(request).await;

                // Saturating conversion to u64
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let status = response.status();
                        if response.is_success() {
                            info!(status, elapsed_ms, "request completed");
                        } else {
                            warn!(status, elapsed_ms, "request failed with HTTP error");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
