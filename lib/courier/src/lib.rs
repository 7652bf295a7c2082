//! Request pipeline for generated HTTP API clients.
//!
//! A [`Client`] holds a base URL, a transport, client-wide interceptors and a
//! registry of named credentials. Each operation starts a [`Call`], fills in
//! the request, optionally requires credentials with an [`AuthExpression`],
//! and sends it through the interceptor chain with retries.
//!
//! # Example
//!
//! ```no_run
//! use courier::prelude::*;
//! use courier::auth::{HeaderAuth, QueryAuth};
//!
//! #[derive(Debug, Deserialize)]
//! pub struct Pet {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn run() -> courier::Result<()> {
//! let client = Client::builder("https://petstore.example.com/v2")
//!     .credential("api_key", HeaderAuth::new("X-API-Key", "s3cr3t"))
//!     .credential("api_query", QueryAuth::new("api_key", ""))
//!     .retry(RetryConfiguration::default().with_max_attempts(3))
//!     .with_logging()
//!     .build();
//!
//! let pets: Vec<Pet> = client
//!     .get("/pet/findByStatus")
//!     .query_param("status", &["available", "pending"])
//!     .authenticate(AuthExpression::or([
//!         AuthExpression::single("api_key"),
//!         AuthExpression::single("api_query"),
//!     ]))
//!     .send_json()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod call;
mod client;
mod config;
mod logging;
pub mod prelude;
mod transport;

pub use call::Call;
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use logging::{LogLevel, LoggingInterceptor};
pub use transport::{BoxedService, HyperTransport, ServiceFuture, ServiceTransport, TransportService};

// Re-export tower for middleware composition
pub use tower;

pub use tokio_util::sync::CancellationToken;

// Re-export core types
pub use courier_core::{
    ArraySerializationOption, AuthExpression, Body, BoxFuture, Chain, ContentType,
    CredentialProvider, CredentialRegistry, DEFAULT_RETRY_METHODS, DEFAULT_RETRY_STATUS_CODES,
    Error, Form, Interceptor, Method, Next, Params, Part, PassThrough, Request, RequestBuilder,
    Response, Result, RetryConfiguration, RetryDecision, RetryMode, Transport, encode_component,
    escape_segment, fill_template, from_json, merge_path, to_json,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};
