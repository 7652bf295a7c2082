//! Core types and traits for the courier HTTP call pipeline.
//!
//! This crate is free of I/O and provides:
//! - [`RequestBuilder`] and [`Request`] - accumulating and finalizing a call's request
//! - [`Params`] and [`ArraySerializationOption`] - flattening values for query strings and forms
//! - [`Form`] and [`Part`] - `multipart/form-data` bodies
//! - [`AuthExpression`] and [`CredentialRegistry`] - resolving required credentials
//! - [`Interceptor`], [`Next`] and [`Chain`] - ordered middleware around a [`Transport`]
//! - [`RetryConfiguration`] - deciding whether and when to retry
//! - [`Response`], [`Error`] and [`Result`]
//! - [`StatusCode`] and [`header`] - re-exported from the `http` crate

mod auth;
mod body;
mod encoding;
mod error;
mod finite;
mod interceptor;
mod method;
mod multipart;
mod path;
pub mod prelude;
mod request;
mod response;
mod retry;
mod transport;

pub use auth::{AuthExpression, CredentialProvider, CredentialRegistry};
pub use body::{Body, ContentType, from_json, to_json};
pub use encoding::{ArraySerializationOption, Params, encode_component};
pub use error::{Error, Result};
pub use interceptor::{Chain, Interceptor, Next, PassThrough};
pub use method::Method;
pub use multipart::{Form, Part};
pub use path::{escape_segment, fill_template, merge_path};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use retry::{
    DEFAULT_RETRY_METHODS, DEFAULT_RETRY_STATUS_CODES, RetryConfiguration, RetryDecision, RetryMode,
};
pub use transport::{BoxFuture, Transport};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
