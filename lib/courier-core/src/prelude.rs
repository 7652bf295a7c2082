//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    ArraySerializationOption, AuthExpression, BoxFuture, CredentialProvider, Error, Form,
    Interceptor, Method, Next, Part, Request, RequestBuilder, Response, Result, RetryConfiguration,
    RetryMode, Transport, from_json, to_json,
};
