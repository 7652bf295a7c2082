//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    ArraySerializationOption, AuthExpression, Call, CancellationToken, Client, ClientConfig,
    CredentialProvider, Error, Form, Interceptor, Method, Next, Part, Request, Response, Result,
    RetryConfiguration, RetryMode, StatusCode, Transport, header,
};
pub use serde::{Deserialize, Serialize};
