//! The terminal step of every call: delivering one request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Boxed, sendable future returned by transports and interceptors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Delivers a single request and returns the raw response.
///
/// One call is one attempt: implementations never retry internally.
/// A non-2xx status is a successful delivery, not an error.
pub trait Transport: Send + Sync {
    /// Execute one HTTP exchange.
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response>> {
        (**self).execute(request)
    }
}
