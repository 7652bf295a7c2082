//! Ordered interceptor chain around a [`Transport`].
//!
//! Interceptors run in registration order on the way out and in reverse
//! order on the way back: the first registered interceptor sees the request
//! first and the response last.
//!
//! ```
//! use std::sync::Arc;
//! use courier_core::{BoxFuture, Chain, Interceptor, Next, Request, Response, Result};
//!
//! struct UserAgent;
//!
//! impl Interceptor for UserAgent {
//!     fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>> {
//!         request.headers_mut().insert("User-Agent".to_string(), "courier".to_string());
//!         next.run(request)
//!     }
//! }
//!
//! let chain = Chain::new().with(Arc::new(UserAgent));
//! assert_eq!(chain.len(), 1);
//! ```

use std::sync::Arc;

use crate::{BoxFuture, Request, Response, Result, Transport};

/// A unit wrapping the rest of the chain.
///
/// Implementations call [`Next::run`] to continue, or return early to
/// short-circuit the transport.
pub trait Interceptor: Send + Sync {
    /// Handle `request`, delegating to `next` for the remaining steps.
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>>;
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>> {
        (**self).intercept(request, next)
    }
}

/// Cursor over the interceptors that have not run yet.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Start a walk over `interceptors` ending at `transport`.
    #[must_use]
    pub fn new(interceptors: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self {
            interceptors,
            transport,
        }
    }

    /// Pass the request to the next interceptor, or to the transport once
    /// every interceptor has run.
    pub fn run(self, request: Request) -> BoxFuture<'a, Result<Response>> {
        match self.interceptors.split_first() {
            Some((first, rest)) => first.intercept(
                request,
                Next {
                    interceptors: rest,
                    transport: self.transport,
                },
            ),
            None => self.transport.execute(request),
        }
    }

    /// Number of interceptors still ahead.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.interceptors.len()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

/// An ordered list of interceptors.
///
/// Holds no per-call state; one chain serves any number of concurrent calls.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor.
    #[must_use]
    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.push(interceptor);
        self
    }

    /// Append an interceptor in place.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Append every interceptor of `iter`, keeping their order.
    pub fn extend(&mut self, iter: impl IntoIterator<Item = Arc<dyn Interceptor>>) {
        self.interceptors.extend(iter);
    }

    /// Number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if the chain holds no interceptor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run `request` through every interceptor and then `transport`.
    pub fn run<'a>(
        &'a self,
        transport: &'a dyn Transport,
        request: Request,
    ) -> BoxFuture<'a, Result<Response>> {
        Next::new(&self.interceptors, transport).run(request)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

impl FromIterator<Arc<dyn Interceptor>> for Chain {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Interceptor>>>(iter: T) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}

/// The identity interceptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Interceptor for PassThrough {
    fn intercept<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response>> {
        next.run(request)
    }
}
