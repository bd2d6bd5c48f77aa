//! The origin handler the middleware wraps.

use std::future::Future;

use async_trait::async_trait;
use http::{Request, Response};

/// Request and response bodies are held fully in memory.
pub type Body = Vec<u8>;

/// Result of invoking an origin.
pub type OriginResult = Result<Response<Body>, OriginError>;

/// Error type for origin invocations.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin unavailable: {0}")]
    Unavailable(String),

    #[error("origin timed out")]
    Timeout,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A request handler producing responses for the middleware to cache.
///
/// An origin may fail outright or answer with any status code, including
/// server errors; the middleware decides what to do with either.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Handle a request.
    async fn fetch(&self, request: Request<Body>) -> OriginResult;
}

/// Origin backed by an async closure.
pub struct FnOrigin<F> {
    handler: F,
}

/// Wrap an async closure as an [`Origin`].
pub fn origin_fn<F, Fut>(handler: F) -> FnOrigin<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = OriginResult> + Send,
{
    FnOrigin { handler }
}

#[async_trait]
impl<F, Fut> Origin for FnOrigin<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = OriginResult> + Send,
{
    async fn fetch(&self, request: Request<Body>) -> OriginResult {
        (self.handler)(request).await
    }
}

/// Copy a request's method, URI, version, headers and body.
///
/// Extensions are not carried over.
pub fn clone_request(request: &Request<Body>) -> Request<Body> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}
