use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use crate::data::{Request, Response};
use crate::error::TransportError;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Asynchronous HTTP client abstraction.
///
/// One call is one attempt: implementations do not retry. Any HTTP status is
/// a successful send; `Err` means no response arrived at all. A
/// [`Body::File`](crate::Body::File) must be reopened from the start on every
/// call.
///
/// # Implementations
///
/// - [`ReqwestClient`](crate::ReqwestClient): production implementation using `reqwest`
/// - In-memory fakes for testing
pub trait HttpClient: Send + Sync {
    fn send(&self, request: &Request) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn send(&self, request: &Request) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).send(request)
    }
}
