//! I/O: the HTTP client seam, clocks and the retry loop.

mod clock;
mod http;
mod policy;
#[cfg(feature = "reqwest")]
mod reqwest_client;

pub use clock::{Clock, TokioClock};
pub use http::{BoxStream, HttpClient};
pub use policy::{Retried, RetryPolicy};

#[cfg(feature = "reqwest")]
pub use reqwest_client::{ReqwestClient, ReqwestClientBuilder};
