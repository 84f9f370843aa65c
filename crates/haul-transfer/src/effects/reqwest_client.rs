use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use tokio_util::io::ReaderStream;
use tracing::trace;

use super::http::HttpClient;
use crate::data::{Body, Headers, Method, Request, Response};
use crate::error::TransportError;

const DEFAULT_USER_AGENT: &str = concat!("haul/", env!("CARGO_PKG_VERSION"));

/// Production HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client:   reqwest::Client,
    base_url: String,
    token:    Option<String>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    pub fn builder(base_url: impl Into<String>) -> ReqwestClientBuilder { ReqwestClientBuilder::new(base_url) }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }
}

#[derive(Clone)]
pub struct ReqwestClientBuilder {
    base_url:        String,
    token:           Option<String>,
    connect_timeout: Duration,
    timeout:         Option<Duration>,
    user_agent:      String,
}

impl ReqwestClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url:        base_url.into().trim_end_matches('/').to_string(),
            token:           None,
            connect_timeout: Duration::from_secs(30),
            timeout:         None,
            user_agent:      DEFAULT_USER_AGENT.to_string(),
        }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whole-request timeout, body included.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<ReqwestClient, TransportError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(TransportError::invalid(format!(
                "base URL '{}' must start with http:// or https://",
                self.base_url
            )));
        }

        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(map_error)?;

        Ok(ReqwestClient {
            client,
            base_url: self.base_url,
            token: self.token,
        })
    }
}

impl HttpClient for ReqwestClient {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let url = self.url(&request.path);
        trace!(%method, %url, body_bytes = request.body.len(), "sending request");

        let mut builder = self.client.request(method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Bytes(bytes) => builder.body(bytes.clone()),
            Body::File { path, len } => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| TransportError::io(format!("cannot open '{}': {e}", path.display())))?;
                builder
                    .header(CONTENT_LENGTH, *len)
                    .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            }
        };

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.bytes_stream().map_err(map_error);

        Ok(Response::new(status)
            .with_headers(headers)
            .with_stream(Box::pin(body)))
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::timeout(message)
    } else if err.is_connect() {
        TransportError::connect(message)
    } else if err.is_builder() {
        TransportError::invalid(message)
    } else {
        TransportError::io(message)
    }
}
