use std::fmt;
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, stream};

use crate::effects::BoxStream;
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Header list with case-insensitive lookup. Names are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> { self.0.iter().map(|(n, v)| (n.as_str(), v.as_str())) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    /// Streamed from disk. Reopened on every attempt, so retries resend the
    /// whole file.
    File { path: PathBuf, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Bytes(bytes) => bytes.len() as u64,
            Self::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// A request against the artifact service, relative to the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method:  Method,
    /// Path beginning with `/`.
    pub path:    String,
    pub query:   Vec<(String, String)>,
    pub headers: Headers,
    pub body:    Body,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::Get, path) }

    pub fn post(path: impl Into<String>) -> Self { Self::new(Method::Post, path) }

    pub fn delete(path: impl Into<String>) -> Self { Self::new(Method::Delete, path) }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Query value by name, first occurrence.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }
}

/// A response whose body has not been read yet.
pub struct Response {
    status:  u16,
    headers: Headers,
    body:    BoxStream<'static, Result<Bytes, TransportError>>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Box::pin(stream::empty()),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = Box::pin(stream::once(async move { Ok(body) }));
        self
    }

    #[must_use]
    pub fn with_stream(mut self, body: BoxStream<'static, Result<Bytes, TransportError>>) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> u16 { self.status }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    pub fn headers(&self) -> &Headers { &self.headers }

    pub fn header(&self, name: &str) -> Option<&str> { self.headers.get(name) }

    pub fn into_body(self) -> BoxStream<'static, Result<Bytes, TransportError>> { self.body }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Body as lossy UTF-8, for error messages. Read failures yield an empty
    /// string.
    pub async fn text_lossy(self) -> String {
        match self.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
