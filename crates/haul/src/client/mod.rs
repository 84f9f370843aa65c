//! The artifact client: one pipeline per operation, every network call under
//! the shared retry policy.

mod download;
mod list;
mod manage;
mod upload;

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use haul_archive::{PackOptions, Packager};
use haul_transfer::{AttemptError, CancellationToken, HttpClient, Request, Response, Retried, RetryPolicy};
use haul_verify::ChecksumEngine;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ArtifactError, Result};

const MAX_ERROR_BODY: usize = 512;

/// Uploads, lists, fetches, downloads and deletes artifacts.
///
/// Cloning is cheap: clones share the HTTP client and the immutable
/// configuration. Calls may run concurrently.
pub struct ArtifactClient<C> {
    inner:  Arc<Inner<C>>,
    cancel: CancellationToken,
}

struct Inner<C> {
    http:     C,
    config:   ClientConfig,
    policy:   RetryPolicy,
    packager: Packager,
    checksum: ChecksumEngine,
}

impl<C> Clone for ArtifactClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner:  Arc::clone(&self.inner),
            cancel: self.cancel.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ArtifactClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactClient")
            .field("config", &self.inner.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<C: HttpClient> ArtifactClient<C> {
    pub fn new(http: C, config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let mut pack_options = PackOptions::default().compression_level(config.compression_level);
        if let Some(limit) = config.max_upload_bytes {
            pack_options = pack_options.max_bytes(limit);
        }

        Ok(Self {
            inner:  Arc::new(Inner {
                http,
                policy: RetryPolicy::new(config.retry_config()),
                packager: Packager::new(pack_options),
                checksum: config.checksum_engine(),
                config,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// A view of this client whose operations stop when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner:  Arc::clone(&self.inner),
            cancel: token,
        }
    }

    pub fn config(&self) -> &ClientConfig { &self.inner.config }

    pub fn cancellation_token(&self) -> &CancellationToken { &self.cancel }

    /// Send `request` once. Success statuses and those listed in `accept`
    /// come back as responses; anything else becomes a classified failure.
    async fn attempt(&self, request: &Request, accept: &[u16]) -> std::result::Result<Response, AttemptError> {
        let response = self.inner.http.send(request).await?;
        let status = response.status();
        if response.is_success() || accept.contains(&status) {
            return Ok(response);
        }

        let mut failed = AttemptError::from_response(&response, String::new());
        failed.message = summarize_body(&response.text_lossy().await);
        Err(failed)
    }

    /// Run `attempt_fn` under the retry policy and this client's cancellation
    /// token.
    async fn retrying<T, F, Fut>(&self, operation: &'static str, target: &str, attempt_fn: F) -> Result<Retried<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        self.inner
            .policy
            .execute(operation, &self.cancel, attempt_fn)
            .await
            .map_err(|err| ArtifactError::from_retry(operation, target, err))
    }
}

#[cfg(feature = "reqwest")]
impl ArtifactClient<haul_transfer::ReqwestClient> {
    /// Client talking HTTP through reqwest, set up from `config`.
    pub fn from_config(config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = haul_transfer::ReqwestClient::builder(config.base_url.clone())
            .connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = &config.token {
            builder = builder.token(token.clone());
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Self::new(builder.build()?, config)
    }
}

/// Read a whole body inside an attempt, so a broken stream is retried.
async fn read_body(response: Response) -> std::result::Result<Bytes, AttemptError> { Ok(response.bytes().await?) }

/// Run a filesystem stage on the blocking pool.
async fn blocking<T, F>(operation: &'static str, path: &Path, task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ArtifactError::io(operation, path, io::Error::other(err)))?
}

fn summarize_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "no response body".to_string();
    }
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
