//! Artifact transfer: package files selected by glob patterns, upload them
//! with a content digest, and list, fetch, download or delete them later.
//!
//! Every network call runs under one retry policy with exponential backoff.
//! Downloads are verified against the recorded digest before they are moved
//! into place, so a failed check never leaves a file behind.
//!
//! # Example
//!
//! ```no_run
//! use haul::{ArtifactClient, ClientConfig, DownloadOptions, UploadOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::load(None)?;
//! let client = ArtifactClient::from_config(config)?;
//!
//! let uploaded = client
//!     .upload("test-logs", &["logs/*.txt"], UploadOptions::default().retention_days(7))
//!     .await?;
//! let id = &uploaded.uploaded().expect("upload outcome").id;
//!
//! client.download(id, "out/", DownloadOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
mod client;
pub mod config;
mod error;
pub mod model;

pub use haul_archive::PackageFormat;
pub use haul_transfer::{CancellationToken, HttpClient, RetryConfig};
pub use haul_verify::Checksum;

pub use self::client::ArtifactClient;
pub use self::config::{ClientConfig, ConfigError, RetrySettings};
pub use self::error::{ArtifactError, ErrorKind, Result};
pub use self::model::{
    ArtifactDescriptor, ArtifactState, DownloadOptions, TransferOutcome, TransferResult, UploadOptions,
};
