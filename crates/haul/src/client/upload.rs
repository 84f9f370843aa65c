use std::io;
use std::path::{Path, PathBuf};

use haul_archive::{Package, PackageFormat, PackEntry, Packager};
use haul_select::Selector;
use haul_transfer::{Body, HttpClient, Request};
use haul_verify::{Checksum, ChecksumEngine, VerificationError};
use tracing::{debug, info, warn};

use super::{ArtifactClient, blocking, read_body};
use crate::error::{ArtifactError, Result};
use crate::model::{ArtifactDescriptor, TransferOutcome, TransferResult, UploadOptions, validate_name, validate_retention};

const CONFLICT: u16 = 409;

/// Package and digest, ready to send.
struct Staged {
    package: Package,
    digest:  Checksum,
    files:   usize,
}

impl<C: HttpClient> ArtifactClient<C> {
    /// Select files matching `patterns`, package them and upload the package
    /// as artifact `name`.
    ///
    /// Nothing is sent when validation, selection or packaging fails. An
    /// artifact the service stored under a different digest is deleted again
    /// before the integrity error is returned.
    pub async fn upload<S: AsRef<str>>(
        &self,
        name: &str,
        patterns: &[S],
        options: UploadOptions,
    ) -> Result<TransferResult> {
        validate_name(name)?;
        if let Some(days) = options.retention_days {
            validate_retention(days, self.config().max_retention_days)?;
        }
        if patterns.is_empty() {
            return Err(ArtifactError::invalid("at least one path pattern is required"));
        }

        let root = match options.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|err| ArtifactError::io("upload", ".", err))?,
        };
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        let packager = self.inner.packager.clone();
        let checksum = self.inner.checksum;
        let staging_dir = self.config().staging_dir();
        let compress = options.compress;

        let task_root = root.clone();
        let staged = blocking("upload", &root, move || {
            stage(&task_root, &patterns, &packager, checksum, &staging_dir, compress)
        })
        .await?;

        let format = staged.package.format();
        let mut request = Request::post("/artifacts")
            .header("content-type", "application/octet-stream")
            .header("x-artifact-name", name)
            .header("x-artifact-digest", staged.digest.to_string())
            .header("x-artifact-format", format.tag())
            .body(Body::File {
                path: staged.package.path().to_path_buf(),
                len:  staged.package.len(),
            });
        if let Some(days) = options.retention_days {
            request = request.header("x-artifact-retention-days", days.to_string());
        }

        let request = &request;
        let retried = self
            .retrying("upload", name, move |_| async move {
                let response = self.attempt(request, &[CONFLICT]).await?;
                if response.status() == CONFLICT {
                    return Ok(None);
                }
                read_body(response).await.map(Some)
            })
            .await?;

        let Some(body) = retried.value else {
            return Err(ArtifactError::Conflict { name: name.to_string() });
        };
        let artifact: ArtifactDescriptor = serde_json::from_slice(&body)
            .map_err(|err| ArtifactError::protocol("upload", format!("malformed artifact descriptor: {err}")))?;

        if let Some(recorded) = artifact.digest.clone().filter(|d| *d != staged.digest) {
            warn!(
                artifact = %artifact.id,
                name,
                expected = %staged.digest,
                actual = %recorded,
                "service recorded a different digest"
            );
            if let Err(err) = self.delete(&artifact.id).await {
                warn!(artifact = %artifact.id, error = %err, "could not remove rejected upload");
            }
            return Err(ArtifactError::Integrity {
                target:   name.to_string(),
                expected: Some(staged.digest),
                actual:   Some(recorded),
            });
        }

        info!(
            artifact = %artifact.id,
            name,
            files = staged.files,
            bytes = staged.package.len(),
            format = %format,
            attempts = retried.attempts,
            "uploaded artifact"
        );

        Ok(TransferResult::succeeded(
            TransferOutcome::Uploaded {
                artifact,
                files: staged.files,
            },
            Some(staged.digest),
            retried.attempts,
        ))
    }
}

/// Select, package and digest. Runs on the blocking pool.
fn stage(
    root: &Path,
    patterns: &[String],
    packager: &Packager,
    checksum: ChecksumEngine,
    staging_dir: &Path,
    compress: bool,
) -> Result<Staged> {
    let selection = Selector::new(root)?.select(patterns)?.non_empty()?;
    let prefix = selection.common_root();
    let format = PackageFormat::choose(selection.len(), selection.has_directories(), compress);

    let entries: Vec<PackEntry> = selection
        .files()
        .iter()
        .map(|file| PackEntry::new(file.path.clone(), file.relative_to(&prefix)))
        .collect();
    debug!(files = entries.len(), bytes = selection.total_size(), %format, "selected files");

    let package = packager.pack(&entries, format, staging_dir)?;
    let digest = checksum
        .digest_file(package.path())
        .map_err(|err| checksum_error(package.path(), err))?;

    Ok(Staged {
        package,
        digest,
        files: entries.len(),
    })
}

pub(super) fn checksum_error(path: impl Into<PathBuf>, err: VerificationError) -> ArtifactError {
    match err {
        VerificationError::Io(source) => ArtifactError::io("checksum", path, source),
        other => ArtifactError::io("checksum", path, io::Error::other(other)),
    }
}
