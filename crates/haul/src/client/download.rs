use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use haul_archive::PackageFormat;
use haul_transfer::{AttemptError, FailureClass, HttpClient, Request, Response, TransportError};
use haul_verify::{Checksum, ChecksumAlgorithm, Hasher};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{ArtifactClient, blocking};
use crate::error::{ArtifactError, Result};
use crate::model::{ArtifactDescriptor, DownloadOptions, TransferOutcome, TransferResult, validate_name};

/// Where downloaded content ends up. Nothing under the destination is
/// created until the content is verified.
#[derive(Debug)]
struct Layout {
    /// Final file, or the directory archives are unpacked into.
    target:    PathBuf,
    /// Existing directory holding the temp file while bytes arrive.
    spool_dir: PathBuf,
    unpack:    bool,
}

impl Layout {
    async fn prepare(
        destination: &Path,
        descriptor: &ArtifactDescriptor,
        extract: bool,
        staging_dir: PathBuf,
    ) -> Result<Self> {
        validate_name(&descriptor.name).map_err(|err| {
            ArtifactError::protocol("download", format!("service returned an unusable artifact name: {err}"))
        })?;

        if extract && descriptor.format.is_archive() {
            tokio::fs::create_dir_all(&staging_dir)
                .await
                .map_err(|err| ArtifactError::io("download", &staging_dir, err))?;
            return Ok(Self {
                target:    destination.to_path_buf(),
                spool_dir: staging_dir,
                unpack:    true,
            });
        }

        let is_dir = tokio::fs::metadata(destination)
            .await
            .is_ok_and(|meta| meta.is_dir());
        let target = if extract || is_dir {
            destination.join(&descriptor.name)
        } else {
            destination.to_path_buf()
        };

        Ok(Self {
            spool_dir: existing_ancestor(&target),
            target,
            unpack: false,
        })
    }
}

/// Closest directory at or above `path` that already exists.
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .filter(|dir| !dir.as_os_str().is_empty())
        .find(|dir| dir.is_dir())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => fs::create_dir_all(dir).map_err(|err| ArtifactError::io("download", dir, err)),
        None => Ok(()),
    }
}

/// Fully received content, not yet verified.
struct Spooled {
    temp:     NamedTempFile,
    bytes:    u64,
    checksum: Checksum,
}

enum SpoolError {
    /// The transfer broke; worth another attempt.
    Transfer(AttemptError),
    /// The local side failed; retrying will not help.
    Local(ArtifactError),
}

impl From<TransportError> for SpoolError {
    fn from(err: TransportError) -> Self { Self::Transfer(err.into()) }
}

impl<C: HttpClient> ArtifactClient<C> {
    /// Download artifact `id` to `destination`.
    ///
    /// Content is streamed into a temp file next to the destination while
    /// being hashed, and only moved into place (or unpacked, with
    /// [`DownloadOptions::extract`]) once the digest matches. A failed
    /// download creates nothing at the destination, missing parent
    /// directories included. When the destination is an existing directory
    /// the artifact's name is used as the file name.
    pub async fn download(
        &self,
        id: &str,
        destination: impl AsRef<Path>,
        options: DownloadOptions,
    ) -> Result<TransferResult> {
        let destination = destination.as_ref();
        let descriptor = self.get(id).await?;

        let expected = if options.verify_checksum {
            let reference = options.expected_checksum.clone().or_else(|| descriptor.digest.clone());
            if reference.is_none() {
                return Err(ArtifactError::Integrity {
                    target:   id.to_string(),
                    expected: None,
                    actual:   None,
                });
            }
            reference
        } else {
            None
        };
        let algorithm = expected.as_ref().map_or_else(ChecksumAlgorithm::default, Checksum::algorithm);

        let layout = Layout::prepare(destination, &descriptor, options.extract, self.config().staging_dir()).await?;
        debug!(id, ?layout, "prepared download");

        let request = Request::get(format!("/artifacts/{id}/content"));
        let request = &request;
        let spool_dir = layout.spool_dir.as_path();
        let expected_len = descriptor.size_in_bytes;
        let retried = self
            .retrying("download", id, move |_| async move {
                let response = self.attempt(request, &[]).await?;
                match spool(response, spool_dir, expected_len, algorithm).await {
                    Ok(spooled) => Ok(Ok(spooled)),
                    Err(SpoolError::Local(err)) => Ok(Err(err)),
                    Err(SpoolError::Transfer(err)) => Err(err),
                }
            })
            .await?;
        let attempts = retried.attempts;
        let spooled = retried.value?;

        if let Some(expected) = expected {
            if spooled.checksum.ensure_matches(&expected).is_err() {
                warn!(id, %expected, actual = %spooled.checksum, "downloaded content failed verification");
                return Err(ArtifactError::Integrity {
                    target:   id.to_string(),
                    expected: Some(expected),
                    actual:   Some(spooled.checksum),
                });
            }
        }

        let Spooled { temp, bytes, checksum } = spooled;
        let format = descriptor.format;
        let target = layout.target.clone();
        let extracted_files = blocking("download", &target, move || place(temp, &layout, format)).await?;

        info!(
            id,
            path = %target.display(),
            bytes,
            format = %format,
            extracted = ?extracted_files,
            attempts,
            "downloaded artifact"
        );

        Ok(TransferResult::succeeded(
            TransferOutcome::Downloaded {
                path: target,
                bytes,
                format,
                extracted_files,
            },
            Some(checksum),
            attempts,
        ))
    }
}

/// Stream one response body into a fresh temp file, hashing as it goes.
async fn spool(
    response: Response,
    dir: &Path,
    expected_len: u64,
    algorithm: ChecksumAlgorithm,
) -> std::result::Result<Spooled, SpoolError> {
    let local = |err| SpoolError::Local(ArtifactError::io("download", dir, err));

    let temp = tempfile::Builder::new()
        .prefix(".haul-download-")
        .tempfile_in(dir)
        .map_err(local)?;
    let mut file = tokio::fs::File::from_std(temp.as_file().try_clone().map_err(local)?);
    let mut hasher = algorithm.hasher();
    let mut bytes = 0u64;

    let mut body = response.into_body();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk).await.map_err(local)?;
        bytes += chunk.len() as u64;
    }
    file.flush().await.map_err(local)?;

    if bytes != expected_len {
        return Err(SpoolError::Transfer(AttemptError::new(
            FailureClass::Connection,
            format!("received {bytes} bytes, expected {expected_len}"),
        )));
    }

    Ok(Spooled {
        temp,
        bytes,
        checksum: Checksum::new(algorithm, hasher.finalize()),
    })
}

/// Move verified content into place. Returns the number of extracted files
/// when unpacking.
fn place(temp: NamedTempFile, layout: &Layout, format: PackageFormat) -> Result<Option<usize>> {
    if layout.unpack {
        return unpack_into(&temp, &layout.target, format).map(Some);
    }

    create_parent(&layout.target)?;
    temp.persist(&layout.target)
        .map_err(|err| ArtifactError::io("download", &layout.target, err.error))?;
    Ok(None)
}

/// Unpack into a scratch directory beside `target` and move the result over
/// only once the whole archive was extracted. The scratch directory goes
/// away on failure.
fn unpack_into(temp: &NamedTempFile, target: &Path, format: PackageFormat) -> Result<usize> {
    let scratch = tempfile::Builder::new()
        .prefix(".haul-extract-")
        .tempdir_in(existing_ancestor(target))
        .map_err(io_err(target))?;
    let file = temp.reopen().map_err(io_err(temp.path()))?;
    let report = haul_archive::unpack(BufReader::new(file), format, scratch.path())?;

    if target.is_dir() {
        merge_dir(scratch.path(), target)?;
    } else {
        create_parent(target)?;
        fs::rename(scratch.path(), target).map_err(io_err(target))?;
    }
    Ok(report.files.len())
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArtifactError + use<> {
    let path = path.to_path_buf();
    move |err| ArtifactError::io("download", path, err)
}

/// Move the contents of `from` into the existing directory `to`, replacing
/// files of the same name.
fn merge_dir(from: &Path, to: &Path) -> Result<()> {
    let entries = fs::read_dir(from).map_err(|err| ArtifactError::io("download", from, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| ArtifactError::io("download", from, err))?;
        let dest = to.join(entry.file_name());
        let is_dir = entry
            .file_type()
            .map_err(|err| ArtifactError::io("download", entry.path(), err))?
            .is_dir();
        if is_dir && dest.is_dir() {
            merge_dir(&entry.path(), &dest)?;
        } else {
            fs::rename(entry.path(), &dest).map_err(|err| ArtifactError::io("download", &dest, err))?;
        }
    }
    Ok(())
}
