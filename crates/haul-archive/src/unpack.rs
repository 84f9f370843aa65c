use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tar::{Archive, EntryType};
use tracing::{debug, trace};

use crate::error::{PackError, Result};
use crate::format::{Decoder, PackageFormat};
use crate::sanitize::resolve_entry;

/// What [`unpack`] wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnpackReport {
    /// Extracted files, in archive order.
    pub files:       Vec<PathBuf>,
    pub total_bytes: u64,
}

/// Extract a tar or tar+gzip stream into `dest`.
///
/// Entries that would resolve outside `dest` and link entries of either kind
/// abort extraction. Files already written stay in place.
pub fn unpack<R: Read>(reader: R, format: PackageFormat, dest: &Path) -> Result<UnpackReport> {
    let decoder = Decoder::new(format, reader)?;
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(false);
    archive.set_overwrite(true);

    fs::create_dir_all(dest).map_err(|source| PackError::ExtractionFailed {
        path: dest.to_path_buf(),
        source,
    })?;

    let mut report = UnpackReport::default();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();

        match entry.header().entry_type() {
            EntryType::Regular | EntryType::Continuous => {
                let target = resolve_entry(&entry_path, dest)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|source| PackError::ExtractionFailed {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                entry
                    .unpack(&target)
                    .map_err(|source| PackError::ExtractionFailed {
                        path: target.clone(),
                        source,
                    })?;
                trace!(path = %target.display(), "extracted file");
                report.total_bytes += entry.size();
                report.files.push(target);
            }
            EntryType::Directory => {
                let target = resolve_entry(&entry_path, dest)?;
                fs::create_dir_all(&target).map_err(|source| PackError::ExtractionFailed {
                    path: target,
                    source,
                })?;
            }
            EntryType::Symlink | EntryType::Link => return Err(PackError::LinkEntry(entry_path)),
            EntryType::XGlobalHeader | EntryType::XHeader => {}
            _ => return Err(PackError::UnsupportedEntry(entry_path)),
        }
    }

    debug!(
        dest = %dest.display(),
        files = report.files.len(),
        bytes = report.total_bytes,
        "unpacked archive"
    );
    Ok(report)
}
