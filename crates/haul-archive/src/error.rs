use std::io;
use std::path::PathBuf;

use crate::PackageFormat;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("cannot read '{path}': {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("content totals {actual_bytes} bytes, over the {limit_bytes} byte limit")]
    SizeExceeded { actual_bytes: u64, limit_bytes: u64 },

    #[error("raw packages hold exactly one file, got {count}")]
    RawRequiresSingleFile { count: usize },

    #[error("invalid entry name '{0}'")]
    InvalidEntryName(String),

    #[error("unknown package format '{0}'")]
    UnknownFormat(String),

    #[error("{0} support is not compiled in")]
    UnsupportedFormat(PackageFormat),

    #[error("{0} content is not an archive")]
    NotAnArchive(PackageFormat),

    #[error("zip-slip attack detected: entry '{entry}' resolves to '{resolved}'")]
    ZipSlip { entry: PathBuf, resolved: PathBuf },

    #[error("entry '{0}' is a link; links are not extracted")]
    LinkEntry(PathBuf),

    #[error("entry '{0}' is not a regular file or directory")]
    UnsupportedEntry(PathBuf),

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PackError>;
