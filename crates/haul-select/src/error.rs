use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("working directory '{path}' is not accessible: {source}")]
    Root { path: PathBuf, source: io::Error },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source:  globset::Error,
    },

    #[error("pattern '{pattern}' resolves to '{path}', outside of '{root}'")]
    EscapesRoot {
        pattern: String,
        path:    PathBuf,
        root:    PathBuf,
    },

    #[error("no files matched {patterns:?}")]
    NoMatches { patterns: Vec<String> },

    #[error("failed to walk '{path}': {source}")]
    Walk {
        path:   PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, SelectionError>;
