use std::path::{Path, PathBuf};

use crate::error::{Result, SelectionError};

/// A regular file picked by the selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    /// `/`-separated path relative to the selector root.
    pub relative: String,
    /// Location on disk, under the selector root.
    pub path:     PathBuf,
    pub size:     u64,
}

impl SelectedFile {
    /// Relative path with `prefix` (a directory from [`Selection::common_root`])
    /// removed.
    pub fn relative_to(&self, prefix: &str) -> &str {
        if prefix.is_empty() {
            return &self.relative;
        }
        self.relative
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.relative)
    }
}

/// Ordered, duplicate-free result of a selection.
#[derive(Clone, Debug)]
pub struct Selection {
    pub(crate) root:              PathBuf,
    pub(crate) files:             Vec<SelectedFile>,
    pub(crate) patterns:          Vec<String>,
    pub(crate) expanded_directory: bool,
}

impl Selection {
    pub fn root(&self) -> &Path { &self.root }

    pub fn files(&self) -> &[SelectedFile] { &self.files }

    pub fn into_files(self) -> Vec<SelectedFile> { self.files }

    pub fn len(&self) -> usize { self.files.len() }

    pub fn is_empty(&self) -> bool { self.files.is_empty() }

    pub fn total_size(&self) -> u64 { self.files.iter().map(|f| f.size).sum() }

    /// Whether any file entered the selection through a matched directory.
    pub fn has_directories(&self) -> bool { self.expanded_directory }

    pub fn relative_paths(&self) -> Vec<&str> { self.files.iter().map(|f| f.relative.as_str()).collect() }

    /// Fail with [`SelectionError::NoMatches`] when nothing was selected.
    pub fn non_empty(self) -> Result<Self> {
        if self.files.is_empty() {
            return Err(SelectionError::NoMatches {
                patterns: self.patterns,
            });
        }
        Ok(self)
    }

    /// Deepest directory containing every selected file, relative to the
    /// root. Empty when the files share no directory below the root.
    pub fn common_root(&self) -> String {
        let mut files = self.files.iter();
        let Some(first) = files.next() else {
            return String::new();
        };

        let parent = |relative: &str| -> Vec<String> {
            let mut segments: Vec<String> = relative.split('/').map(str::to_string).collect();
            segments.pop();
            segments
        };

        let mut common = parent(&first.relative);
        for file in files {
            let segments = parent(&file.relative);
            let shared = common
                .iter()
                .zip(&segments)
                .take_while(|(a, b)| a == b)
                .count();
            common.truncate(shared);
            if common.is_empty() {
                break;
            }
        }
        common.join("/")
    }
}
