use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SelectionError};
use crate::pattern::{Pattern, to_slash};
use crate::selection::{SelectedFile, Selection};

/// Expands glob patterns into files under a working directory.
#[derive(Clone, Debug)]
pub struct Selector {
    root: PathBuf,
}

impl Selector {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|source| SelectionError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Resolve `patterns` into an ordered, duplicate-free list of files.
    ///
    /// A pattern that matches nothing is not an error. Patterns prefixed with
    /// `!` remove files from the combined result.
    pub fn select<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Selection> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for raw in patterns {
            if let Some(pattern) = Pattern::parse(raw.as_ref(), &self.root)? {
                if pattern.negated {
                    excludes.push(pattern);
                } else {
                    includes.push(pattern);
                }
            }
        }

        let mut found = Found::default();
        for pattern in &includes {
            let before = found.files.len();
            self.expand(pattern, &mut found)?;
            debug!(
                pattern = %pattern.raw,
                matched = found.files.len() - before,
                "expanded selection pattern"
            );
        }

        found
            .files
            .retain(|relative, _| !excludes.iter().any(|p| p.covers(relative)));

        Ok(Selection {
            root:               self.root.clone(),
            files:              found.files.into_values().collect(),
            patterns:           patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            expanded_directory: found.expanded_directory,
        })
    }

    fn expand(&self, pattern: &Pattern, found: &mut Found) -> Result<()> {
        let base = self.root.join(&pattern.base);

        if pattern.is_literal() {
            return match fs::metadata(&base) {
                Ok(meta) if meta.is_dir() => self.collect_dir(&base, pattern, found),
                Ok(meta) if meta.is_file() => self.insert(&base, pattern, found),
                Ok(_) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(SelectionError::Io { path: base, source }),
            };
        }

        if !base.is_dir() {
            return Ok(());
        }

        let mut entries = WalkDir::new(&base).follow_links(true).min_depth(1).into_iter();
        while let Some(entry) = entries.next() {
            let Some(entry) = skip_dangling(entry)? else {
                continue;
            };
            let relative = self.relative(entry.path());
            if !pattern.matches(&relative) {
                continue;
            }
            if entry.file_type().is_dir() {
                self.collect_dir(entry.path(), pattern, found)?;
                entries.skip_current_dir();
            } else if entry.file_type().is_file() {
                self.insert(entry.path(), pattern, found)?;
            }
        }
        Ok(())
    }

    fn collect_dir(&self, dir: &Path, pattern: &Pattern, found: &mut Found) -> Result<()> {
        for entry in WalkDir::new(dir).follow_links(true).min_depth(1) {
            let Some(entry) = skip_dangling(entry)? else {
                continue;
            };
            if entry.file_type().is_file() {
                self.insert(entry.path(), pattern, found)?;
                found.expanded_directory = true;
            }
        }
        Ok(())
    }

    fn insert(&self, path: &Path, pattern: &Pattern, found: &mut Found) -> Result<()> {
        let canonical = path.canonicalize().map_err(|source| SelectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !canonical.starts_with(&self.root) {
            return Err(SelectionError::EscapesRoot {
                pattern: pattern.raw.clone(),
                path:    canonical,
                root:    self.root.clone(),
            });
        }

        let size = fs::metadata(&canonical)
            .map_err(|source| SelectionError::Io {
                path: canonical.clone(),
                source,
            })?
            .len();

        let relative = self.relative(path);
        found.files.entry(relative.clone()).or_insert(SelectedFile {
            relative,
            path: path.to_path_buf(),
            size,
        });
        Ok(())
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root).map(to_slash).unwrap_or_default()
    }
}

#[derive(Default)]
struct Found {
    files:              BTreeMap<String, SelectedFile>,
    expanded_directory: bool,
}

/// Dangling symlinks are skipped; every other walk error is fatal.
fn skip_dangling(entry: walkdir::Result<walkdir::DirEntry>) -> Result<Option<walkdir::DirEntry>> {
    match entry {
        Ok(entry) => Ok(Some(entry)),
        Err(err) => {
            let path = err.path().map(Path::to_path_buf).unwrap_or_default();
            let dangling = err.loop_ancestor().is_none()
                && err.io_error().is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
                && fs::symlink_metadata(&path).is_ok_and(|m| m.file_type().is_symlink());
            if dangling {
                debug!(path = %path.display(), "skipping dangling symlink");
                return Ok(None);
            }
            Err(SelectionError::Walk { path, source: err })
        }
    }
}
