//! Glob-based file selection for artifact uploads.
//!
//! Patterns are resolved against a canonical working directory. The result
//! is ordered by normalized relative path and free of duplicates, so the
//! same file set always produces the same selection regardless of the order
//! patterns were given in.
//!
//! - `*` and `?` stay within one path segment, `**` spans directories
//! - a matched directory contributes every file beneath it
//! - symlinks are followed, but nothing may resolve outside the root
//! - `!pattern` removes matches from the combined result

pub use error::{Result, SelectionError};
pub use selection::{SelectedFile, Selection};
pub use selector::Selector;

mod error;
mod pattern;
mod selection;
mod selector;
