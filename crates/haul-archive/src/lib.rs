//! Reproducible packaging of artifact content.
//!
//! A lone file is sent as-is; anything else becomes a tar stream, optionally
//! gzip-compressed. Entry order, names, permission bits and timestamps are
//! all fixed by the input, so packing the same files twice yields identical
//! bytes and therefore identical digests.
//!
//! ```no_run
//! use std::path::Path;
//! use haul_archive::{PackEntry, PackOptions, PackageFormat, Packager};
//!
//! # fn main() -> haul_archive::Result<()> {
//! let entries = vec![
//!     PackEntry::new("out/a.txt", "a.txt"),
//!     PackEntry::new("out/b.txt", "b.txt"),
//! ];
//! let packager = Packager::new(PackOptions::default().max_bytes(1 << 30));
//! let package = packager.pack(&entries, PackageFormat::TarGzip, Path::new("/tmp"))?;
//! println!("{} bytes at {}", package.len(), package.path().display());
//! # Ok(())
//! # }
//! ```

pub use error::{PackError, Result};
pub use format::PackageFormat;
pub use pack::{FIXED_MTIME, Package, PackEntry, PackOptions, Packager};
pub use sanitize::{resolve_entry, validate_entry_name};
pub use unpack::{UnpackReport, unpack};

mod error;
mod format;
mod pack;
mod sanitize;
mod unpack;
