use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tar::{Builder, EntryType, Header};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PackError, Result};
use crate::format::{Encoder, PackageFormat};
use crate::sanitize::validate_entry_name;

/// Modification time written into every archive entry: 1980-01-01T00:00:00Z.
pub const FIXED_MTIME: u64 = 315_532_800;

/// A file to be packaged under `name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackEntry {
    pub source: PathBuf,
    /// `/`-separated name inside the archive.
    pub name:   String,
}

impl PackEntry {
    pub fn new(source: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name:   name.into(),
        }
    }
}

#[derive(Clone)]
pub struct PackOptions {
    pub max_bytes:         Option<u64>,
    pub compression_level: u32,
    pub mtime:             u64,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            max_bytes:         None,
            compression_level: 6,
            mtime:             FIXED_MTIME,
        }
    }
}

impl PackOptions {
    #[must_use]
    pub fn max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    #[must_use]
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    #[must_use]
    pub fn mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }
}

impl std::fmt::Debug for PackOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackOptions")
            .field("max_bytes", &self.max_bytes)
            .field("compression_level", &self.compression_level)
            .field("mtime", &self.mtime)
            .finish()
    }
}

/// Where a package's bytes live.
#[derive(Debug)]
enum Source {
    /// The caller's file, untouched.
    Direct(PathBuf),
    /// A spooled archive, deleted when the package is dropped.
    Spooled(NamedTempFile),
}

/// The content bytes of one artifact, ready to be sent.
#[derive(Debug)]
pub struct Package {
    format:       PackageFormat,
    len:          u64,
    uncompressed: u64,
    entries:      usize,
    source:       Source,
}

impl Package {
    pub fn format(&self) -> PackageFormat { self.format }

    /// Length in bytes of what will be sent.
    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Sum of the packaged files' sizes.
    pub fn uncompressed_len(&self) -> u64 { self.uncompressed }

    pub fn entry_count(&self) -> usize { self.entries }

    pub fn path(&self) -> &Path {
        match &self.source {
            Source::Direct(path) => path,
            Source::Spooled(file) => file.path(),
        }
    }

    pub fn open(&self) -> Result<File> {
        File::open(self.path()).map_err(|source| PackError::Unreadable {
            path: self.path().to_path_buf(),
            source,
        })
    }
}

/// Builds reproducible packages: the same entries with the same contents and
/// permissions always yield the same bytes.
#[derive(Clone, Debug, Default)]
pub struct Packager {
    options: PackOptions,
}

impl Packager {
    pub fn new(options: PackOptions) -> Self { Self { options } }

    pub fn options(&self) -> &PackOptions { &self.options }

    /// Stat every entry and check the combined size against the ceiling.
    /// Returns the per-entry sizes.
    pub fn check_size(&self, entries: &[PackEntry]) -> Result<Vec<u64>> {
        let mut sizes = Vec::with_capacity(entries.len());
        for entry in entries {
            let meta = fs::metadata(&entry.source).map_err(|source| PackError::Unreadable {
                path: entry.source.clone(),
                source,
            })?;
            sizes.push(meta.len());
        }

        let total: u64 = sizes.iter().sum();
        match self.options.max_bytes {
            Some(limit) if total > limit => Err(PackError::SizeExceeded {
                actual_bytes: total,
                limit_bytes:  limit,
            }),
            _ => Ok(sizes),
        }
    }

    /// Package `entries` as `format`, spooling archives into `staging_dir`.
    pub fn pack(&self, entries: &[PackEntry], format: PackageFormat, staging_dir: &Path) -> Result<Package> {
        let sizes = self.check_size(entries)?;
        let uncompressed = sizes.iter().sum();

        if format == PackageFormat::Raw {
            let [entry] = entries else {
                return Err(PackError::RawRequiresSingleFile { count: entries.len() });
            };
            File::open(&entry.source).map_err(|source| PackError::Unreadable {
                path: entry.source.clone(),
                source,
            })?;
            debug!(path = %entry.source.display(), bytes = uncompressed, "sending file without packaging");
            return Ok(Package {
                format,
                len: uncompressed,
                uncompressed,
                entries: 1,
                source: Source::Direct(entry.source.clone()),
            });
        }

        for entry in entries {
            validate_entry_name(&entry.name)?;
        }

        let mut spool = tempfile::Builder::new()
            .prefix(".haul-pack-")
            .suffix(format.extension())
            .tempfile_in(staging_dir)?;
        self.write(entries, &sizes, format, spool.as_file_mut())?;
        let len = spool.as_file().metadata()?.len();

        debug!(
            %format,
            entries = entries.len(),
            uncompressed,
            bytes = len,
            "packaged artifact content"
        );
        Ok(Package {
            format,
            len,
            uncompressed,
            entries: entries.len(),
            source: Source::Spooled(spool),
        })
    }

    /// Write an archive of `entries` to `out`.
    pub fn write<W: Write>(&self, entries: &[PackEntry], sizes: &[u64], format: PackageFormat, out: W) -> Result<()> {
        let encoder = Encoder::new(format, BufWriter::new(out), self.options.compression_level)?;
        let mut builder = Builder::new(encoder);

        for (entry, &size) in entries.iter().zip(sizes) {
            let file = File::open(&entry.source).map_err(|source| PackError::Unreadable {
                path: entry.source.clone(),
                source,
            })?;
            let mode = file_mode(&file);

            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(size);
            header.set_mode(mode);
            header.set_mtime(self.options.mtime);
            header.set_uid(0);
            header.set_gid(0);
            header.set_username("")?;
            header.set_groupname("")?;

            let mut reader = CountingReader::new(file.take(size));
            builder.append_data(&mut header, &entry.name, &mut reader)?;
            if reader.count != size {
                return Err(PackError::Unreadable {
                    path:   entry.source.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("file shrank from {size} to {} bytes while packaging", reader.count),
                    ),
                });
            }
        }

        let encoder = builder.into_inner()?;
        let mut out = encoder.finish()?;
        out.flush()?;
        Ok(())
    }
}

struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self { Self { inner, count: 0 } }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

#[cfg(unix)]
fn file_mode(file: &File) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    file.metadata().map(|m| m.permissions().mode() & 0o7777).unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(file: &File) -> u32 {
    match file.metadata() {
        Ok(m) if m.permissions().readonly() => 0o444,
        _ => 0o644,
    }
}
