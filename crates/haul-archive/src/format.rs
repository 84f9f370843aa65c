use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};

/// How artifact content bytes are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PackageFormat {
    /// A single file, sent as-is.
    #[default]
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "tar")]
    Tar,
    #[serde(rename = "tar+gzip")]
    TarGzip,
}

impl PackageFormat {
    /// Pick the layout for a selection.
    ///
    /// Packaging is skipped only for a lone file that did not come from a
    /// directory and is not meant to be compressed.
    pub fn choose(file_count: usize, from_directory: bool, compress: bool) -> Self {
        match (file_count, from_directory, compress) {
            (1, false, false) => Self::Raw,
            (_, _, true) => Self::TarGzip,
            _ => Self::Tar,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Tar => "tar",
            Self::TarGzip => "tar+gzip",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Raw => "",
            Self::Tar => ".tar",
            Self::TarGzip => ".tar.gz",
        }
    }

    pub fn is_archive(self) -> bool { !matches!(self, Self::Raw) }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

impl FromStr for PackageFormat {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "tar" => Ok(Self::Tar),
            "tar+gzip" | "tar.gz" | "tgz" => Ok(Self::TarGzip),
            other => Err(PackError::UnknownFormat(other.to_string())),
        }
    }
}

/// Compression layer wrapped around the tar stream on write.
pub(crate) enum Encoder<W: Write> {
    Plain(W),
    #[cfg(feature = "gzip")]
    Gzip(flate2::write::GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    pub(crate) fn new(format: PackageFormat, writer: W, level: u32) -> Result<Self> {
        match format {
            PackageFormat::Raw | PackageFormat::Tar => Ok(Self::Plain(writer)),
            // Zero mtime and no embedded file name keep the header reproducible.
            #[cfg(feature = "gzip")]
            PackageFormat::TarGzip => Ok(Self::Gzip(
                flate2::GzBuilder::new()
                    .mtime(0)
                    .write(writer, flate2::Compression::new(level.min(9))),
            )),
            #[cfg(not(feature = "gzip"))]
            PackageFormat::TarGzip => {
                let _ = level;
                Err(PackError::UnsupportedFormat(format))
            }
        }
    }

    pub(crate) fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(w) => Ok(w),
            #[cfg(feature = "gzip")]
            Self::Gzip(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(e) => e.flush(),
        }
    }
}

/// Decoder wrapper for unpacking.
pub(crate) enum Decoder<R: Read> {
    Passthrough(R),
    #[cfg(feature = "gzip")]
    Gzip(Box<flate2::read::GzDecoder<R>>),
}

impl<R: Read> Decoder<R> {
    pub(crate) fn new(format: PackageFormat, reader: R) -> Result<Self> {
        match format {
            PackageFormat::Raw => Err(PackError::NotAnArchive(format)),
            PackageFormat::Tar => Ok(Self::Passthrough(reader)),
            #[cfg(feature = "gzip")]
            PackageFormat::TarGzip => Ok(Self::Gzip(Box::new(flate2::read::GzDecoder::new(reader)))),
            #[cfg(not(feature = "gzip"))]
            PackageFormat::TarGzip => Err(PackError::UnsupportedFormat(format)),
        }
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(r) => r.read(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(d) => d.read(buf),
        }
    }
}
