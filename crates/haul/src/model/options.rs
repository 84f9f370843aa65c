use std::path::PathBuf;

use haul_verify::Checksum;

/// Per-call settings for [`ArtifactClient::upload`](crate::ArtifactClient::upload).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Days the service keeps the artifact. The service default applies when
    /// unset.
    pub retention_days: Option<u32>,
    /// Force a gzip-compressed tar even for a single file.
    pub compress:       bool,
    /// Root that patterns are resolved against. Defaults to the process's
    /// current directory.
    pub working_dir:    Option<PathBuf>,
}

impl UploadOptions {
    #[must_use]
    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Per-call settings for [`ArtifactClient::download`](crate::ArtifactClient::download).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub verify_checksum:   bool,
    /// Reference digest overriding the one recorded at upload.
    pub expected_checksum: Option<Checksum>,
    /// Unpack archives into the destination directory instead of writing
    /// the content bytes as one file.
    pub extract:           bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            verify_checksum:   true,
            expected_checksum: None,
            extract:           false,
        }
    }
}

impl DownloadOptions {
    #[must_use]
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    #[must_use]
    pub fn expected_checksum(mut self, checksum: Checksum) -> Self {
        self.expected_checksum = Some(checksum);
        self
    }

    #[must_use]
    pub fn extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }
}
