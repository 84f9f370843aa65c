use chrono::{DateTime, Utc};
use haul_archive::PackageFormat;
use haul_verify::Checksum;
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactState {
    #[default]
    Active,
    Expired,
    Deleted,
}

/// Metadata of a stored artifact, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub id:            String,
    pub name:          String,
    pub size_in_bytes: u64,
    pub created_at:    DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at:    Option<DateTime<Utc>>,
    #[serde(default)]
    pub state:         ArtifactState,
    /// Digest recorded at upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest:        Option<Checksum>,
    #[serde(default)]
    pub format:        PackageFormat,
}

impl ArtifactDescriptor {
    /// Active and not past its expiry at `now`.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.state == ArtifactState::Active && self.expires_at.is_none_or(|at| at > now)
    }

    pub fn is_available(&self) -> bool { self.is_available_at(Utc::now()) }
}

/// One page of `GET /artifacts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    pub artifacts:   Vec<ArtifactDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
