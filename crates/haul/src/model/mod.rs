//! Types exchanged with callers and with the artifact service.

mod descriptor;
mod name;
mod options;
mod result;

pub use descriptor::{ArtifactDescriptor, ArtifactState, ListPage};
pub(crate) use name::validate_id;
pub use name::{validate_name, validate_retention};
pub use options::{DownloadOptions, UploadOptions};
pub use result::{TransferOutcome, TransferResult};
