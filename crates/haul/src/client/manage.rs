use futures_util::TryStreamExt;
use haul_transfer::{HttpClient, Request};
use tracing::{debug, info};

use super::{ArtifactClient, read_body};
use crate::error::{ArtifactError, Result};
use crate::model::{ArtifactDescriptor, TransferOutcome, TransferResult, validate_id, validate_name};

const GONE: [u16; 2] = [404, 410];

impl<C: HttpClient> ArtifactClient<C> {
    /// Descriptor of artifact `id`.
    ///
    /// Fails with [`ArtifactError::NotFound`] when the artifact does not
    /// exist, has expired or was deleted.
    pub async fn get(&self, id: &str) -> Result<ArtifactDescriptor> {
        validate_id(id)?;
        let request = Request::get(format!("/artifacts/{id}"));

        let request = &request;
        let retried = self
            .retrying("get", id, move |_| async move {
                let response = self.attempt(request, &GONE).await?;
                if GONE.contains(&response.status()) {
                    return Ok(None);
                }
                read_body(response).await.map(Some)
            })
            .await?;

        let not_found = || ArtifactError::NotFound { id: id.to_string() };
        let body = retried.value.ok_or_else(not_found)?;
        let descriptor: ArtifactDescriptor = serde_json::from_slice(&body)
            .map_err(|err| ArtifactError::protocol("get", format!("malformed artifact descriptor: {err}")))?;

        if descriptor.id != id {
            return Err(ArtifactError::protocol(
                "get",
                format!("asked for artifact '{id}', service answered with '{}'", descriptor.id),
            ));
        }
        if !descriptor.is_available() {
            debug!(id, state = ?descriptor.state, expires_at = ?descriptor.expires_at, "artifact no longer available");
            return Err(not_found());
        }
        Ok(descriptor)
    }

    /// Delete artifact `id`. Deleting an artifact that is already gone
    /// succeeds with `existed: false`.
    pub async fn delete(&self, id: &str) -> Result<TransferResult> {
        validate_id(id)?;
        let request = Request::delete(format!("/artifacts/{id}"));

        let request = &request;
        let retried = self
            .retrying("delete", id, move |_| async move {
                let response = self.attempt(request, &GONE).await?;
                Ok(!GONE.contains(&response.status()))
            })
            .await?;

        let existed = retried.value;
        info!(id, existed, attempts = retried.attempts, "deleted artifact");
        Ok(TransferResult::succeeded(
            TransferOutcome::Deleted {
                id: id.to_string(),
                existed,
            },
            None,
            retried.attempts,
        ))
    }
}

impl<C: HttpClient + 'static> ArtifactClient<C> {
    /// Newest available artifact named exactly `name`.
    pub async fn find(&self, name: &str) -> Result<Option<ArtifactDescriptor>> {
        validate_name(name)?;
        self.list(None)?
            .try_fold(None, |newest: Option<ArtifactDescriptor>, artifact| async move {
                if artifact.name != name || !artifact.is_available() {
                    return Ok(newest);
                }
                Ok(match newest {
                    Some(current) if current.created_at >= artifact.created_at => Some(current),
                    _ => Some(artifact),
                })
            })
            .await
    }
}
