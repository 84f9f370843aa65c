use std::collections::HashSet;

use futures_util::{TryStreamExt, stream};
use globset::{Glob, GlobMatcher};
use haul_transfer::{BoxStream, HttpClient, Request};
use tracing::debug;

use super::{ArtifactClient, read_body};
use crate::error::{ArtifactError, Result};
use crate::model::{ArtifactDescriptor, ListPage};

/// Where the next step of a listing goes.
enum Next {
    Page(Option<String>),
    Fail(ArtifactError),
    Done,
}

struct Pager<C> {
    client:  ArtifactClient<C>,
    filter:  Option<GlobMatcher>,
    next:    Next,
    cursors: HashSet<String>,
    seen:    HashSet<String>,
}

impl<C: HttpClient> Pager<C> {
    /// Fetch one page and keep the descriptors not yielded before.
    async fn step(mut self) -> Result<Option<(Vec<ArtifactDescriptor>, Self)>> {
        let cursor = match std::mem::replace(&mut self.next, Next::Done) {
            Next::Page(cursor) => cursor,
            Next::Fail(err) => return Err(err),
            Next::Done => return Ok(None),
        };

        let page = self.client.fetch_page(cursor.as_deref()).await?;
        debug!(cursor = cursor.as_deref(), artifacts = page.artifacts.len(), "fetched page");

        self.next = match page.next_cursor.filter(|cursor| !cursor.is_empty()) {
            None => Next::Done,
            Some(next) if !self.cursors.insert(next.clone()) => Next::Fail(ArtifactError::protocol(
                "list",
                format!("service returned cursor '{next}' twice"),
            )),
            Some(next) => Next::Page(Some(next)),
        };

        let artifacts = page
            .artifacts
            .into_iter()
            .filter(|artifact| self.filter.as_ref().is_none_or(|glob| glob.is_match(&artifact.name)))
            .filter(|artifact| self.seen.insert(artifact.id.clone()))
            .collect();
        Ok(Some((artifacts, self)))
    }
}

impl<C: HttpClient + 'static> ArtifactClient<C> {
    /// Stream descriptors page by page, optionally keeping only names that
    /// match the glob `name_pattern`.
    ///
    /// Each descriptor is yielded once. Pages are fetched lazily; a stream
    /// dropped early fetches nothing more. Call again to start over.
    pub fn list(&self, name_pattern: Option<&str>) -> Result<BoxStream<'static, Result<ArtifactDescriptor>>> {
        let filter = name_pattern
            .map(|pattern| {
                Glob::new(pattern)
                    .map(|glob| glob.compile_matcher())
                    .map_err(|err| ArtifactError::invalid(format!("invalid name pattern '{pattern}': {err}")))
            })
            .transpose()?;

        let pager = Pager {
            client: self.clone(),
            filter,
            next: Next::Page(None),
            cursors: HashSet::new(),
            seen: HashSet::new(),
        };

        let pages = stream::try_unfold(pager, Pager::step);
        let descriptors = pages
            .map_ok(|artifacts| stream::iter(artifacts.into_iter().map(Ok)))
            .try_flatten();
        Ok(Box::pin(descriptors))
    }

    /// Every descriptor [`list`](Self::list) yields, in service order.
    pub async fn list_all(&self, name_pattern: Option<&str>) -> Result<Vec<ArtifactDescriptor>> {
        self.list(name_pattern)?.try_collect().await
    }
}

impl<C: HttpClient> ArtifactClient<C> {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListPage> {
        let mut request = Request::get("/artifacts").query("per_page", self.config().page_size.to_string());
        if let Some(cursor) = cursor {
            request = request.query("cursor", cursor);
        }
        let target = cursor.map_or_else(|| "artifacts".to_string(), |c| format!("artifacts (cursor {c})"));

        let request = &request;
        let retried = self
            .retrying("list", &target, move |_| async move {
                read_body(self.attempt(request, &[]).await?).await
            })
            .await?;

        serde_json::from_slice(&retried.value)
            .map_err(|err| ArtifactError::protocol("list", format!("malformed artifact page: {err}")))
    }
}
