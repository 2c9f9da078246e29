//! Ingestion pipeline: probe → allocate → store → derive → thumbnail →
//! post-process → transcode.
//!
//! The backend list is rebuilt from configuration on every call. Either the
//! whole sequence completes, or the allocated stored file is removed again
//! and the error propagates.

use medley_core::models::{AccessUri, ContentItem, NewStoredFile, StoredFile};
use medley_core::{AppError, AppResult};
use medley_db::StoredFileRepository;
use medley_storage::{
    BackendRegistry, BackendSource, ContentFetcher, IngestInput, MediaBackend, Probe,
    ProbeMetadata, ThumbnailSource, Transcode,
};
use serde::Serialize;
use std::sync::Arc;

use crate::thumbnail::{seed_filename, Thumbnailer};

/// Result of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub file: StoredFile,
    /// Stored files produced by the transcode step
    pub derived: Vec<StoredFile>,
}

pub struct IngestPipeline {
    backends: Arc<dyn BackendSource>,
    files: Arc<dyn StoredFileRepository>,
    thumbnailer: Arc<dyn Thumbnailer>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl IngestPipeline {
    pub fn new(
        backends: Arc<dyn BackendSource>,
        files: Arc<dyn StoredFileRepository>,
        thumbnailer: Arc<dyn Thumbnailer>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            backends,
            files,
            thumbnailer,
            fetcher,
        }
    }

    /// Probe only: the first backend in order that accepts the input, with
    /// its metadata. Nothing is persisted.
    pub async fn probe(
        &self,
        input: &IngestInput,
    ) -> AppResult<(Arc<dyn MediaBackend>, ProbeMetadata)> {
        let registry = self.backends.registry().await?;
        probe_in_order(&registry, input).await
    }

    /// Ingest one upload or URL into `item`.
    ///
    /// On success `item` gains the new stored file ids and any title,
    /// description or duration it was missing. On failure `item` is left
    /// untouched and no stored file row survives.
    #[tracing::instrument(skip(self, item, input), fields(content_item_id = item.id, input = %input.name()))]
    pub async fn ingest(
        &self,
        item: &mut ContentItem,
        input: IngestInput,
    ) -> AppResult<IngestOutcome> {
        let start = std::time::Instant::now();
        let registry = self.backends.registry().await?;
        let (backend, metadata) = probe_in_order(&registry, &input).await?;

        let mut file = self
            .files
            .allocate(NewStoredFile {
                backend_id: backend.id(),
                content_item_id: item.id,
                media_kind: metadata.media_kind,
                container: metadata.container.clone(),
                display_name: metadata.display_name.clone(),
                size: metadata.size,
                bitrate: None,
                width: None,
                height: None,
                unique_id: metadata.unique_id.clone(),
            })
            .await?;
        tracing::debug!(stored_file_id = file.id, backend_id = backend.id(), "Stored file allocated");

        let mut staged = item.clone();
        let result = self
            .complete(&registry, backend.as_ref(), &mut staged, &input, &metadata, &mut file)
            .await;

        match result {
            Ok(derived) => {
                staged.files.push(file.id);
                staged.files.extend(derived.iter().map(|f| f.id));
                *item = staged;

                tracing::info!(
                    stored_file_id = file.id,
                    backend_id = backend.id(),
                    unique_id = ?file.unique_id,
                    derived = derived.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Ingestion completed"
                );
                Ok(IngestOutcome { file, derived })
            }
            Err(e) => {
                tracing::warn!(
                    stored_file_id = file.id,
                    backend_id = backend.id(),
                    error = %e,
                    "Ingestion failed, rolling back"
                );
                self.rollback(backend.as_ref(), &file).await;
                Err(e)
            }
        }
    }

    async fn complete(
        &self,
        registry: &BackendRegistry,
        backend: &dyn MediaBackend,
        item: &mut ContentItem,
        input: &IngestInput,
        metadata: &ProbeMetadata,
        file: &mut StoredFile,
    ) -> AppResult<Vec<StoredFile>> {
        if let Some(unique_id) = backend.store(file, input, metadata).await? {
            file.unique_id = Some(unique_id);
        }
        if file.unique_id.is_none() {
            return Err(AppError::Internal(format!(
                "Backend {} stored the input without a unique id",
                backend.id()
            )));
        }
        self.files.update(file).await?;
        tracing::debug!(stored_file_id = file.id, unique_id = ?file.unique_id, "Stored");

        fill_content_fields(item, metadata);
        self.seed_thumbnail(item, metadata).await?;

        backend.post_process(file).await?;

        transcode_in_order(registry, file, self.files.as_ref()).await
    }

    async fn seed_thumbnail(&self, item: &ContentItem, metadata: &ProbeMetadata) -> AppResult<()> {
        let Some(source) = &metadata.thumbnail else {
            return Ok(());
        };
        if self.thumbnailer.has_thumbnail(item).await
            && !self.thumbnailer.has_default_thumbnail(item).await
        {
            return Ok(());
        }

        let (image, filename) = match source {
            ThumbnailSource::Inline(bytes) => (bytes.clone(), seed_filename(None)),
            ThumbnailSource::Url(url) => match self.fetcher.fetch(url).await {
                Ok(bytes) => (bytes, seed_filename(Some(url))),
                Err(e) => {
                    tracing::warn!(
                        content_item_id = item.id,
                        url = %url,
                        error = %e,
                        "Failed to fetch thumbnail, skipping"
                    );
                    return Ok(());
                }
            },
        };

        self.thumbnailer
            .create_thumbnails(item, image, &filename)
            .await?;
        tracing::debug!(content_item_id = item.id, filename = %filename, "Thumbnail seeded");
        Ok(())
    }

    async fn rollback(&self, backend: &dyn MediaBackend, file: &StoredFile) {
        if let Some(unique_id) = file.unique_id.as_deref() {
            if !backend.delete(unique_id).await {
                tracing::warn!(
                    stored_file_id = file.id,
                    unique_id = %unique_id,
                    "Rollback could not delete stored artifact"
                );
            }
        }
        if let Err(e) = self.files.remove(file.id).await {
            tracing::error!(stored_file_id = file.id, error = %e, "Rollback could not remove stored file row");
        }
    }

    /// Delete one stored file: the owning backend removes the artifact, then
    /// the row is removed. Returns whether the artifact deletion succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn delete_file(&self, stored_file_id: i64) -> AppResult<bool> {
        let file = self
            .files
            .get(stored_file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Stored file {}", stored_file_id)))?;

        let deleted = delete_artifact(self.backends.as_ref(), &file).await?;
        self.files.remove(file.id).await?;
        Ok(deleted)
    }

    /// Access URIs of one stored file, computed by its owning backend.
    pub async fn access_uris(&self, file: &StoredFile) -> AppResult<Vec<AccessUri>> {
        let backend = self
            .backends
            .instance(file.backend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Storage backend {}", file.backend_id)))?;
        Ok(backend.access_uris(file))
    }

    /// Access URIs across every stored file of a content item.
    pub async fn item_access_uris(&self, item: &ContentItem) -> AppResult<Vec<AccessUri>> {
        let mut uris = Vec::new();
        for file in self.files.list_for_item(item.id).await? {
            uris.extend(self.access_uris(&file).await?);
        }
        Ok(uris)
    }
}

async fn probe_in_order(
    registry: &BackendRegistry,
    input: &IngestInput,
) -> AppResult<(Arc<dyn MediaBackend>, ProbeMetadata)> {
    for backend in registry.ordered() {
        match backend.probe(input).await? {
            Probe::Accepted(metadata) => {
                tracing::debug!(
                    backend_id = backend.id(),
                    kind = %backend.kind(),
                    media_kind = ?metadata.media_kind,
                    "Probe accepted"
                );
                return Ok((Arc::clone(backend), metadata));
            }
            Probe::NotApplicable => {
                tracing::trace!(backend_id = backend.id(), "Probe not applicable");
            }
        }
    }

    tracing::debug!(input = %input.name(), "No backend accepted the input");
    Err(AppError::UnusableInput)
}

async fn transcode_in_order(
    registry: &BackendRegistry,
    file: &StoredFile,
    files: &dyn StoredFileRepository,
) -> AppResult<Vec<StoredFile>> {
    for backend in registry.ordered() {
        if let Transcode::Derived(derived) = backend.transcode(file, files).await? {
            tracing::info!(
                stored_file_id = file.id,
                backend_id = backend.id(),
                derived = derived.len(),
                "Transcoded"
            );
            return Ok(derived);
        }
    }
    Ok(Vec::new())
}

/// Copy metadata into the item's empty fields. Existing values are kept.
pub(crate) fn fill_content_fields(item: &mut ContentItem, metadata: &ProbeMetadata) {
    if !item.has_title() {
        if let Some(title) = metadata.display_name.as_deref().filter(|t| !t.trim().is_empty()) {
            item.title = Some(title.to_string());
        }
    }
    if !item.has_description() {
        if let Some(description) = metadata.description.as_deref().filter(|d| !d.trim().is_empty())
        {
            item.description = Some(description.to_string());
        }
    }
    if !item.has_duration() {
        if let Some(duration) = metadata.duration.filter(|d| *d > 0) {
            item.duration = Some(duration);
        }
    }
}

/// Ask the owning backend to delete a stored file's artifact. A missing
/// backend or unique id counts as a failed deletion.
pub(crate) async fn delete_artifact(
    backends: &dyn BackendSource,
    file: &StoredFile,
) -> AppResult<bool> {
    let Some(unique_id) = file.unique_id.as_deref() else {
        tracing::warn!(stored_file_id = file.id, "Stored file has no unique id");
        return Ok(false);
    };
    let Some(backend) = backends.instance(file.backend_id).await? else {
        tracing::warn!(
            stored_file_id = file.id,
            backend_id = file.backend_id,
            "Owning backend no longer exists"
        );
        return Ok(false);
    };

    let deleted = backend.delete(unique_id).await;
    if !deleted {
        tracing::warn!(
            stored_file_id = file.id,
            backend_id = file.backend_id,
            unique_id = %unique_id,
            "Backend failed to delete stored artifact"
        );
    }
    Ok(deleted)
}
