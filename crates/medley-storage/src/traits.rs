//! Storage backend contract
//!
//! Every backend kind (local disk, FTP, third-party hosts) implements
//! [`MediaBackend`]. The ingestion pipeline only talks to backends through
//! this trait.

use async_trait::async_trait;
use bytes::Bytes;
use medley_core::models::{AccessUri, MediaKind, StoredFile};
use medley_core::BackendKind;
use medley_db::StoredFileRepository;

use crate::catalogue;
use crate::error::BackendResult;

/// What is being ingested: uploaded bytes or a URL.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestInput {
    Upload { filename: String, content: Bytes },
    Url(String),
}

impl IngestInput {
    pub fn upload(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        IngestInput::Upload {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        IngestInput::Url(url.into())
    }

    /// File name of an upload, or the URL itself
    pub fn name(&self) -> &str {
        match self {
            IngestInput::Upload { filename, .. } => filename,
            IngestInput::Url(url) => url,
        }
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            IngestInput::Url(url) => Some(url.trim()),
            IngestInput::Upload { .. } => None,
        }
    }

    pub fn as_upload(&self) -> Option<(&str, &Bytes)> {
        match self {
            IngestInput::Upload { filename, content } => Some((filename, content)),
            IngestInput::Url(_) => None,
        }
    }
}

/// Where a thumbnail for the content item can be obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailSource {
    Inline(Bytes),
    Url(String),
}

/// Metadata a backend reports when it accepts an input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeMetadata {
    pub media_kind: MediaKind,
    pub unique_id: Option<String>,
    pub container: Option<String>,
    /// Also used as the content item title when it has none
    pub display_name: Option<String>,
    pub size: Option<u64>,
    /// Seconds
    pub duration: Option<u32>,
    pub description: Option<String>,
    pub thumbnail: Option<ThumbnailSource>,
}

impl ProbeMetadata {
    pub fn new(media_kind: MediaKind) -> Self {
        Self {
            media_kind,
            unique_id: None,
            container: None,
            display_name: None,
            size: None,
            duration: None,
            description: None,
            thumbnail: None,
        }
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Outcome of [`MediaBackend::probe`].
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    Accepted(ProbeMetadata),
    /// The backend does not handle this input; try the next one
    NotApplicable,
}

/// Outcome of [`MediaBackend::transcode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transcode {
    /// New stored files derived from the source, already persisted
    Derived(Vec<StoredFile>),
    NotApplicable,
}

/// Kinds a backend wants to be attempted before or after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingHints {
    pub before: Vec<BackendKind>,
    pub after: Vec<BackendKind>,
}

/// Storage backend trait
///
/// Implementations hold no per-call mutable state: one instance may serve
/// concurrent ingestions, all per-call data flows through the arguments.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Primary key of the configuration record
    fn id(&self) -> i64;

    fn name(&self) -> &str;

    fn ordering(&self) -> OrderingHints {
        catalogue::default_hints(self.kind())
    }

    /// Whether at most one enabled instance of this kind may exist
    fn is_singleton(&self) -> bool {
        catalogue::is_singleton(self.kind())
    }

    /// Decide whether this backend handles the input.
    async fn probe(&self, input: &IngestInput) -> BackendResult<Probe>;

    /// Persist the bytes or reference. `file` already has its primary key.
    /// Returns the unique id when probe did not supply one.
    async fn store(
        &self,
        file: &StoredFile,
        input: &IngestInput,
        metadata: &ProbeMetadata,
    ) -> BackendResult<Option<String>>;

    /// Called once storage and thumbnailing are committed.
    async fn post_process(&self, _file: &StoredFile) -> BackendResult<()> {
        Ok(())
    }

    /// Best-effort removal of the artifact. Never raises.
    async fn delete(&self, unique_id: &str) -> bool;

    /// Derive additional stored files from `file`, allocating them in `files`.
    async fn transcode(
        &self,
        _file: &StoredFile,
        _files: &dyn StoredFileRepository,
    ) -> BackendResult<Transcode> {
        Ok(Transcode::NotApplicable)
    }

    fn access_uris(&self, file: &StoredFile) -> Vec<AccessUri>;
}
