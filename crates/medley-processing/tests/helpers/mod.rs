//! Scripted collaborators for driving the ingestion pipeline in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use medley_core::models::{AccessUri, ContentItem, NewStoredFile, StoredFile, UriProtocol};
use medley_core::{AppError, AppResult, BackendKind};
use medley_db::StoredFileRepository;
use medley_storage::{
    BackendError, BackendRegistry, BackendResult, BackendSource, ContentFetcher, IngestInput,
    MediaBackend, Probe, ProbeMetadata, Transcode,
};
use medley_processing::Thumbnailer;
use std::sync::{Arc, Mutex};

/// Shared, ordered record of backend calls.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

enum StoreScript {
    Returns(Option<String>),
    Fails(BackendError),
}

/// Backend whose every step is scripted and logged as `"{step}:{id}"`.
pub struct ScriptedBackend {
    id: i64,
    kind: BackendKind,
    log: CallLog,
    accepts: Option<ProbeMetadata>,
    store: StoreScript,
    fail_post_process: bool,
    derives: usize,
    delete_succeeds: bool,
}

impl ScriptedBackend {
    pub fn new(id: i64, kind: BackendKind, log: &CallLog) -> Self {
        Self {
            id,
            kind,
            log: log.clone(),
            accepts: None,
            store: StoreScript::Returns(None),
            fail_post_process: false,
            derives: 0,
            delete_succeeds: true,
        }
    }

    pub fn accepting(mut self, metadata: ProbeMetadata) -> Self {
        self.accepts = Some(metadata);
        self
    }

    pub fn storing_as(mut self, unique_id: &str) -> Self {
        self.store = StoreScript::Returns(Some(unique_id.to_string()));
        self
    }

    pub fn failing_store(mut self, error: BackendError) -> Self {
        self.store = StoreScript::Fails(error);
        self
    }

    pub fn failing_post_process(mut self) -> Self {
        self.fail_post_process = true;
        self
    }

    pub fn deriving(mut self, count: usize) -> Self {
        self.derives = count;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.delete_succeeds = false;
        self
    }

    pub fn into_arc(self) -> Arc<dyn MediaBackend> {
        Arc::new(self)
    }
}

#[async_trait]
impl MediaBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self, _input: &IngestInput) -> BackendResult<Probe> {
        self.log.push(format!("probe:{}", self.id));
        Ok(match &self.accepts {
            Some(metadata) => Probe::Accepted(metadata.clone()),
            None => Probe::NotApplicable,
        })
    }

    async fn store(
        &self,
        _file: &StoredFile,
        _input: &IngestInput,
        _metadata: &ProbeMetadata,
    ) -> BackendResult<Option<String>> {
        self.log.push(format!("store:{}", self.id));
        match &self.store {
            StoreScript::Returns(unique_id) => Ok(unique_id.clone()),
            StoreScript::Fails(BackendError::UserFacing(msg)) => {
                Err(BackendError::UserFacing(msg.clone()))
            }
            StoreScript::Fails(other) => Err(BackendError::Internal(other.to_string())),
        }
    }

    async fn post_process(&self, _file: &StoredFile) -> BackendResult<()> {
        self.log.push(format!("post_process:{}", self.id));
        if self.fail_post_process {
            return Err(BackendError::Internal("post-process exploded".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, unique_id: &str) -> bool {
        self.log.push(format!("delete:{}:{}", self.id, unique_id));
        self.delete_succeeds
    }

    async fn transcode(
        &self,
        file: &StoredFile,
        files: &dyn StoredFileRepository,
    ) -> BackendResult<Transcode> {
        self.log.push(format!("transcode:{}", self.id));
        if self.derives == 0 {
            return Ok(Transcode::NotApplicable);
        }

        let mut derived = Vec::new();
        for n in 0..self.derives {
            let row = files
                .allocate(NewStoredFile {
                    backend_id: self.id,
                    content_item_id: file.content_item_id,
                    media_kind: file.media_kind,
                    container: Some("mp4".to_string()),
                    display_name: file.display_name.clone(),
                    size: None,
                    bitrate: None,
                    width: None,
                    height: None,
                    unique_id: Some(format!("derived-{}", n)),
                })
                .await?;
            derived.push(row);
        }
        Ok(Transcode::Derived(derived))
    }

    fn access_uris(&self, file: &StoredFile) -> Vec<AccessUri> {
        match file.unique_id.as_deref() {
            Some(unique_id) => vec![AccessUri::new(
                file,
                UriProtocol::Http,
                format!("https://cdn.example.com/{}", unique_id),
            )],
            None => Vec::new(),
        }
    }
}

/// Fixed backend set, built into a registry on every call.
pub struct StaticBackends {
    backends: Vec<Arc<dyn MediaBackend>>,
}

impl StaticBackends {
    pub fn new(backends: Vec<Arc<dyn MediaBackend>>) -> Arc<Self> {
        Arc::new(Self { backends })
    }
}

#[async_trait]
impl BackendSource for StaticBackends {
    async fn registry(&self) -> AppResult<BackendRegistry> {
        BackendRegistry::build(self.backends.clone()).map_err(AppError::from)
    }

    async fn instance(&self, backend_id: i64) -> AppResult<Option<Arc<dyn MediaBackend>>> {
        Ok(self.backends.iter().find(|b| b.id() == backend_id).cloned())
    }
}

/// Thumbnailer that records every seed image it receives.
#[derive(Default)]
pub struct RecordingThumbnailer {
    pub existing: bool,
    pub existing_is_default: bool,
    pub created: Mutex<Vec<(i64, String, usize)>>,
}

impl RecordingThumbnailer {
    pub fn created(&self) -> Vec<(i64, String, usize)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl Thumbnailer for RecordingThumbnailer {
    async fn has_thumbnail(&self, _item: &ContentItem) -> bool {
        self.existing
    }

    async fn has_default_thumbnail(&self, _item: &ContentItem) -> bool {
        self.existing_is_default
    }

    async fn create_thumbnails(
        &self,
        item: &ContentItem,
        image: Bytes,
        filename: &str,
    ) -> anyhow::Result<()> {
        self.created
            .lock()
            .unwrap()
            .push((item.id, filename.to_string(), image.len()));
        Ok(())
    }
}

/// Fetcher returning fixed bytes, or failing when `body` is `None`.
pub struct StaticFetcher {
    pub body: Option<Bytes>,
}

impl StaticFetcher {
    pub fn serving(body: &'static [u8]) -> Arc<Self> {
        Arc::new(Self {
            body: Some(Bytes::from_static(body)),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { body: None })
    }
}

#[async_trait]
impl ContentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> BackendResult<Bytes> {
        self.body
            .clone()
            .ok_or_else(|| BackendError::Internal(format!("GET {} returned status 503", url)))
    }
}
