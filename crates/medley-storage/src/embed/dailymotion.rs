use async_trait::async_trait;
use medley_core::models::{
    AccessUri, BackendRecord, BackendSettings, DailymotionSettings, MediaKind, StoredFile,
    UriProtocol,
};
use medley_core::BackendKind;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use super::{compile_pattern, embed_uris, fetch_metadata, match_remote_id};
use crate::catalogue::{wrong_settings, BackendDeps};
use crate::error::BackendResult;
use crate::traits::{IngestInput, MediaBackend, Probe, ProbeMetadata, ThumbnailSource};

const HOST: &str = "Dailymotion";

const URL_PATTERN: &str = r"^(?:https?://)?(?:www\.)?(?:dailymotion\.com/(?:embed/)?video/|dai\.ly/)(?P<id>[A-Za-z0-9]+)";

#[derive(Debug, Deserialize)]
struct VideoResponse {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    thumbnail_720_url: Option<String>,
}

/// Dailymotion backend (Graph API)
#[derive(Debug, Clone)]
pub struct DailymotionBackend {
    id: i64,
    name: String,
    api_base_url: String,
    pattern: Regex,
    client: Client,
}

impl DailymotionBackend {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        settings: &DailymotionSettings,
        client: Client,
    ) -> BackendResult<Self> {
        Ok(Self {
            id,
            name: name.into(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            pattern: compile_pattern(URL_PATTERN)?,
            client,
        })
    }

    pub(crate) fn construct(
        record: &BackendRecord,
        deps: &BackendDeps,
    ) -> BackendResult<Arc<dyn MediaBackend>> {
        match &record.settings {
            BackendSettings::Dailymotion(settings) => Ok(Arc::new(Self::new(
                record.id,
                &record.name,
                settings,
                deps.http.clone(),
            )?)),
            _ => Err(wrong_settings(record, BackendKind::Dailymotion)),
        }
    }

    pub fn video_id(&self, url: &str) -> Option<String> {
        match_remote_id(&self.pattern, url)
    }
}

#[async_trait]
impl MediaBackend for DailymotionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dailymotion
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, input: &IngestInput) -> BackendResult<Probe> {
        let Some(video_id) = input.as_url().and_then(|url| self.video_id(url)) else {
            return Ok(Probe::NotApplicable);
        };

        let request = self
            .client
            .get(format!("{}/video/{}", self.api_base_url, video_id))
            .query(&[("fields", "title,description,duration,thumbnail_720_url")]);
        let response: VideoResponse = fetch_metadata(request, HOST, &video_id).await?;

        let mut metadata = ProbeMetadata::new(MediaKind::Video)
            .with_unique_id(video_id.clone())
            .with_display_name(response.title);
        metadata.duration = response.duration;
        metadata.description = response.description.filter(|d| !d.trim().is_empty());
        metadata.thumbnail = response.thumbnail_720_url.map(ThumbnailSource::Url);

        tracing::info!(backend_id = self.id, video_id = %video_id, "Dailymotion video accepted");
        Ok(Probe::Accepted(metadata))
    }

    async fn store(
        &self,
        _file: &StoredFile,
        _input: &IngestInput,
        _metadata: &ProbeMetadata,
    ) -> BackendResult<Option<String>> {
        Ok(None)
    }

    async fn delete(&self, _unique_id: &str) -> bool {
        true
    }

    fn access_uris(&self, file: &StoredFile) -> Vec<AccessUri> {
        let page = file
            .unique_id
            .as_deref()
            .map(|id| format!("https://www.dailymotion.com/video/{}", id))
            .unwrap_or_default();
        embed_uris(file, page, UriProtocol::Dailymotion)
    }
}
