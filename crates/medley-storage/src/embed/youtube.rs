use async_trait::async_trait;
use medley_core::models::{
    AccessUri, BackendRecord, BackendSettings, MediaKind, StoredFile, UriProtocol,
    YoutubeSettings,
};
use medley_core::BackendKind;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use super::{compile_pattern, embed_uris, fetch_metadata, match_remote_id, unavailable};
use crate::catalogue::{wrong_settings, BackendDeps};
use crate::error::{BackendError, BackendResult};
use crate::traits::{IngestInput, MediaBackend, Probe, ProbeMetadata, ThumbnailSource};

const HOST: &str = "YouTube";

const URL_PATTERN: &str = r"^(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|v/|live/)|youtu\.be/|youtube-nocookie\.com/embed/)(?P<id>[A-Za-z0-9_-]{11})";

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    content_details: Option<ContentDetails>,
    status: Option<VideoStatus>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    standard: Option<Thumbnail>,
    maxres: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        [self.maxres, self.standard, self.high, self.medium, self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url)
            .next()
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    privacy_status: Option<String>,
    embeddable: Option<bool>,
}

/// Parse an ISO 8601 duration such as `PT1H2M3S` into seconds.
pub(crate) fn parse_iso8601_duration(value: &str) -> Option<u32> {
    let rest = value.strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut total: u64 = 0;
    let mut parse_part = |part: &str, units: &[(char, u64)]| -> Option<()> {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            let (_, scale) = units.iter().find(|(unit, _)| *unit == c)?;
            let n: u64 = number.parse().ok()?;
            total = total.checked_add(n.checked_mul(*scale)?)?;
            number.clear();
        }
        number.is_empty().then_some(())
    };

    parse_part(date, &[('W', 604_800), ('D', 86_400)])?;
    parse_part(time, &[('H', 3_600), ('M', 60), ('S', 1)])?;
    u32::try_from(total).ok()
}

/// YouTube backend (Data API v3)
#[derive(Debug, Clone)]
pub struct YoutubeBackend {
    id: i64,
    name: String,
    api_key: String,
    api_base_url: String,
    pattern: Regex,
    client: Client,
}

impl YoutubeBackend {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        settings: &YoutubeSettings,
        client: Client,
    ) -> BackendResult<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(BackendError::Config(
                "YouTube backend requires an API key".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: name.into(),
            api_key: settings.api_key.clone(),
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
            BackendSettings::Youtube(settings) => Ok(Arc::new(Self::new(
                record.id,
                &record.name,
                settings,
                deps.http.clone(),
            )?)),
            _ => Err(wrong_settings(record, BackendKind::Youtube)),
        }
    }

    pub fn video_id(&self, url: &str) -> Option<String> {
        match_remote_id(&self.pattern, url)
    }
}

#[async_trait]
impl MediaBackend for YoutubeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Youtube
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
            .get(format!("{}/videos", self.api_base_url))
            .query(&[
                ("id", video_id.as_str()),
                ("part", "snippet,contentDetails,status"),
                ("key", self.api_key.as_str()),
            ]);
        let response: VideoListResponse = fetch_metadata(request, HOST, &video_id).await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| unavailable(HOST, &video_id))?;

        if let Some(status) = &item.status {
            if status.privacy_status.as_deref() == Some("private") {
                return Err(unavailable(HOST, &video_id));
            }
            if status.embeddable == Some(false) {
                return Err(BackendError::user_facing(format!(
                    "The owner of YouTube video {} does not allow embedding",
                    video_id
                )));
            }
        }

        let duration = item
            .content_details
            .and_then(|d| d.duration)
            .and_then(|d| parse_iso8601_duration(&d));

        let mut metadata = ProbeMetadata::new(MediaKind::Video)
            .with_unique_id(video_id.clone())
            .with_display_name(item.snippet.title);
        metadata.duration = duration;
        metadata.description = Some(item.snippet.description).filter(|d| !d.trim().is_empty());
        metadata.thumbnail = item.snippet.thumbnails.best().map(ThumbnailSource::Url);

        tracing::info!(backend_id = self.id, video_id = %video_id, "YouTube video accepted");
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
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            .unwrap_or_default();
        embed_uris(file, page, UriProtocol::Youtube)
    }
}
