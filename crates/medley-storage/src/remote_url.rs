//! Generic remote URL backend
//!
//! Records references to media hosted elsewhere. Nothing is copied; the
//! unique id is the URL itself, or `"{server} {file}"` for RTMP streams on a
//! registered streaming server. Ordered after every more specific backend.

use async_trait::async_trait;
use medley_core::models::{
    guess_media_type, AccessUri, BackendRecord, BackendSettings, MediaKind, RemoteUrlSettings,
    StoredFile, UriProtocol,
};
use medley_core::BackendKind;
use reqwest::Url;
use std::sync::Arc;

use crate::catalogue::{wrong_settings, BackendDeps};
use crate::error::{BackendError, BackendResult};
use crate::traits::{IngestInput, MediaBackend, Probe, ProbeMetadata};

#[derive(Debug, Clone)]
pub struct RemoteUrlBackend {
    id: i64,
    name: String,
    streaming_servers: Vec<String>,
}

impl RemoteUrlBackend {
    pub fn new(id: i64, name: impl Into<String>, settings: &RemoteUrlSettings) -> Self {
        Self {
            id,
            name: name.into(),
            streaming_servers: settings
                .streaming_servers
                .iter()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub(crate) fn construct(
        record: &BackendRecord,
        _deps: &BackendDeps,
    ) -> BackendResult<Arc<dyn MediaBackend>> {
        match &record.settings {
            BackendSettings::RemoteUrl(settings) => {
                Ok(Arc::new(Self::new(record.id, &record.name, settings)))
            }
            _ => Err(wrong_settings(record, BackendKind::RemoteUrl)),
        }
    }

    /// Split an RTMP URL into `(server, file)` using the longest matching
    /// registered server.
    pub fn split_stream_url<'a>(&self, url: &'a str) -> Option<(&str, &'a str)> {
        self.streaming_servers
            .iter()
            .filter_map(|server| {
                url.strip_prefix(server.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .filter(|file| !file.is_empty())
                    .map(|file| (server.as_str(), file))
            })
            .max_by_key(|(server, _)| server.len())
    }

    fn probe_stream(&self, url: &str) -> BackendResult<Probe> {
        let Some((server, file)) = self.split_stream_url(url) else {
            return Err(BackendError::user_facing(format!(
                "The streaming server for {} is not registered. Ask an administrator to add it to the remote URL backend",
                url
            )));
        };

        let (media_kind, container) = match guess_media_type(file) {
            Some((kind, container)) => (kind, Some(container)),
            None => (MediaKind::Video, None),
        };

        let mut metadata = ProbeMetadata::new(media_kind)
            .with_unique_id(format!("{} {}", server, file))
            .with_display_name(display_name(file));
        metadata.container = container;
        Ok(Probe::Accepted(metadata))
    }
}

fn display_name(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}

#[async_trait]
impl MediaBackend for RemoteUrlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteUrl
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, input: &IngestInput) -> BackendResult<Probe> {
        let Some(raw) = input.as_url() else {
            return Ok(Probe::NotApplicable);
        };
        let Ok(url) = Url::parse(raw) else {
            return Ok(Probe::NotApplicable);
        };

        let probe = match url.scheme() {
            "rtmp" | "rtmpt" | "rtmpe" | "rtmps" => self.probe_stream(raw)?,
            "http" | "https" => match guess_media_type(url.path()) {
                Some((media_kind, container)) => Probe::Accepted(
                    ProbeMetadata::new(media_kind)
                        .with_unique_id(raw)
                        .with_container(container)
                        .with_display_name(display_name(url.path())),
                ),
                None => Probe::NotApplicable,
            },
            _ => Probe::NotApplicable,
        };

        if let Probe::Accepted(ref metadata) = probe {
            tracing::debug!(
                backend_id = self.id,
                unique_id = ?metadata.unique_id,
                "Remote URL accepted"
            );
        }
        Ok(probe)
    }

    async fn store(
        &self,
        _file: &StoredFile,
        _input: &IngestInput,
        metadata: &ProbeMetadata,
    ) -> BackendResult<Option<String>> {
        // Nothing to copy; the reference is the unique id from probe
        Ok(metadata.unique_id.clone())
    }

    async fn delete(&self, unique_id: &str) -> bool {
        tracing::debug!(backend_id = self.id, unique_id = %unique_id, "Dropped remote reference");
        true
    }

    fn access_uris(&self, file: &StoredFile) -> Vec<AccessUri> {
        let Some(unique_id) = file.unique_id.as_deref() else {
            return Vec::new();
        };

        match unique_id.split_once(' ') {
            Some((server, path)) => {
                vec![AccessUri::new(file, UriProtocol::Rtmp, path).with_server(server)]
            }
            None => vec![AccessUri::new(file, UriProtocol::Http, unique_id)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn backend() -> RemoteUrlBackend {
        RemoteUrlBackend::new(
            4,
            "Remote",
            &RemoteUrlSettings {
                streaming_servers: vec![
                    "rtmp://stream.example.com/vod/".to_string(),
                    "rtmp://stream.example.com/vod/archive".to_string(),
                ],
            },
        )
    }

    fn stored(unique_id: &str) -> StoredFile {
        StoredFile {
            id: 1,
            backend_id: 4,
            content_item_id: 10,
            media_kind: MediaKind::Video,
            container: None,
            display_name: None,
            size: None,
            bitrate: None,
            width: None,
            height: None,
            unique_id: Some(unique_id.to_string()),
            created_at: Utc::now(),
        }
    }

    async fn accepted(input: &str) -> ProbeMetadata {
        match backend().probe(&IngestInput::url(input)).await.unwrap() {
            Probe::Accepted(meta) => meta,
            Probe::NotApplicable => panic!("{} should be accepted", input),
        }
    }

    #[tokio::test]
    async fn test_http_media_url() {
        let meta = accepted("https://cdn.example.com/talks/keynote.mp3?token=abc").await;
        assert_eq!(meta.media_kind, MediaKind::Audio);
        assert_eq!(meta.container.as_deref(), Some("mp3"));
        assert_eq!(meta.display_name.as_deref(), Some("keynote.mp3"));
        assert_eq!(
            meta.unique_id.as_deref(),
            Some("https://cdn.example.com/talks/keynote.mp3?token=abc")
        );
    }

    #[tokio::test]
    async fn test_unrecognised_inputs_are_not_applicable() {
        let remote = backend();
        for input in ["https://example.com/about", "mailto:someone@example.com", "not a url"] {
            let probe = remote.probe(&IngestInput::url(input)).await.unwrap();
            assert_eq!(probe, Probe::NotApplicable, "{}", input);
        }
        let probe = remote
            .probe(&IngestInput::upload("clip.mp4", &b"x"[..]))
            .await
            .unwrap();
        assert_eq!(probe, Probe::NotApplicable);
    }

    #[tokio::test]
    async fn test_rtmp_uses_longest_registered_server() {
        let meta = accepted("rtmp://stream.example.com/vod/archive/2019/talk.flv").await;
        assert_eq!(
            meta.unique_id.as_deref(),
            Some("rtmp://stream.example.com/vod/archive 2019/talk.flv")
        );
        assert_eq!(meta.container.as_deref(), Some("flv"));

        let meta = accepted("rtmp://stream.example.com/vod/live").await;
        assert_eq!(meta.media_kind, MediaKind::Video);
        assert_eq!(meta.container, None);
    }

    #[tokio::test]
    async fn test_unregistered_rtmp_server_is_user_facing() {
        let err = backend()
            .probe(&IngestInput::url("rtmp://other.example.com/live/show.flv"))
            .await
            .unwrap_err();
        assert!(err.is_user_facing());
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_access_uris() {
        let remote = backend();
        let uris = remote.access_uris(&stored("rtmp://stream.example.com/vod talk.flv"));
        assert_eq!(uris.len(), 1);
        assert_eq!(uris[0].protocol, UriProtocol::Rtmp);
        assert_eq!(uris[0].server_uri.as_deref(), Some("rtmp://stream.example.com/vod"));
        assert_eq!(uris[0].full_uri(), "rtmp://stream.example.com/vod/talk.flv");

        let uris = remote.access_uris(&stored("https://cdn.example.com/clip.mp4"));
        assert_eq!(uris[0].protocol, UriProtocol::Http);
        assert_eq!(uris[0].file_uri, "https://cdn.example.com/clip.mp4");
    }
}
