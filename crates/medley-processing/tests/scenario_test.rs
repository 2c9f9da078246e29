//! End-to-end ingestion through configured backends: local disk, YouTube
//! (against a mock API) and remote URLs.

mod helpers;

use helpers::RecordingThumbnailer;
use medley_core::models::{
    BackendRecord, BackendSettings, ContentItem, LocalSettings, MediaKind, RemoteUrlSettings,
    UriProtocol, YoutubeSettings,
};
use medley_core::selection::{pick_best_uri, pick_local_path};
use medley_core::{AppError, Config, MedleyConfig};
use medley_db::{InMemoryBackendConfigs, InMemoryStoredFiles};
use medley_processing::IngestPipeline;
use medley_storage::{BackendCatalogue, BackendDeps, ConfiguredBackends, IngestInput, Probe};
use mockito::Matcher;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

struct Harness {
    pipeline: IngestPipeline,
    thumbnailer: Arc<RecordingThumbnailer>,
    files: InMemoryStoredFiles,
}

fn harness(media_dir: &Path, api_base_url: &str) -> Harness {
    let config = Config(Box::new(MedleyConfig::from_lookup(|_| None).unwrap()));
    let deps = BackendDeps::from_config(&config).unwrap();

    let configs = InMemoryBackendConfigs::with_records([
        BackendRecord::new(
            1,
            "Local media",
            BackendSettings::Local(LocalSettings {
                base_dir: media_dir.to_path_buf(),
                base_url: "http://localhost:8080/media".to_string(),
                rtmp_server: None,
                transcode: None,
            }),
        ),
        BackendRecord::new(
            2,
            "Remote",
            BackendSettings::RemoteUrl(RemoteUrlSettings::default()),
        ),
        BackendRecord::new(
            3,
            "YouTube",
            BackendSettings::Youtube(YoutubeSettings {
                api_key: "test-key".to_string(),
                api_base_url: api_base_url.to_string(),
            }),
        ),
    ]);

    let fetcher = deps.fetcher.clone();
    let backends = ConfiguredBackends::new(Arc::new(configs), BackendCatalogue::builtin(), deps);
    let files = InMemoryStoredFiles::new();
    let thumbnailer = Arc::new(RecordingThumbnailer::default());

    Harness {
        pipeline: IngestPipeline::new(
            Arc::new(backends),
            Arc::new(files.clone()),
            thumbnailer.clone(),
            fetcher,
        ),
        thumbnailer,
        files,
    }
}

#[tokio::test]
async fn test_local_upload_round_trip() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), "http://127.0.0.1:1");

    let (backend, metadata) = h
        .pipeline
        .probe(&IngestInput::upload("clip.mp4", &b"fake video"[..]))
        .await
        .unwrap();
    assert_eq!(backend.id(), 1);
    assert_eq!(metadata.media_kind, MediaKind::Video);
    assert_eq!(metadata.container.as_deref(), Some("mp4"));

    let mut item = ContentItem::new(42);
    let outcome = h
        .pipeline
        .ingest(&mut item, IngestInput::upload("clip.mp4", &b"fake video"[..]))
        .await
        .unwrap();
    assert_eq!(outcome.file.media_kind, MediaKind::Video);
    assert_eq!(item.title.as_deref(), Some("clip.mp4"));

    let uris = h.pipeline.item_access_uris(&item).await.unwrap();
    assert_eq!(pick_best_uri(&uris).unwrap().protocol, UriProtocol::Download);
    let path = pick_local_path(&uris).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"fake video");

    assert!(h.pipeline.delete_file(outcome.file.id).await.unwrap());
    assert!(!path.exists());
    assert!(h.files.is_empty());
}

#[tokio::test]
async fn test_youtube_url_uses_remote_metadata() {
    let dir = tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let thumbnail_url = format!("{}/vi/dQw4w9WgXcQ/hqdefault.jpg", server.url());

    let api = server
        .mock("GET", "/videos")
        .match_query(Matcher::UrlEncoded("id".into(), "dQw4w9WgXcQ".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"items": [{{
                "snippet": {{
                    "title": "Never Gonna Give You Up",
                    "description": "Official video",
                    "thumbnails": {{"high": {{"url": "{}"}}}}
                }},
                "contentDetails": {{"duration": "PT3M33S"}},
                "status": {{"privacyStatus": "public", "embeddable": true}}
            }}]}}"#,
            thumbnail_url
        ))
        .create_async()
        .await;
    let image = server
        .mock("GET", "/vi/dQw4w9WgXcQ/hqdefault.jpg")
        .with_status(200)
        .with_body("jpeg")
        .create_async()
        .await;

    let h = harness(dir.path(), &server.url());
    let mut item = ContentItem::new(7);
    let outcome = h
        .pipeline
        .ingest(
            &mut item,
            IngestInput::url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.file.backend_id, 3);
    assert_eq!(outcome.file.unique_id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(item.title.as_deref(), Some("Never Gonna Give You Up"));
    assert_eq!(item.duration, Some(213));
    assert_eq!(
        h.thumbnailer.created(),
        vec![(7, "hqdefault.jpg".to_string(), 4)]
    );

    let uris = h.pipeline.access_uris(&outcome.file).await.unwrap();
    let best = pick_best_uri(&uris).unwrap();
    assert_eq!(best.protocol, UriProtocol::Www);
    assert_eq!(best.file_uri, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");

    api.assert_async().await;
    image.assert_async().await;
}

#[tokio::test]
async fn test_media_url_falls_through_to_remote_backend() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), "http://127.0.0.1:1");

    let (backend, metadata) = h
        .pipeline
        .probe(&IngestInput::url("https://cdn.example.com/talks/keynote.mp3"))
        .await
        .unwrap();
    assert_eq!(backend.id(), 2);
    assert_eq!(metadata.media_kind, MediaKind::Audio);
}

#[tokio::test]
async fn test_unrecognised_input_is_unusable() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), "http://127.0.0.1:1");

    for input in [
        IngestInput::url("not a url at all"),
        IngestInput::url("ftp://files.example.com/readme.txt"),
        IngestInput::upload("notes.docx", &b"doc"[..]),
    ] {
        let err = h
            .pipeline
            .ingest(&mut ContentItem::new(1), input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnusableInput));
    }
    assert!(h.files.is_empty());
}

#[tokio::test]
async fn test_disabled_backend_is_not_probed() {
    let dir = tempdir().unwrap();
    let configs = InMemoryBackendConfigs::with_records([BackendRecord::new(
        1,
        "Local media",
        BackendSettings::Local(LocalSettings {
            base_dir: dir.path().to_path_buf(),
            base_url: "http://localhost/media".to_string(),
            rtmp_server: None,
            transcode: None,
        }),
    )
    .disabled()]);
    let config = Config(Box::new(MedleyConfig::from_lookup(|_| None).unwrap()));
    let deps = BackendDeps::from_config(&config).unwrap();
    let backends = ConfiguredBackends::new(Arc::new(configs), BackendCatalogue::builtin(), deps);

    let registry = medley_storage::BackendSource::registry(&backends).await.unwrap();
    assert!(registry.is_empty());

    let local = medley_storage::BackendSource::instance(&backends, 1)
        .await
        .unwrap()
        .unwrap();
    let probe = local
        .probe(&IngestInput::upload("clip.mp4", &b"x"[..]))
        .await
        .unwrap();
    assert!(matches!(probe, Probe::Accepted(_)));
}
