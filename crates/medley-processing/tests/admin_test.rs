use medley_core::models::{
    BackendRecord, BackendSettings, ContentItem, LocalSettings, MediaKind, NewStoredFile,
    RemoteUrlSettings, VimeoSettings, YoutubeSettings,
};
use medley_core::{AppError, BackendKind, Config, MedleyConfig};
use medley_db::{
    BackendConfigRepository, InMemoryBackendConfigs, InMemoryStoredFiles, StoredFileRepository,
};
use medley_processing::{BackendAdmin, IngestPipeline, NoOpThumbnailer};
use medley_storage::{BackendCatalogue, BackendDeps, ConfiguredBackends, IngestInput};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn local(id: i64, dir: &Path) -> BackendRecord {
    BackendRecord::new(
        id,
        format!("Local {}", id),
        BackendSettings::Local(LocalSettings {
            base_dir: dir.to_path_buf(),
            base_url: "http://localhost/media".to_string(),
            rtmp_server: None,
            transcode: None,
        }),
    )
}

struct Setup {
    admin: BackendAdmin,
    pipeline: IngestPipeline,
    configs: InMemoryBackendConfigs,
    files: InMemoryStoredFiles,
}

fn setup(records: Vec<BackendRecord>) -> Setup {
    let config = Config(Box::new(MedleyConfig::from_lookup(|_| None).unwrap()));
    let deps = BackendDeps::from_config(&config).unwrap();
    let fetcher = deps.fetcher.clone();
    let configs = InMemoryBackendConfigs::with_records(records);
    let files = InMemoryStoredFiles::new();
    let backends = Arc::new(ConfiguredBackends::new(
        Arc::new(configs.clone()),
        BackendCatalogue::builtin(),
        deps,
    ));

    Setup {
        admin: BackendAdmin::new(backends.clone(), Arc::new(files.clone())),
        pipeline: IngestPipeline::new(
            backends,
            Arc::new(files.clone()),
            Arc::new(NoOpThumbnailer),
            fetcher,
        ),
        configs,
        files,
    }
}

#[test]
fn test_kinds_and_schema() {
    let s = setup(Vec::new());

    let kinds = s.admin.kinds();
    assert_eq!(kinds.len(), BackendKind::ALL.len());
    let ftp = kinds.iter().find(|k| k.kind == BackendKind::Ftp).unwrap();
    assert!(!ftp.singleton);
    assert!(ftp.before.contains(&BackendKind::Local));

    let schema = s.admin.schema(BackendKind::Youtube);
    assert!(schema.iter().any(|f| f.name == "api_key" && f.required));
}

#[tokio::test]
async fn test_set_enabled_toggles_probing() {
    let dir = tempdir().unwrap();
    let s = setup(vec![local(1, dir.path())]);

    s.admin.set_enabled(1, false).await.unwrap();
    let err = s
        .pipeline
        .ingest(&mut ContentItem::new(1), IngestInput::upload("clip.mp4", &b"x"[..]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnusableInput));

    s.admin.set_enabled(1, true).await.unwrap();
    s.pipeline
        .ingest(&mut ContentItem::new(1), IngestInput::upload("clip.mp4", &b"x"[..]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_second_singleton_cannot_be_enabled() {
    let dir = tempdir().unwrap();
    let s = setup(vec![local(1, dir.path()), local(2, dir.path()).disabled()]);

    let err = s.admin.set_enabled(2, true).await.unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
    assert!(!s.configs.get(2).await.unwrap().unwrap().enabled);

    // Allowed once the first one is disabled
    s.admin.set_enabled(1, false).await.unwrap();
    s.admin.set_enabled(2, true).await.unwrap();
}

#[tokio::test]
async fn test_unknown_backend_is_not_found() {
    let s = setup(vec![BackendRecord::new(
        5,
        "Vimeo",
        BackendSettings::Vimeo(VimeoSettings::default()),
    )]);

    assert!(matches!(
        s.admin.set_enabled(99, true).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        s.admin.delete_backend(99).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_delete_backend_removes_owned_files() {
    let dir = tempdir().unwrap();
    let s = setup(vec![
        local(1, dir.path()),
        BackendRecord::new(2, "Remote", BackendSettings::RemoteUrl(RemoteUrlSettings::default())),
    ]);

    let mut item = ContentItem::new(1);
    for name in ["a.mp4", "b.mp3"] {
        s.pipeline
            .ingest(&mut item, IngestInput::upload(name, &b"bytes"[..]))
            .await
            .unwrap();
    }
    s.pipeline
        .ingest(&mut item, IngestInput::url("https://cdn.example.com/c.mp4"))
        .await
        .unwrap();
    assert_eq!(s.files.len(), 3);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

    let report = s.admin.delete_backend(1).await.unwrap();
    assert_eq!(report.files_removed, 2);
    assert_eq!(report.artifact_failures, 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(s.files.len(), 1);
    assert!(s.configs.get(1).await.unwrap().is_none());
    assert_eq!(s.admin.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_backend_counts_missing_artifacts() {
    let dir = tempdir().unwrap();
    let s = setup(vec![local(1, dir.path())]);

    s.pipeline
        .ingest(&mut ContentItem::new(1), IngestInput::upload("a.mp4", &b"bytes"[..]))
        .await
        .unwrap();
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let report = s.admin.delete_backend(1).await.unwrap();
    assert_eq!(report.files_removed, 1);
    assert_eq!(report.artifact_failures, 1);
    assert!(s.files.is_empty());
}

#[tokio::test]
async fn test_delete_backend_that_no_longer_constructs() {
    // a blank API key makes the YouTube record unbuildable
    let s = setup(vec![BackendRecord::new(
        4,
        "YouTube",
        BackendSettings::Youtube(YoutubeSettings {
            api_key: String::new(),
            api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
        }),
    )]);

    for video_id in ["dQw4w9WgXcQ", "9bZkp7q19f0"] {
        s.files
            .allocate(NewStoredFile {
                backend_id: 4,
                content_item_id: 1,
                media_kind: MediaKind::Video,
                container: None,
                display_name: None,
                size: None,
                bitrate: None,
                width: None,
                height: None,
                unique_id: Some(video_id.to_string()),
            })
            .await
            .unwrap();
    }

    let report = s.admin.delete_backend(4).await.unwrap();
    assert_eq!(report.files_removed, 2);
    assert_eq!(report.artifact_failures, 2);
    assert!(s.files.is_empty());
    assert!(s.configs.get(4).await.unwrap().is_none());
}
