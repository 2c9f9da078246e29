use async_trait::async_trait;
use medley_core::models::{
    guess_media_type, AccessUri, BackendRecord, BackendSettings, LocalSettings, MediaKind,
    NewStoredFile, StoredFile, TranscodeSettings, UriProtocol,
};
use medley_core::BackendKind;
use medley_db::StoredFileRepository;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::catalogue::{wrong_settings, BackendDeps};
use crate::error::{BackendError, BackendResult};
use crate::keys::stored_file_name;
use crate::traits::{IngestInput, MediaBackend, Probe, ProbeMetadata, Transcode};

/// Local filesystem backend
///
/// Uploads are copied into `base_dir` under a name derived from the stored
/// file's primary key. URLs are never accepted.
#[derive(Clone)]
pub struct LocalBackend {
    id: i64,
    name: String,
    base_dir: PathBuf,
    base_url: String,
    rtmp_server: Option<String>,
    transcode: Option<TranscodeSettings>,
}

impl LocalBackend {
    pub fn new(id: i64, name: impl Into<String>, settings: &LocalSettings) -> Self {
        Self {
            id,
            name: name.into(),
            base_dir: settings.base_dir.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            rtmp_server: settings.rtmp_server.clone(),
            transcode: settings.transcode.clone(),
        }
    }

    pub(crate) fn construct(
        record: &BackendRecord,
        _deps: &BackendDeps,
    ) -> BackendResult<Arc<dyn MediaBackend>> {
        match &record.settings {
            BackendSettings::Local(settings) => {
                if settings.base_url.trim().is_empty() {
                    return Err(BackendError::Config(format!(
                        "Local backend {} has no base_url",
                        record.id
                    )));
                }
                Ok(Arc::new(Self::new(record.id, &record.name, settings)))
            }
            _ => Err(wrong_settings(record, BackendKind::Local)),
        }
    }

    /// Convert a unique id to a filesystem path with traversal checks.
    fn key_to_path(&self, key: &str) -> BackendResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(BackendError::Internal(format!(
                "Storage key contains invalid characters: {}",
                key
            )));
        }

        let path = self.base_dir.join(key);
        if path.parent() != Some(self.base_dir.as_path()) {
            return Err(BackendError::Internal(format!(
                "Storage key resolves outside storage directory: {}",
                key
            )));
        }
        Ok(path)
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> BackendResult<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            BackendError::Config(format!(
                "Failed to create storage directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        if let Err(e) = Self::write_contents(path, data).await {
            if let Err(cleanup) = fs::remove_file(path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        backend_id = self.id,
                        path = %path.display(),
                        error = %cleanup,
                        "Failed to remove partial file"
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn write_contents(path: &Path, data: &[u8]) -> BackendResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            BackendError::Internal(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(data).await.map_err(|e| {
            BackendError::Internal(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            BackendError::Internal(format!("Failed to sync file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(key))
    }

    async fn run_ffmpeg(
        &self,
        settings: &TranscodeSettings,
        input: &Path,
        output: &Path,
    ) -> BackendResult<()> {
        let output_status = Command::new(&settings.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BackendError::Internal(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(BackendError::Internal(format!("FFmpeg failed: {}", stderr)));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, input: &IngestInput) -> BackendResult<Probe> {
        let Some((filename, content)) = input.as_upload() else {
            return Ok(Probe::NotApplicable);
        };
        let Some((media_kind, container)) = guess_media_type(filename) else {
            return Ok(Probe::NotApplicable);
        };

        let mut metadata = ProbeMetadata::new(media_kind).with_container(container);
        metadata.display_name = Some(filename.to_string());
        metadata.size = Some(content.len() as u64);

        tracing::debug!(backend_id = self.id, filename = %filename, "Local backend accepted upload");
        Ok(Probe::Accepted(metadata))
    }

    async fn store(
        &self,
        file: &StoredFile,
        input: &IngestInput,
        _metadata: &ProbeMetadata,
    ) -> BackendResult<Option<String>> {
        let (filename, content) = input.as_upload().ok_or_else(|| {
            BackendError::Internal("Local backend can only store uploads".to_string())
        })?;

        let key = stored_file_name(file.id, filename);
        let path = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        self.write_file(&path, content).await?;

        tracing::info!(
            backend_id = self.id,
            stored_file_id = file.id,
            path = %path.display(),
            size_bytes = content.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(Some(key))
    }

    async fn delete(&self, unique_id: &str) -> bool {
        let path = match self.key_to_path(unique_id) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(backend_id = self.id, unique_id = %unique_id, error = %e, "Refusing to delete");
                return false;
            }
        };

        if !fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(backend_id = self.id, path = %path.display(), "Nothing to delete");
            return false;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(backend_id = self.id, path = %path.display(), "Local storage delete successful");
                true
            }
            Err(e) => {
                tracing::warn!(
                    backend_id = self.id,
                    path = %path.display(),
                    error = %e,
                    "Local storage delete failed"
                );
                false
            }
        }
    }

    async fn transcode(
        &self,
        file: &StoredFile,
        files: &dyn StoredFileRepository,
    ) -> BackendResult<Transcode> {
        let Some(settings) = &self.transcode else {
            return Ok(Transcode::NotApplicable);
        };
        if file.backend_id != self.id || file.media_kind != MediaKind::Video {
            return Ok(Transcode::NotApplicable);
        }
        if file.container.as_deref() == Some(settings.target_container.as_str()) {
            return Ok(Transcode::NotApplicable);
        }
        let Some(source_key) = file.unique_id.as_deref() else {
            return Ok(Transcode::NotApplicable);
        };
        let source = self.key_to_path(source_key)?;

        let derived = files
            .allocate(NewStoredFile {
                backend_id: self.id,
                content_item_id: file.content_item_id,
                media_kind: MediaKind::Video,
                container: Some(settings.target_container.clone()),
                display_name: file.display_name.clone(),
                size: None,
                bitrate: None,
                width: file.width,
                height: file.height,
                unique_id: None,
            })
            .await?;

        let stem = source_key.rsplit_once('.').map_or(source_key, |(s, _)| s);
        let key = stored_file_name(derived.id, &format!("{}.{}", stem, settings.target_container));
        let target = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        if let Err(e) = self.run_ffmpeg(settings, &source, &target).await {
            let _ = fs::remove_file(&target).await;
            files.remove(derived.id).await?;
            return Err(e);
        }

        let size = fs::metadata(&target).await.map(|m| m.len()).ok();
        let derived = StoredFile {
            unique_id: Some(key),
            size,
            ..derived
        };
        files.update(&derived).await?;

        tracing::info!(
            backend_id = self.id,
            source_id = file.id,
            derived_id = derived.id,
            container = %settings.target_container,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local transcode finished"
        );

        Ok(Transcode::Derived(vec![derived]))
    }

    fn access_uris(&self, file: &StoredFile) -> Vec<AccessUri> {
        let Some(key) = file.unique_id.as_deref() else {
            return Vec::new();
        };

        let http = self.url_for(key);
        let mut uris = vec![
            AccessUri::new(file, UriProtocol::Http, http.clone()),
            AccessUri::new(file, UriProtocol::Download, format!("{}?download=1", http)),
            AccessUri::new(
                file,
                UriProtocol::File,
                format!("file://{}", self.base_dir.join(key).display()),
            ),
        ];
        if let Some(server) = &self.rtmp_server {
            uris.push(AccessUri::new(file, UriProtocol::Rtmp, key).with_server(server.clone()));
        }
        uris
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_core::selection::pick_local_path;
    use medley_db::InMemoryStoredFiles;
    use tempfile::tempdir;

    fn backend(dir: &Path) -> LocalBackend {
        LocalBackend::new(
            1,
            "Local",
            &LocalSettings {
                base_dir: dir.to_path_buf(),
                base_url: "http://localhost:8080/media/".to_string(),
                rtmp_server: None,
                transcode: None,
            },
        )
    }

    async fn allocate(files: &InMemoryStoredFiles, metadata: &ProbeMetadata) -> StoredFile {
        files
            .allocate(NewStoredFile {
                backend_id: 1,
                content_item_id: 10,
                media_kind: metadata.media_kind,
                container: metadata.container.clone(),
                display_name: metadata.display_name.clone(),
                size: metadata.size,
                bitrate: None,
                width: None,
                height: None,
                unique_id: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_probe_infers_media_type() {
        let dir = tempdir().unwrap();
        let local = backend(dir.path());

        let probe = local
            .probe(&IngestInput::upload("clip.mp4", &b"data"[..]))
            .await
            .unwrap();
        match probe {
            Probe::Accepted(meta) => {
                assert_eq!(meta.media_kind, MediaKind::Video);
                assert_eq!(meta.container.as_deref(), Some("mp4"));
                assert_eq!(meta.size, Some(4));
            }
            Probe::NotApplicable => panic!("clip.mp4 should be accepted"),
        }

        let probe = local
            .probe(&IngestInput::upload("notes.txt", &b"data"[..]))
            .await
            .unwrap();
        assert_eq!(probe, Probe::NotApplicable);

        let probe = local
            .probe(&IngestInput::url("http://example.com/clip.mp4"))
            .await
            .unwrap();
        assert_eq!(probe, Probe::NotApplicable);
    }

    #[tokio::test]
    async fn test_store_then_delete_round_trip() {
        let dir = tempdir().unwrap();
        let local = backend(dir.path());
        let files = InMemoryStoredFiles::new();
        let input = IngestInput::upload("Summer Clip.mp4", &b"video bytes"[..]);

        let Probe::Accepted(meta) = local.probe(&input).await.unwrap() else {
            panic!("upload should be accepted");
        };
        let file = allocate(&files, &meta).await;
        let key = local.store(&file, &input, &meta).await.unwrap().unwrap();
        assert_eq!(key, format!("{}-summer-clip.mp4", file.id));

        let path = dir.path().join(&key);
        assert_eq!(std::fs::read(&path).unwrap(), b"video bytes");

        assert!(local.delete(&key).await);
        assert!(!path.exists());
        assert!(!local.delete(&key).await);
    }

    // /dev/full accepts the open and fails every write with ENOSPC.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_file() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let dir = tempdir().unwrap();
        let local = backend(dir.path());
        let files = InMemoryStoredFiles::new();
        let input = IngestInput::upload("clip.mp4", &b"video bytes"[..]);

        let Probe::Accepted(meta) = local.probe(&input).await.unwrap() else {
            panic!("upload should be accepted");
        };
        let file = allocate(&files, &meta).await;
        let target = dir.path().join(stored_file_name(file.id, "clip.mp4"));
        std::os::unix::fs::symlink("/dev/full", &target).unwrap();

        let err = local.store(&file, &input, &meta).await.unwrap_err();
        assert!(matches!(err, BackendError::Internal(_)));
        assert!(std::fs::symlink_metadata(&target).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_access_uris() {
        let dir = tempdir().unwrap();
        let mut local = backend(dir.path());
        local.rtmp_server = Some("rtmp://stream.example.com/vod".to_string());
        let files = InMemoryStoredFiles::new();
        let meta = ProbeMetadata::new(MediaKind::Video).with_container("mp4");
        let mut file = allocate(&files, &meta).await;
        file.unique_id = Some("1-clip.mp4".to_string());

        let uris = local.access_uris(&file);
        let protocols: Vec<UriProtocol> = uris.iter().map(|u| u.protocol).collect();
        assert_eq!(
            protocols,
            vec![
                UriProtocol::Http,
                UriProtocol::Download,
                UriProtocol::File,
                UriProtocol::Rtmp
            ]
        );
        assert_eq!(uris[0].file_uri, "http://localhost:8080/media/1-clip.mp4");
        assert_eq!(
            uris[1].file_uri,
            "http://localhost:8080/media/1-clip.mp4?download=1"
        );
        assert_eq!(pick_local_path(&uris), Some(dir.path().join("1-clip.mp4")));
        assert_eq!(
            uris[3].full_uri(),
            "rtmp://stream.example.com/vod/1-clip.mp4"
        );
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let local = backend(dir.path());
        assert!(local.key_to_path("../../../etc/passwd").is_err());
        assert!(local.key_to_path("/etc/passwd").is_err());
        assert!(local.key_to_path("nested/file.mp4").is_err());
        assert!(!local.delete("../etc/passwd").await);
    }

    #[tokio::test]
    async fn test_transcode_not_applicable_without_ffmpeg() {
        let dir = tempdir().unwrap();
        let local = backend(dir.path());
        let files = InMemoryStoredFiles::new();
        let meta = ProbeMetadata::new(MediaKind::Video).with_container("flv");
        let mut file = allocate(&files, &meta).await;
        file.unique_id = Some("1-clip.flv".to_string());

        let outcome = local.transcode(&file, &files).await.unwrap();
        assert_eq!(outcome, Transcode::NotApplicable);
    }

    #[tokio::test]
    async fn test_transcode_skips_target_container() {
        let dir = tempdir().unwrap();
        let mut local = backend(dir.path());
        local.transcode = Some(TranscodeSettings {
            ffmpeg_path: "ffmpeg".to_string(),
            target_container: "mp4".to_string(),
        });
        let files = InMemoryStoredFiles::new();
        let meta = ProbeMetadata::new(MediaKind::Video).with_container("mp4");
        let mut file = allocate(&files, &meta).await;
        file.unique_id = Some("1-clip.mp4".to_string());

        let outcome = local.transcode(&file, &files).await.unwrap();
        assert_eq!(outcome, Transcode::NotApplicable);
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_transcode_removes_allocated_row() {
        let dir = tempdir().unwrap();
        let mut local = backend(dir.path());
        local.transcode = Some(TranscodeSettings {
            ffmpeg_path: dir
                .path()
                .join("no-such-ffmpeg")
                .to_string_lossy()
                .to_string(),
            target_container: "mp4".to_string(),
        });
        let files = InMemoryStoredFiles::new();
        let meta = ProbeMetadata::new(MediaKind::Video).with_container("flv");
        let mut file = allocate(&files, &meta).await;
        file.unique_id = Some("1-clip.flv".to_string());

        assert!(local.transcode(&file, &files).await.is_err());
        assert_eq!(files.len(), 1);
    }
}
