use async_trait::async_trait;
use bytes::Bytes;
use medley_core::models::{
    guess_media_type, AccessUri, BackendRecord, BackendSettings, FtpSettings, StoredFile,
    UriProtocol,
};
use medley_core::BackendKind;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::catalogue::{wrong_settings, BackendDeps};
use crate::error::{BackendError, BackendResult};
use crate::fetcher::ContentFetcher;
use crate::keys::stored_file_name;
use crate::traits::{IngestInput, MediaBackend, Probe, ProbeMetadata};

/// File transfer to an FTP server. One fresh connection per call.
#[async_trait]
pub trait FtpTransport: Send + Sync {
    async fn upload(&self, settings: &FtpSettings, name: &str, content: Bytes)
        -> BackendResult<()>;

    async fn remove(&self, settings: &FtpSettings, name: &str) -> BackendResult<()>;
}

#[cfg(feature = "storage-ftp")]
pub use suppa::SuppaFtpTransport;

#[cfg(feature = "storage-ftp")]
mod suppa {
    use super::*;
    use std::io::Cursor;
    use suppaftp::types::FileType;
    use suppaftp::{FtpError, FtpStream};

    fn ftp_err(e: FtpError) -> BackendError {
        BackendError::Ftp(e.to_string())
    }

    fn connect(settings: &FtpSettings) -> BackendResult<FtpStream> {
        let mut stream =
            FtpStream::connect((settings.server.as_str(), settings.port)).map_err(ftp_err)?;
        stream
            .login(settings.user.as_str(), settings.password.as_str())
            .map_err(ftp_err)?;
        stream.transfer_type(FileType::Binary).map_err(ftp_err)?;
        if let Some(dir) = settings.upload_dir.as_deref().filter(|d| !d.is_empty()) {
            stream.cwd(dir).map_err(ftp_err)?;
        }
        Ok(stream)
    }

    /// Blocking suppaftp client run on the blocking thread pool.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SuppaFtpTransport;

    #[async_trait]
    impl FtpTransport for SuppaFtpTransport {
        async fn upload(
            &self,
            settings: &FtpSettings,
            name: &str,
            content: Bytes,
        ) -> BackendResult<()> {
            let settings = settings.clone();
            let name = name.to_string();
            tokio::task::spawn_blocking(move || -> BackendResult<()> {
                let mut stream = connect(&settings)?;
                let mut reader = Cursor::new(content);
                if let Err(e) = stream.put_file(&name, &mut reader) {
                    // the server may keep a truncated file
                    let _ = stream.rm(&name);
                    let _ = stream.quit();
                    return Err(ftp_err(e));
                }
                let _ = stream.quit();
                Ok(())
            })
            .await
            .map_err(|e| BackendError::Internal(format!("FTP upload task failed: {}", e)))?
        }

        async fn remove(&self, settings: &FtpSettings, name: &str) -> BackendResult<()> {
            let settings = settings.clone();
            let name = name.to_string();
            tokio::task::spawn_blocking(move || -> BackendResult<()> {
                let mut stream = connect(&settings)?;
                stream.rm(&name).map_err(ftp_err)?;
                let _ = stream.quit();
                Ok(())
            })
            .await
            .map_err(|e| BackendError::Internal(format!("FTP delete task failed: {}", e)))?
        }
    }
}

/// Transport used when the crate is built without FTP support.
#[cfg(not(feature = "storage-ftp"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFtpTransport;

#[cfg(not(feature = "storage-ftp"))]
#[async_trait]
impl FtpTransport for UnavailableFtpTransport {
    async fn upload(&self, _: &FtpSettings, _: &str, _: Bytes) -> BackendResult<()> {
        Err(BackendError::Config(
            "FTP backend not available (storage-ftp feature not enabled)".to_string(),
        ))
    }

    async fn remove(&self, _: &FtpSettings, _: &str) -> BackendResult<()> {
        Err(BackendError::Config(
            "FTP backend not available (storage-ftp feature not enabled)".to_string(),
        ))
    }
}

pub(crate) fn default_transport() -> Arc<dyn FtpTransport> {
    #[cfg(feature = "storage-ftp")]
    {
        Arc::new(SuppaFtpTransport)
    }
    #[cfg(not(feature = "storage-ftp"))]
    {
        Arc::new(UnavailableFtpTransport)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// FTP backend
///
/// Uploads go to the FTP server; playback and integrity checks go through
/// the HTTP mirror at `http_download_uri`.
#[derive(Clone)]
pub struct FtpBackend {
    id: i64,
    name: String,
    settings: FtpSettings,
    transport: Arc<dyn FtpTransport>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl FtpBackend {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        settings: FtpSettings,
        transport: Arc<dyn FtpTransport>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            settings,
            transport,
            fetcher,
        }
    }

    pub(crate) fn construct(
        record: &BackendRecord,
        deps: &BackendDeps,
    ) -> BackendResult<Arc<dyn MediaBackend>> {
        match &record.settings {
            BackendSettings::Ftp(settings) => {
                if settings.server.trim().is_empty() {
                    return Err(BackendError::Config(format!(
                        "FTP backend {} has no server",
                        record.id
                    )));
                }
                Ok(Arc::new(Self::new(
                    record.id,
                    &record.name,
                    settings.clone(),
                    deps.ftp.clone(),
                    deps.fetcher.clone(),
                )))
            }
            _ => Err(wrong_settings(record, BackendKind::Ftp)),
        }
    }

    fn download_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.settings.http_download_uri.trim_end_matches('/'),
            urlencoding::encode(name)
        )
    }

    /// Best-effort removal of an upload that will not be recorded.
    async fn remove_quietly(&self, name: &str) {
        if let Err(e) = self.transport.remove(&self.settings, name).await {
            tracing::warn!(
                backend_id = self.id,
                file = %name,
                error = %e,
                "Failed to remove unusable FTP upload"
            );
        }
    }

    /// Download the uploaded file over HTTP and compare it with the original.
    ///
    /// Runs up to `upload_integrity_retries` attempts with `retry_delay_ms`
    /// between them. Zero attempts disables the check. When every attempt
    /// fails the upload is removed and a user-facing error is returned.
    pub async fn verify_upload(&self, name: &str, original: &[u8]) -> BackendResult<()> {
        let max_retries = self.settings.upload_integrity_retries;
        if max_retries == 0 {
            return Ok(());
        }

        let expected = sha256_hex(original);
        let url = self.download_url(name);
        let delay = Duration::from_millis(self.settings.retry_delay_ms);

        for attempt in 1..=max_retries {
            match self.fetcher.fetch(&url).await {
                Ok(body) if sha256_hex(&body) == expected => {
                    tracing::info!(
                        backend_id = self.id,
                        file = %name,
                        attempt,
                        max_retries,
                        "FTP upload integrity verified"
                    );
                    return Ok(());
                }
                Ok(body) => {
                    tracing::warn!(
                        backend_id = self.id,
                        file = %name,
                        attempt,
                        max_retries,
                        expected_size = original.len(),
                        actual_size = body.len(),
                        "FTP upload hash mismatch"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        backend_id = self.id,
                        file = %name,
                        attempt,
                        max_retries,
                        error = %e,
                        "FTP upload could not be downloaded for verification"
                    );
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(delay).await;
            }
        }

        self.remove_quietly(name).await;

        Err(BackendError::user_facing(format!(
            "The uploaded file could not be verified after {} attempts, please try again",
            max_retries
        )))
    }
}

#[async_trait]
impl MediaBackend for FtpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ftp
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
        Ok(Probe::Accepted(metadata))
    }

    async fn store(
        &self,
        file: &StoredFile,
        input: &IngestInput,
        _metadata: &ProbeMetadata,
    ) -> BackendResult<Option<String>> {
        let (filename, content) = input.as_upload().ok_or_else(|| {
            BackendError::Internal("FTP backend can only store uploads".to_string())
        })?;

        let name = stored_file_name(file.id, filename);
        let start = std::time::Instant::now();

        if let Err(e) = self
            .transport
            .upload(&self.settings, &name, content.clone())
            .await
        {
            self.remove_quietly(&name).await;
            return Err(e);
        }
        tracing::info!(
            backend_id = self.id,
            stored_file_id = file.id,
            server = %self.settings.server,
            file = %name,
            size_bytes = content.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "FTP upload successful"
        );

        self.verify_upload(&name, content).await?;
        Ok(Some(name))
    }

    async fn delete(&self, unique_id: &str) -> bool {
        match self.transport.remove(&self.settings, unique_id).await {
            Ok(()) => {
                tracing::info!(backend_id = self.id, file = %unique_id, "FTP delete successful");
                true
            }
            Err(e) => {
                tracing::warn!(
                    backend_id = self.id,
                    file = %unique_id,
                    error = %e,
                    "FTP delete failed"
                );
                false
            }
        }
    }

    fn access_uris(&self, file: &StoredFile) -> Vec<AccessUri> {
        let Some(name) = file.unique_id.as_deref() else {
            return Vec::new();
        };

        let mut uris = vec![AccessUri::new(file, UriProtocol::Http, self.download_url(name))];
        if let Some(server) = &self.settings.rtmp_server_uri {
            uris.push(AccessUri::new(file, UriProtocol::Rtmp, name).with_server(server.clone()));
        }
        uris
    }
}
