//! Persisted storage backend configuration.
//!
//! Each record owns one typed settings block. The backend kind is the tag
//! of that block, so a record can never disagree with its own settings.
//! Keys unknown at compile time go into the `extra` side table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;

use crate::storage_types::BackendKind;

/// One configured backend instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRecord {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub settings: BackendSettings,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl BackendRecord {
    pub fn new(id: i64, name: impl Into<String>, settings: BackendSettings) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            settings,
            extra: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.settings.kind()
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Typed, per-kind configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSettings {
    Local(LocalSettings),
    Ftp(FtpSettings),
    RemoteUrl(RemoteUrlSettings),
    Youtube(YoutubeSettings),
    Vimeo(VimeoSettings),
    Dailymotion(DailymotionSettings),
}

impl BackendSettings {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSettings::Local(_) => BackendKind::Local,
            BackendSettings::Ftp(_) => BackendKind::Ftp,
            BackendSettings::RemoteUrl(_) => BackendKind::RemoteUrl,
            BackendSettings::Youtube(_) => BackendKind::Youtube,
            BackendSettings::Vimeo(_) => BackendKind::Vimeo,
            BackendSettings::Dailymotion(_) => BackendKind::Dailymotion,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_target_container() -> String {
    "mp4".to_string()
}

fn default_ftp_port() -> u16 {
    21
}

fn default_integrity_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_vimeo_api_base() -> String {
    "https://vimeo.com".to_string()
}

fn default_dailymotion_api_base() -> String {
    "https://api.dailymotion.com".to_string()
}

/// Local filesystem storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSettings {
    /// Directory the uploaded files are copied into
    pub base_dir: PathBuf,
    /// Public URL prefix that serves `base_dir` (e.g. "http://localhost:8080/media")
    pub base_url: String,
    /// Optional RTMP server that streams the same directory
    #[serde(default)]
    pub rtmp_server: Option<String>,
    #[serde(default)]
    pub transcode: Option<TranscodeSettings>,
}

/// ffmpeg transcoding of locally stored video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeSettings {
    pub ffmpeg_path: String,
    #[serde(default = "default_target_container")]
    pub target_container: String,
}

/// FTP upload target with an HTTP mirror used for integrity checks and playback.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FtpSettings {
    pub server: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub upload_dir: Option<String>,
    /// HTTP prefix under which uploaded files become reachable
    pub http_download_uri: String,
    #[serde(default)]
    pub rtmp_server_uri: Option<String>,
    /// Number of download-and-compare attempts after an upload. 0 disables the check.
    #[serde(default = "default_integrity_retries")]
    pub upload_integrity_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Debug for FtpSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("upload_dir", &self.upload_dir)
            .field("http_download_uri", &self.http_download_uri)
            .field("rtmp_server_uri", &self.rtmp_server_uri)
            .field("upload_integrity_retries", &self.upload_integrity_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

/// Generic remote URLs, including RTMP streams on registered servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteUrlSettings {
    /// RTMP server URLs (e.g. "rtmp://stream.example.com/vod")
    #[serde(default)]
    pub streaming_servers: Vec<String>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeSettings {
    pub api_key: String,
    #[serde(default = "default_youtube_api_base")]
    pub api_base_url: String,
}

impl Debug for YoutubeSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("YoutubeSettings")
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VimeoSettings {
    #[serde(default = "default_vimeo_api_base")]
    pub api_base_url: String,
}

impl Default for VimeoSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_vimeo_api_base(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailymotionSettings {
    #[serde(default = "default_dailymotion_api_base")]
    pub api_base_url: String,
}

impl Default for DailymotionSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_dailymotion_api_base(),
        }
    }
}
