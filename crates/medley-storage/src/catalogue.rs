//! Kind catalogue
//!
//! A fixed table built at compile time mapping each [`BackendKind`] to its
//! display name, singleton flag, default ordering hints, configuration schema
//! and constructor. There is no runtime registration.

use medley_core::models::BackendRecord;
use medley_core::{BackendKind, Config};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::embed::{DailymotionBackend, VimeoBackend, YoutubeBackend};
use crate::error::{BackendError, BackendResult};
use crate::fetcher::{build_http_client, ContentFetcher, HttpFetcher};
use crate::ftp::{FtpBackend, FtpTransport};
use crate::local::LocalBackend;
use crate::remote_url::RemoteUrlBackend;
use crate::traits::{MediaBackend, OrderingHints};

/// Shared collaborators handed to every backend constructor.
#[derive(Clone)]
pub struct BackendDeps {
    pub http: Client,
    pub ftp: Arc<dyn FtpTransport>,
    pub fetcher: Arc<dyn ContentFetcher>,
}

impl BackendDeps {
    pub fn new(http: Client, ftp: Arc<dyn FtpTransport>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { http, ftp, fetcher }
    }

    /// Production collaborators: one reqwest client and the default FTP transport.
    pub fn from_config(config: &Config) -> BackendResult<Self> {
        let http = build_http_client(
            Duration::from_secs(config.http_timeout_secs()),
            config.http_user_agent(),
        )?;
        let fetcher = Arc::new(HttpFetcher::new(http.clone()));
        Ok(Self::new(http, crate::ftp::default_transport(), fetcher))
    }
}

/// One configurable setting of a backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingField {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

const fn field(name: &'static str, description: &'static str, required: bool) -> SettingField {
    SettingField {
        name,
        description,
        required,
    }
}

pub type BackendConstructor =
    fn(&BackendRecord, &BackendDeps) -> BackendResult<Arc<dyn MediaBackend>>;

/// Catalogue entry for one backend kind.
pub struct KindInfo {
    pub kind: BackendKind,
    pub display_name: &'static str,
    pub singleton: bool,
    pub before: &'static [BackendKind],
    pub after: &'static [BackendKind],
    pub schema: &'static [SettingField],
    constructor: BackendConstructor,
}

impl KindInfo {
    pub fn hints(&self) -> OrderingHints {
        OrderingHints {
            before: self.before.to_vec(),
            after: self.after.to_vec(),
        }
    }
}

const LOCAL_SCHEMA: &[SettingField] = &[
    field("base_dir", "Directory uploaded files are copied into", true),
    field("base_url", "Public URL prefix serving base_dir", true),
    field("rtmp_server", "RTMP server streaming the same directory", false),
    field("transcode.ffmpeg_path", "ffmpeg binary used to transcode video", false),
    field("transcode.target_container", "Container to transcode into (default mp4)", false),
];

const FTP_SCHEMA: &[SettingField] = &[
    field("server", "FTP host name", true),
    field("port", "FTP port (default 21)", false),
    field("user", "FTP login", true),
    field("password", "FTP password", true),
    field("upload_dir", "Remote directory to upload into", false),
    field("http_download_uri", "HTTP prefix where uploaded files are served", true),
    field("rtmp_server_uri", "RTMP server streaming the uploaded files", false),
    field("upload_integrity_retries", "Download-and-compare attempts, 0 disables (default 3)", false),
    field("retry_delay_ms", "Delay between integrity attempts (default 1000)", false),
];

const REMOTE_URL_SCHEMA: &[SettingField] = &[field(
    "streaming_servers",
    "RTMP servers remote stream URLs may belong to",
    false,
)];

const YOUTUBE_SCHEMA: &[SettingField] = &[
    field("api_key", "YouTube Data API key", true),
    field("api_base_url", "Data API base URL", false),
];

const VIMEO_SCHEMA: &[SettingField] = &[field("api_base_url", "oEmbed base URL", false)];

const DAILYMOTION_SCHEMA: &[SettingField] = &[field("api_base_url", "Dailymotion API base URL", false)];

static KINDS: [KindInfo; 6] = [
    KindInfo {
        kind: BackendKind::Local,
        display_name: "Local storage",
        singleton: true,
        before: &[],
        after: &[],
        schema: LOCAL_SCHEMA,
        constructor: LocalBackend::construct,
    },
    KindInfo {
        kind: BackendKind::Ftp,
        display_name: "FTP server",
        singleton: false,
        before: &[BackendKind::Local],
        after: &[],
        schema: FTP_SCHEMA,
        constructor: FtpBackend::construct,
    },
    KindInfo {
        kind: BackendKind::RemoteUrl,
        display_name: "Remote URL",
        singleton: true,
        before: &[],
        after: &[
            BackendKind::Local,
            BackendKind::Ftp,
            BackendKind::Youtube,
            BackendKind::Vimeo,
            BackendKind::Dailymotion,
        ],
        schema: REMOTE_URL_SCHEMA,
        constructor: RemoteUrlBackend::construct,
    },
    KindInfo {
        kind: BackendKind::Youtube,
        display_name: "YouTube",
        singleton: true,
        before: &[BackendKind::RemoteUrl],
        after: &[],
        schema: YOUTUBE_SCHEMA,
        constructor: YoutubeBackend::construct,
    },
    KindInfo {
        kind: BackendKind::Vimeo,
        display_name: "Vimeo",
        singleton: true,
        before: &[BackendKind::RemoteUrl],
        after: &[],
        schema: VIMEO_SCHEMA,
        constructor: VimeoBackend::construct,
    },
    KindInfo {
        kind: BackendKind::Dailymotion,
        display_name: "Dailymotion",
        singleton: true,
        before: &[BackendKind::RemoteUrl],
        after: &[],
        schema: DAILYMOTION_SCHEMA,
        constructor: DailymotionBackend::construct,
    },
];

fn lookup(kind: BackendKind) -> Option<&'static KindInfo> {
    KINDS.iter().find(|info| info.kind == kind)
}

/// Default ordering hints for a kind
pub fn default_hints(kind: BackendKind) -> OrderingHints {
    lookup(kind).map(KindInfo::hints).unwrap_or_default()
}

pub fn is_singleton(kind: BackendKind) -> bool {
    lookup(kind).is_some_and(|info| info.singleton)
}

/// The table of constructible backend kinds.
#[derive(Clone, Copy)]
pub struct BackendCatalogue {
    entries: &'static [KindInfo],
}

impl Default for BackendCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BackendCatalogue {
    pub fn builtin() -> Self {
        Self { entries: &KINDS }
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static KindInfo> {
        self.entries.iter()
    }

    pub fn get(&self, kind: BackendKind) -> Option<&'static KindInfo> {
        self.entries.iter().find(|info| info.kind == kind)
    }

    pub fn schema(&self, kind: BackendKind) -> Vec<SettingField> {
        self.get(kind)
            .map(|info| info.schema.to_vec())
            .unwrap_or_default()
    }

    /// Instantiate the runtime backend for one configuration record.
    pub fn construct(
        &self,
        record: &BackendRecord,
        deps: &BackendDeps,
    ) -> BackendResult<Arc<dyn MediaBackend>> {
        let info = self.get(record.kind()).ok_or_else(|| {
            BackendError::Config(format!("Unknown backend kind: {}", record.kind()))
        })?;
        (info.constructor)(record, deps)
    }
}

/// Settings block mismatch, reported by constructors.
pub(crate) fn wrong_settings(record: &BackendRecord, expected: BackendKind) -> BackendError {
    BackendError::Config(format!(
        "Backend {} ({}) has {} settings, expected {}",
        record.id,
        record.name,
        record.kind(),
        expected
    ))
}
