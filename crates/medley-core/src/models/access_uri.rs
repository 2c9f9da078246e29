//! Access URI model: one protocol-tagged way to reach a stored file.
//!
//! Access URIs are never persisted. They are recomputed from the stored file
//! and its backend whenever a caller asks.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::media::MediaKind;
use super::stored_file::StoredFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UriProtocol {
    /// Direct HTTP(S) link to the bytes
    Http,
    /// Same bytes, served as an attachment
    Download,
    /// Streaming locator relative to `server_uri`
    Rtmp,
    /// Path on the local filesystem
    File,
    /// Third-party web page for the media
    Www,
    Youtube,
    Vimeo,
    Dailymotion,
}

impl UriProtocol {
    pub fn is_embed_tag(&self) -> bool {
        matches!(
            self,
            UriProtocol::Youtube | UriProtocol::Vimeo | UriProtocol::Dailymotion
        )
    }
}

impl Display for UriProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            UriProtocol::Http => "http",
            UriProtocol::Download => "download",
            UriProtocol::Rtmp => "rtmp",
            UriProtocol::File => "file",
            UriProtocol::Www => "www",
            UriProtocol::Youtube => "youtube",
            UriProtocol::Vimeo => "vimeo",
            UriProtocol::Dailymotion => "dailymotion",
        };
        write!(f, "{}", s)
    }
}

/// A derived locator for a stored file, with the file attributes selection
/// helpers filter on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessUri {
    pub protocol: UriProtocol,
    /// File-specific locator
    pub file_uri: String,
    /// Streaming server the locator is relative to, if any
    pub server_uri: Option<String>,
    pub stored_file_id: i64,
    pub media_kind: MediaKind,
    pub container: Option<String>,
    pub size: Option<u64>,
}

impl AccessUri {
    pub fn new(file: &StoredFile, protocol: UriProtocol, file_uri: impl Into<String>) -> Self {
        Self {
            protocol,
            file_uri: file_uri.into(),
            server_uri: None,
            stored_file_id: file.id,
            media_kind: file.media_kind,
            container: file.container.clone(),
            size: file.size,
        }
    }

    pub fn with_server(mut self, server_uri: impl Into<String>) -> Self {
        self.server_uri = Some(server_uri.into());
        self
    }

    /// The locator joined with its server, when it has one.
    pub fn full_uri(&self) -> String {
        match &self.server_uri {
            Some(server) => format!(
                "{}/{}",
                server.trim_end_matches('/'),
                self.file_uri.trim_start_matches('/')
            ),
            None => self.file_uri.clone(),
        }
    }
}

impl Display for AccessUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.full_uri())
    }
}
