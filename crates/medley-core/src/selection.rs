//! Access URI selection helpers.
//!
//! Pure functions over a list of access URIs, usually aggregated across all
//! stored files of one content item. Every helper is total: an empty list
//! yields `None` or an empty vector.

use std::path::PathBuf;

use crate::models::{AccessUri, MediaKind, UriProtocol};

/// Protocols in order of preference for a general-purpose link.
const BEST_URI_PREFERENCE: [UriProtocol; 3] =
    [UriProtocol::Www, UriProtocol::Download, UriProtocol::Http];

/// Attribute filter; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UriFilter {
    pub protocol: Option<UriProtocol>,
    pub media_kind: Option<MediaKind>,
    pub container: Option<String>,
}

impl UriFilter {
    pub fn protocol(mut self, protocol: UriProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn media_kind(mut self, media_kind: MediaKind) -> Self {
        self.media_kind = Some(media_kind);
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn matches(&self, uri: &AccessUri) -> bool {
        self.protocol.is_none_or(|p| uri.protocol == p)
            && self.media_kind.is_none_or(|k| uri.media_kind == k)
            && self
                .container
                .as_deref()
                .is_none_or(|c| uri.container.as_deref() == Some(c))
    }
}

/// Keep the URIs satisfying an arbitrary predicate, preserving order.
pub fn filter_uris<F>(uris: &[AccessUri], predicate: F) -> Vec<&AccessUri>
where
    F: Fn(&AccessUri) -> bool,
{
    uris.iter().filter(|uri| predicate(uri)).collect()
}

/// Keep the URIs matching every attribute set on `filter`.
pub fn pick_uris<'a>(uris: &'a [AccessUri], filter: &UriFilter) -> Vec<&'a AccessUri> {
    filter_uris(uris, |uri| filter.matches(uri))
}

/// The single best general-purpose URI: a third-party web page, then an
/// explicit download, then direct HTTP, then whatever comes first.
pub fn pick_best_uri(uris: &[AccessUri]) -> Option<&AccessUri> {
    BEST_URI_PREFERENCE
        .iter()
        .find_map(|protocol| uris.iter().find(|uri| uri.protocol == *protocol))
        .or_else(|| uris.first())
}

/// The largest downloadable candidate. Explicit download URIs win over
/// direct HTTP ones; among equals the earliest entry is kept.
pub fn pick_download_uri(uris: &[AccessUri]) -> Option<&AccessUri> {
    let downloads = filter_uris(uris, |uri| uri.protocol == UriProtocol::Download);
    let candidates = if downloads.is_empty() {
        filter_uris(uris, |uri| uri.protocol == UriProtocol::Http)
    } else {
        downloads
    };

    candidates.into_iter().fold(None, |best, uri| match best {
        Some(current) if current.size.unwrap_or(0) >= uri.size.unwrap_or(0) => Some(current),
        _ => Some(uri),
    })
}

/// Filesystem path of a local-file URI.
pub fn local_file_path(uri: &AccessUri) -> Option<PathBuf> {
    if uri.protocol != UriProtocol::File {
        return None;
    }
    let path = uri.file_uri.strip_prefix("file://").unwrap_or(&uri.file_uri);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// First local filesystem path found in the list.
pub fn pick_local_path(uris: &[AccessUri]) -> Option<PathBuf> {
    uris.iter().find_map(local_file_path)
}
