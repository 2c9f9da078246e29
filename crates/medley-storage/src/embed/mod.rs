//! Embed backends
//!
//! Third-party video hosts. Nothing is copied: probe recognises the host's
//! URL shapes, looks the video up through the host's public API, and the
//! remote video id becomes the unique id.

mod dailymotion;
mod vimeo;
mod youtube;

pub use dailymotion::DailymotionBackend;
pub use vimeo::VimeoBackend;
pub use youtube::YoutubeBackend;

use medley_core::models::{AccessUri, StoredFile, UriProtocol};
use regex::Regex;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{BackendError, BackendResult};

pub(crate) fn compile_pattern(pattern: &str) -> BackendResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| BackendError::Config(format!("Invalid embed URL pattern: {}", e)))
}

/// Remote id captured by the pattern's `id` group.
pub(crate) fn match_remote_id(pattern: &Regex, url: &str) -> Option<String> {
    pattern
        .captures(url.trim())
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str().to_string())
}

/// Send a metadata request and decode the JSON body.
///
/// 404/403/401 mean the video does not exist or is not public, which the
/// end user can fix. Everything else is an internal failure.
pub(crate) async fn fetch_metadata<T: DeserializeOwned>(
    request: RequestBuilder,
    host: &str,
    remote_id: &str,
) -> BackendResult<T> {
    let start = std::time::Instant::now();
    let response = request.send().await.map_err(|e| {
        BackendError::Internal(format!("{} API request failed: {}", host, e))
    })?;

    let status = response.status();
    match status {
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            tracing::debug!(host = %host, remote_id = %remote_id, status = %status, "Remote video unavailable");
            return Err(unavailable(host, remote_id));
        }
        s if !s.is_success() => {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Internal(format!(
                "{} API returned {} - {}",
                host, status, error_text
            )));
        }
        _ => {}
    }

    let body = response.json::<T>().await.map_err(|e| {
        BackendError::Internal(format!("Failed to parse {} API response: {}", host, e))
    })?;

    tracing::debug!(
        host = %host,
        remote_id = %remote_id,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Fetched remote video metadata"
    );
    Ok(body)
}

pub(crate) fn unavailable(host: &str, remote_id: &str) -> BackendError {
    BackendError::user_facing(format!(
        "The {} video {} does not exist or is not publicly available",
        host, remote_id
    ))
}

/// Web page plus host-specific embed tag.
pub(crate) fn embed_uris(
    file: &StoredFile,
    page_url: String,
    protocol: UriProtocol,
) -> Vec<AccessUri> {
    let Some(remote_id) = file.unique_id.as_deref() else {
        return Vec::new();
    };
    vec![
        AccessUri::new(file, UriProtocol::Www, page_url),
        AccessUri::new(file, protocol, remote_id),
    ]
}
