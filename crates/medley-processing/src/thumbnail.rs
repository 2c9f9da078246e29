//! Thumbnail collaborator
//!
//! Thumbnail rendering and storage live outside this workspace. Ingestion
//! only seeds a content item's thumbnail from the image a backend reported.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use medley_core::models::ContentItem;

#[async_trait]
pub trait Thumbnailer: Send + Sync {
    async fn has_thumbnail(&self, item: &ContentItem) -> bool;

    /// True when the item only has the placeholder thumbnail
    async fn has_default_thumbnail(&self, item: &ContentItem) -> bool;

    async fn create_thumbnails(&self, item: &ContentItem, image: Bytes, filename: &str)
        -> Result<()>;
}

/// Thumbnailer for deployments without thumbnail support. Every item
/// reports no thumbnail and seeding is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpThumbnailer;

#[async_trait]
impl Thumbnailer for NoOpThumbnailer {
    async fn has_thumbnail(&self, _item: &ContentItem) -> bool {
        false
    }

    async fn has_default_thumbnail(&self, _item: &ContentItem) -> bool {
        false
    }

    async fn create_thumbnails(
        &self,
        item: &ContentItem,
        image: Bytes,
        filename: &str,
    ) -> Result<()> {
        tracing::debug!(
            content_item_id = item.id,
            filename = %filename,
            size_bytes = image.len(),
            "Thumbnail support disabled, discarding seed image"
        );
        Ok(())
    }
}

/// File name handed to the thumbnailer for a seed image fetched from `url`.
pub(crate) fn seed_filename(url: Option<&str>) -> String {
    url.and_then(|u| u.split(['?', '#']).next())
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| name.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| "thumbnail.jpg".to_string())
}
