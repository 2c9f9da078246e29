//! Stored file model: one physical or remote artifact owned by one backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::MediaKind;

/// The durable record of one artifact.
///
/// `unique_id` is meaningful only to the owning backend (a relative path, a
/// remote video id, a composite server + path token). A record whose
/// `unique_id` is still `None` after ingestion is invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub backend_id: i64,
    pub content_item_id: i64,
    pub media_kind: MediaKind,
    pub container: Option<String>,
    pub display_name: Option<String>,
    pub size: Option<u64>,
    pub bitrate: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub unique_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to allocate a new stored file row. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStoredFile {
    pub backend_id: i64,
    pub content_item_id: i64,
    pub media_kind: MediaKind,
    pub container: Option<String>,
    pub display_name: Option<String>,
    pub size: Option<u64>,
    pub bitrate: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub unique_id: Option<String>,
}

impl NewStoredFile {
    pub fn into_stored(self, id: i64) -> StoredFile {
        StoredFile {
            id,
            backend_id: self.backend_id,
            content_item_id: self.content_item_id,
            media_kind: self.media_kind,
            container: self.container,
            display_name: self.display_name,
            size: self.size,
            bitrate: self.bitrate,
            width: self.width,
            height: self.height,
            unique_id: self.unique_id,
            created_at: Utc::now(),
        }
    }
}
