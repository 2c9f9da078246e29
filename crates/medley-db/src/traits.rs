//! Repository trait abstractions
//!
//! These traits define the minimal interface the storage backends and the
//! ingestion pipeline need from persistence, so both can be exercised
//! without a database.

use anyhow::Result;
use async_trait::async_trait;
use medley_core::models::{BackendRecord, NewStoredFile, StoredFile};

/// Storage backend configuration rows.
///
/// Implementations must not cache: every call reflects the current state so
/// reconfiguration takes effect on the next ingestion.
#[async_trait]
pub trait BackendConfigRepository: Send + Sync {
    /// All records, enabled or not, in ascending id order
    async fn list(&self) -> Result<Vec<BackendRecord>>;

    async fn get(&self, id: i64) -> Result<Option<BackendRecord>>;

    /// Insert or replace the record with the same id
    async fn save(&self, record: BackendRecord) -> Result<()>;

    /// Returns false when no record had that id
    async fn remove(&self, id: i64) -> Result<bool>;
}

/// Stored file rows.
#[async_trait]
pub trait StoredFileRepository: Send + Sync {
    /// Persist a new row far enough to obtain its primary key.
    async fn allocate(&self, new: NewStoredFile) -> Result<StoredFile>;

    async fn get(&self, id: i64) -> Result<Option<StoredFile>>;

    /// Overwrite an existing row. Fails if the row does not exist.
    async fn update(&self, file: &StoredFile) -> Result<()>;

    /// Returns false when no row had that id
    async fn remove(&self, id: i64) -> Result<bool>;

    async fn list_by_backend(&self, backend_id: i64) -> Result<Vec<StoredFile>>;

    async fn list_for_item(&self, content_item_id: i64) -> Result<Vec<StoredFile>>;
}
