//! In-memory repositories
//!
//! Process-local stores backed by `Arc<Mutex<..>>` maps. Used by tests and by
//! the CLI, where stored file rows only need to live for one invocation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use medley_core::models::{BackendRecord, NewStoredFile, StoredFile};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{BackendConfigRepository, StoredFileRepository};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow!("in-memory store lock poisoned"))
}

/// Backend configuration held in memory.
#[derive(Clone, Default)]
pub struct InMemoryBackendConfigs {
    records: Arc<Mutex<BTreeMap<i64, BackendRecord>>>,
}

impl InMemoryBackendConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = BackendRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl BackendConfigRepository for InMemoryBackendConfigs {
    async fn list(&self) -> Result<Vec<BackendRecord>> {
        Ok(lock(&self.records)?.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<BackendRecord>> {
        Ok(lock(&self.records)?.get(&id).cloned())
    }

    async fn save(&self, record: BackendRecord) -> Result<()> {
        lock(&self.records)?.insert(record.id, record);
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        Ok(lock(&self.records)?.remove(&id).is_some())
    }
}

#[derive(Default)]
struct StoredFileTable {
    next_id: i64,
    rows: BTreeMap<i64, StoredFile>,
}

/// Stored file rows held in memory. Ids are allocated sequentially from 1.
#[derive(Clone, Default)]
pub struct InMemoryStoredFiles {
    table: Arc<Mutex<StoredFileTable>>,
}

impl InMemoryStoredFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StoredFileRepository for InMemoryStoredFiles {
    async fn allocate(&self, new: NewStoredFile) -> Result<StoredFile> {
        let mut table = lock(&self.table)?;
        table.next_id += 1;
        let file = new.into_stored(table.next_id);
        table.rows.insert(file.id, file.clone());
        Ok(file)
    }

    async fn get(&self, id: i64) -> Result<Option<StoredFile>> {
        Ok(lock(&self.table)?.rows.get(&id).cloned())
    }

    async fn update(&self, file: &StoredFile) -> Result<()> {
        let mut table = lock(&self.table)?;
        match table.rows.get_mut(&file.id) {
            Some(row) => {
                *row = file.clone();
                Ok(())
            }
            None => Err(anyhow!("stored file {} does not exist", file.id)),
        }
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        Ok(lock(&self.table)?.rows.remove(&id).is_some())
    }

    async fn list_by_backend(&self, backend_id: i64) -> Result<Vec<StoredFile>> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .filter(|f| f.backend_id == backend_id)
            .cloned()
            .collect())
    }

    async fn list_for_item(&self, content_item_id: i64) -> Result<Vec<StoredFile>> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .filter(|f| f.content_item_id == content_item_id)
            .cloned()
            .collect())
    }
}
