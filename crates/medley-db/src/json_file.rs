//! JSON-file backend configuration store
//!
//! The file holds a JSON array of backend records. It is re-read on every
//! call, so edits made by an operator apply to the next ingestion without a
//! restart. A missing file reads as an empty configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use medley_core::models::BackendRecord;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::traits::BackendConfigRepository;

#[derive(Debug, Clone)]
pub struct JsonFileBackendConfigs {
    path: PathBuf,
}

impl JsonFileBackendConfigs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<BackendRecord>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Backend configuration file not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read backend configuration {}", self.path.display())
                })
            }
        };

        let mut records: Vec<BackendRecord> = serde_json::from_slice(&raw).with_context(|| {
            format!("Invalid backend configuration in {}", self.path.display())
        })?;
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn write_all(&self, records: &[BackendRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;

        // Write next to the target and rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::info!(
            path = %self.path.display(),
            backends = records.len(),
            "Backend configuration saved"
        );
        Ok(())
    }
}

#[async_trait]
impl BackendConfigRepository for JsonFileBackendConfigs {
    async fn list(&self) -> Result<Vec<BackendRecord>> {
        self.read_all().await
    }

    async fn get(&self, id: i64) -> Result<Option<BackendRecord>> {
        Ok(self.read_all().await?.into_iter().find(|r| r.id == id))
    }

    async fn save(&self, record: BackendRecord) -> Result<()> {
        let mut records = self.read_all().await?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        records.sort_by_key(|r| r.id);
        self.write_all(&records).await
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        let mut records = self.read_all().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_all(&records).await?;
        Ok(true)
    }
}
