//! Administrative operations on backend configuration.

use medley_core::models::BackendRecord;
use medley_core::{AppError, AppResult, BackendKind};
use medley_db::StoredFileRepository;
use medley_storage::{ConfiguredBackends, SettingField};
use serde::Serialize;
use std::sync::Arc;

use crate::ingest::delete_artifact;

/// Catalogue entry as shown to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: BackendKind,
    pub display_name: &'static str,
    pub singleton: bool,
    pub before: Vec<BackendKind>,
    pub after: Vec<BackendKind>,
}

/// Outcome of removing a backend and everything it owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendDeletion {
    pub files_removed: usize,
    /// Stored files whose artifact the backend could not delete
    pub artifact_failures: usize,
}

pub struct BackendAdmin {
    backends: Arc<ConfiguredBackends>,
    files: Arc<dyn StoredFileRepository>,
}

impl BackendAdmin {
    pub fn new(backends: Arc<ConfiguredBackends>, files: Arc<dyn StoredFileRepository>) -> Self {
        Self { backends, files }
    }

    pub fn kinds(&self) -> Vec<KindSummary> {
        self.backends
            .catalogue()
            .kinds()
            .map(|info| KindSummary {
                kind: info.kind,
                display_name: info.display_name,
                singleton: info.singleton,
                before: info.before.to_vec(),
                after: info.after.to_vec(),
            })
            .collect()
    }

    pub fn schema(&self, kind: BackendKind) -> Vec<SettingField> {
        self.backends.catalogue().schema(kind)
    }

    pub async fn list(&self) -> AppResult<Vec<BackendRecord>> {
        Ok(self.backends.configs().list().await?)
    }

    /// Enable or disable a backend. Enabling a second instance of a
    /// singleton kind is rejected.
    pub async fn set_enabled(&self, backend_id: i64, enabled: bool) -> AppResult<BackendRecord> {
        let configs = self.backends.configs();
        let mut record = configs
            .get(backend_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Storage backend {}", backend_id)))?;

        if enabled && !record.enabled {
            let singleton = self
                .backends
                .catalogue()
                .get(record.kind())
                .is_some_and(|info| info.singleton);
            if singleton {
                let conflict = configs
                    .list()
                    .await?
                    .into_iter()
                    .find(|r| r.enabled && r.id != record.id && r.kind() == record.kind());
                if let Some(other) = conflict {
                    return Err(AppError::Configuration(format!(
                        "Only one {} backend may be enabled; backend {} ({}) already is",
                        record.kind(),
                        other.id,
                        other.name
                    )));
                }
            }
        }

        record.enabled = enabled;
        configs.save(record.clone()).await?;
        tracing::info!(backend_id = backend_id, enabled = enabled, "Backend enabled flag updated");
        Ok(record)
    }

    /// Delete a backend. Every stored file it owns is deleted through the
    /// backend first; a failed artifact deletion is counted, not fatal.
    #[tracing::instrument(skip(self))]
    pub async fn delete_backend(&self, backend_id: i64) -> AppResult<BackendDeletion> {
        let configs = self.backends.configs();
        if configs.get(backend_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Storage backend {}", backend_id)));
        }

        let mut report = BackendDeletion::default();
        for file in self.files.list_by_backend(backend_id).await? {
            let deleted = match delete_artifact(self.backends.as_ref(), &file).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    tracing::warn!(
                        backend_id = backend_id,
                        stored_file_id = file.id,
                        error = %e,
                        "Could not reach backend to delete stored artifact"
                    );
                    false
                }
            };
            if !deleted {
                report.artifact_failures += 1;
            }
            self.files.remove(file.id).await?;
            report.files_removed += 1;
        }

        configs.remove(backend_id).await?;
        tracing::info!(
            backend_id = backend_id,
            files_removed = report.files_removed,
            artifact_failures = report.artifact_failures,
            "Backend deleted"
        );
        Ok(report)
    }
}
