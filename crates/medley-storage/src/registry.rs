//! Backend registry and ordering
//!
//! The registry is a value: it is built from the current configuration for
//! each ingestion and handed to the pipeline. Ordering is a topological sort
//! over backend kinds. Each kind declares "before X" / "after X" hints; kinds
//! are emitted in batches of those with no unsatisfied predecessor, and
//! within a batch instances run in ascending id order.

use async_trait::async_trait;
use medley_core::{AppError, AppResult, BackendKind};
use medley_db::BackendConfigRepository;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::catalogue::{BackendCatalogue, BackendDeps};
use crate::error::{BackendError, BackendResult};
use crate::traits::MediaBackend;

/// Enabled backends in attempt order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    ordered: Vec<Arc<dyn MediaBackend>>,
}

impl BackendRegistry {
    /// Validate and order a set of enabled backends.
    ///
    /// Fails with a configuration error on duplicate ids, on a second
    /// instance of a singleton kind, and on an ordering cycle.
    pub fn build(backends: Vec<Arc<dyn MediaBackend>>) -> BackendResult<Self> {
        let mut by_kind: BTreeMap<BackendKind, Vec<Arc<dyn MediaBackend>>> = BTreeMap::new();
        let mut seen_ids = BTreeSet::new();

        for backend in backends {
            if !seen_ids.insert(backend.id()) {
                return Err(BackendError::Config(format!(
                    "Duplicate backend id {}",
                    backend.id()
                )));
            }
            let instances = by_kind.entry(backend.kind()).or_default();
            if backend.is_singleton() && !instances.is_empty() {
                return Err(BackendError::Config(format!(
                    "Only one {} backend may be enabled (ids {} and {})",
                    backend.kind(),
                    instances[0].id(),
                    backend.id()
                )));
            }
            instances.push(backend);
        }

        let kinds: BTreeSet<BackendKind> = by_kind.keys().copied().collect();

        // successor edges: a -> b means a is attempted before b
        let mut successors: BTreeMap<BackendKind, BTreeSet<BackendKind>> =
            kinds.iter().map(|k| (*k, BTreeSet::new())).collect();
        for (kind, instances) in &by_kind {
            for backend in instances {
                let hints = backend.ordering();
                for other in hints.before.into_iter().filter(|k| kinds.contains(k)) {
                    if other != *kind {
                        successors.entry(*kind).or_default().insert(other);
                    }
                }
                for other in hints.after.into_iter().filter(|k| kinds.contains(k)) {
                    if other != *kind {
                        successors.entry(other).or_default().insert(*kind);
                    }
                }
            }
        }

        let mut in_degree: BTreeMap<BackendKind, usize> = kinds.iter().map(|k| (*k, 0)).collect();
        for targets in successors.values() {
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree += 1;
                }
            }
        }

        let mut ordered = Vec::new();
        let mut remaining = kinds;
        while !remaining.is_empty() {
            let batch: Vec<BackendKind> = remaining
                .iter()
                .filter(|k| in_degree.get(k).copied().unwrap_or(0) == 0)
                .copied()
                .collect();

            if batch.is_empty() {
                let cycle: Vec<&str> = remaining.iter().map(|k| k.as_str()).collect();
                return Err(BackendError::Config(format!(
                    "Backend ordering hints form a cycle among: {}",
                    cycle.join(", ")
                )));
            }

            let mut batch_instances = Vec::new();
            for kind in &batch {
                remaining.remove(kind);
                if let Some(targets) = successors.get(kind) {
                    for target in targets {
                        if let Some(degree) = in_degree.get_mut(target) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
                if let Some(instances) = by_kind.remove(kind) {
                    batch_instances.extend(instances);
                }
            }
            batch_instances.sort_by_key(|b| b.id());
            ordered.extend(batch_instances);
        }

        let registry = Self { ordered };
        tracing::debug!(order = ?registry.describe(), "Backend order computed");
        Ok(registry)
    }

    pub fn ordered(&self) -> &[Arc<dyn MediaBackend>] {
        &self.ordered
    }

    pub fn get(&self, backend_id: i64) -> Option<&Arc<dyn MediaBackend>> {
        self.ordered.iter().find(|b| b.id() == backend_id)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// `(id, kind)` pairs in attempt order
    pub fn describe(&self) -> Vec<(i64, BackendKind)> {
        self.ordered.iter().map(|b| (b.id(), b.kind())).collect()
    }
}

/// Supplies backends to the pipeline.
#[async_trait]
pub trait BackendSource: Send + Sync {
    /// The enabled backends, validated and ordered, as currently configured.
    async fn registry(&self) -> AppResult<BackendRegistry>;

    /// One backend instance by id, whether or not it is enabled.
    async fn instance(&self, backend_id: i64) -> AppResult<Option<Arc<dyn MediaBackend>>>;
}

/// Backends built from a configuration repository through the catalogue.
///
/// Nothing is cached: every call re-reads the configuration so edits take
/// effect on the next ingestion.
#[derive(Clone)]
pub struct ConfiguredBackends {
    configs: Arc<dyn BackendConfigRepository>,
    catalogue: BackendCatalogue,
    deps: BackendDeps,
}

impl ConfiguredBackends {
    pub fn new(
        configs: Arc<dyn BackendConfigRepository>,
        catalogue: BackendCatalogue,
        deps: BackendDeps,
    ) -> Self {
        Self {
            configs,
            catalogue,
            deps,
        }
    }

    pub fn configs(&self) -> &Arc<dyn BackendConfigRepository> {
        &self.configs
    }

    pub fn catalogue(&self) -> &BackendCatalogue {
        &self.catalogue
    }
}

#[async_trait]
impl BackendSource for ConfiguredBackends {
    async fn registry(&self) -> AppResult<BackendRegistry> {
        let records = self.configs.list().await.map_err(AppError::from)?;

        let mut backends = Vec::new();
        for record in records.iter().filter(|r| r.enabled) {
            backends.push(self.catalogue.construct(record, &self.deps)?);
        }

        let registry = BackendRegistry::build(backends)?;
        tracing::info!(order = ?registry.describe(), "Backend registry loaded");
        Ok(registry)
    }

    async fn instance(&self, backend_id: i64) -> AppResult<Option<Arc<dyn MediaBackend>>> {
        let record = self.configs.get(backend_id).await.map_err(AppError::from)?;
        match record {
            Some(record) => Ok(Some(self.catalogue.construct(&record, &self.deps)?)),
            None => Ok(None),
        }
    }
}
