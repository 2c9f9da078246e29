//! Medley persistence collaborators
//!
//! Repository traits consumed by the storage backends and the ingestion
//! pipeline, an in-memory implementation, and a JSON-file store for backend
//! configuration.

pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFileBackendConfigs;
pub use memory::{InMemoryBackendConfigs, InMemoryStoredFiles};
pub use traits::{BackendConfigRepository, StoredFileRepository};
