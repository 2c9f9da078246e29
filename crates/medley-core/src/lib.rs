//! Medley Core Library
//!
//! Domain models, error types, configuration and access URI selection shared
//! by every Medley crate.

pub mod config;
pub mod error;
pub mod models;
pub mod selection;
pub mod storage_types;

pub use config::{Config, MedleyConfig};
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use storage_types::BackendKind;
