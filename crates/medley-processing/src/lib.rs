//! Medley Processing Library
//!
//! Ingestion of uploads and URLs through the configured storage backends,
//! stored-file deletion and backend administration.

pub mod admin;
pub mod ingest;
pub mod thumbnail;

pub use admin::{BackendAdmin, BackendDeletion, KindSummary};
pub use ingest::{IngestOutcome, IngestPipeline};
pub use thumbnail::{NoOpThumbnailer, Thumbnailer};
