//! Medley Storage Library
//!
//! Pluggable media backends and the registry that orders them.
//!
//! Each backend kind implements [`MediaBackend`]. Configured instances are
//! built through the [`BackendCatalogue`] and probed in the order computed by
//! [`BackendRegistry`] from each kind's before/after hints.
//!
//! # Unique ids
//!
//! A stored file's unique id is opaque outside its backend. Backends that
//! copy bytes derive it from the stored file id (see `keys`); reference and
//! embed backends use the remote URL or remote video id.

pub mod catalogue;
pub mod embed;
pub mod error;
pub mod fetcher;
pub mod ftp;
pub(crate) mod keys;
pub mod local;
pub mod registry;
pub mod remote_url;
pub mod traits;

// Re-export commonly used types
pub use catalogue::{BackendCatalogue, BackendDeps, KindInfo, SettingField};
pub use embed::{DailymotionBackend, VimeoBackend, YoutubeBackend};
pub use error::{BackendError, BackendResult};
pub use fetcher::{build_http_client, ContentFetcher, HttpFetcher};
pub use ftp::{FtpBackend, FtpTransport};
pub use local::LocalBackend;
pub use medley_core::BackendKind;
pub use registry::{BackendRegistry, BackendSource, ConfiguredBackends};
pub use remote_url::RemoteUrlBackend;
pub use traits::{
    IngestInput, MediaBackend, OrderingHints, Probe, ProbeMetadata, ThumbnailSource, Transcode,
};
