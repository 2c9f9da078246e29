//! Data models shared by the storage backends and the ingestion pipeline.

mod access_uri;
mod backend;
mod content;
mod media;
mod stored_file;

pub use access_uri::*;
pub use backend::*;
pub use content::*;
pub use media::*;
pub use stored_file::*;
