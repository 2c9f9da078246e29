use anyhow::Context;
use medley_core::{AppError, ErrorMetadata, LogLevel};
use medley_storage::{IngestInput, ProbeMetadata, ThumbnailSource};
use serde::Serialize;
use std::path::Path;

/// Treat `arg` as a local file when one exists at that path, otherwise as a URL.
pub async fn read_input(arg: &str) -> anyhow::Result<IngestInput> {
    let path = Path::new(arg);
    if !tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
        return Ok(IngestInput::url(arg));
    }

    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(arg)
        .to_string();
    Ok(IngestInput::upload(filename, content))
}

/// JSON view of probe metadata.
#[derive(Debug, Serialize)]
pub struct MetadataView {
    pub media_kind: String,
    pub unique_id: Option<String>,
    pub container: Option<String>,
    pub display_name: Option<String>,
    pub size: Option<u64>,
    pub duration: Option<u32>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

impl From<&ProbeMetadata> for MetadataView {
    fn from(meta: &ProbeMetadata) -> Self {
        Self {
            media_kind: meta.media_kind.to_string(),
            unique_id: meta.unique_id.clone(),
            container: meta.container.clone(),
            display_name: meta.display_name.clone(),
            size: meta.size,
            duration: meta.duration,
            description: meta.description.clone(),
            thumbnail: meta.thumbnail.as_ref().map(|t| match t {
                ThumbnailSource::Inline(bytes) => format!("inline ({} bytes)", bytes.len()),
                ThumbnailSource::Url(url) => url.clone(),
            }),
        }
    }
}

/// Log a command failure for the operator and return the line shown to the user.
///
/// Application errors are reduced to their client message, so sensitive
/// details (FTP replies, configuration values) only reach the log.
pub fn report_error(err: &anyhow::Error) -> String {
    let Some(app) = err.downcast_ref::<AppError>() else {
        tracing::error!(error = %format!("{:#}", err), "Command failed");
        return format!("{:#}", err);
    };

    let details = app.detailed_message();
    let error_code = app.error_code();
    match app.log_level() {
        LogLevel::Debug => tracing::debug!(error = %details, error_code, "Command failed"),
        LogLevel::Warn => tracing::warn!(error = %details, error_code, "Command failed"),
        LogLevel::Error => tracing::error!(error = %details, error_code, "Command failed"),
    }
    format!("{} ({})", app.client_message(), error_code)
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
