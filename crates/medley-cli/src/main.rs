//! Medley CLI: inspect and exercise the configured storage backends.
//!
//! Backends are read from the JSON file named by MEDLEY_BACKENDS_FILE
//! (default `backends.json`). Stored files only live for one invocation.

use anyhow::Context;
use clap::{Parser, Subcommand};
use medley_cli::{init_tracing, read_input, report_error, MetadataView};
use medley_core::models::ContentItem;
use medley_core::selection::{pick_best_uri, pick_download_uri};
use medley_core::{BackendKind, Config};
use medley_db::{InMemoryStoredFiles, JsonFileBackendConfigs};
use medley_processing::{BackendAdmin, IngestPipeline, NoOpThumbnailer};
use medley_storage::{BackendCatalogue, BackendDeps, BackendSource, ConfiguredBackends};
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "medley", about = "Media storage backend CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the backend kinds this build knows about
    Kinds,
    /// Show the configuration settings of one backend kind
    Schema {
        /// Kind tag, e.g. local, ftp, remote_url, youtube
        kind: String,
    },
    /// Print the enabled backends in probe order
    Order,
    /// Find the backend that accepts a file or URL, without storing anything
    Probe {
        /// Path to a local file, or a URL
        input: String,
    },
    /// Ingest a file or URL and print the stored file and its access URIs
    Ingest {
        /// Path to a local file, or a URL
        input: String,
        /// Title of the content item; taken from the media when omitted
        #[arg(long)]
        title: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", report_error(&err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    let deps = BackendDeps::from_config(&config)?;
    let fetcher = deps.fetcher.clone();
    let configs = Arc::new(JsonFileBackendConfigs::new(config.backends_file()));
    let backends = Arc::new(ConfiguredBackends::new(
        configs,
        BackendCatalogue::builtin(),
        deps,
    ));
    let files = Arc::new(InMemoryStoredFiles::new());
    let admin = BackendAdmin::new(backends.clone(), files.clone());
    let pipeline = IngestPipeline::new(backends.clone(), files, Arc::new(NoOpThumbnailer), fetcher);

    match cli.command {
        Commands::Kinds => {
            print_json(&admin.kinds())?;
        }
        Commands::Schema { kind } => {
            let kind: BackendKind = kind.parse()?;
            print_json(&serde_json::json!({
                "kind": kind,
                "settings": admin.schema(kind),
            }))?;
        }
        Commands::Order => {
            let registry = backends.registry().await?;
            let order: Vec<_> = registry
                .ordered()
                .iter()
                .enumerate()
                .map(|(position, backend)| {
                    serde_json::json!({
                        "position": position + 1,
                        "id": backend.id(),
                        "kind": backend.kind(),
                        "name": backend.name(),
                    })
                })
                .collect();
            print_json(&order)?;
        }
        Commands::Probe { input } => {
            let input = read_input(&input).await?;
            let (backend, metadata) = pipeline.probe(&input).await?;
            print_json(&serde_json::json!({
                "backend_id": backend.id(),
                "backend_kind": backend.kind(),
                "metadata": MetadataView::from(&metadata),
            }))?;
        }
        Commands::Ingest { input, title } => {
            let input = read_input(&input).await?;
            let mut item = ContentItem::new(1);
            item.title = title;

            let outcome = pipeline.ingest(&mut item, input).await?;
            let uris = pipeline.item_access_uris(&item).await?;
            print_json(&serde_json::json!({
                "content_item": item,
                "stored_file": outcome.file,
                "derived": outcome.derived,
                "access_uris": uris,
                "best_uri": pick_best_uri(&uris),
                "download_uri": pick_download_uri(&uris),
            }))?;
        }
    }

    Ok(())
}
