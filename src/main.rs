//! # Solr Harness CLI (`solrh`)
//!
//! Analyze JSON document batches locally, upload them to a Solr core through
//! the ingest service, and fetch the core's live metadata.
//!
//! ## Usage
//!
//! ```bash
//! solrh --config ./config/solrh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `solrh analyze <file>` | Summarize a JSON batch without any network access |
//! | `solrh upload <file>` | Analyze, then upload and index the batch |
//! | `solrh metadata` | Fetch and print the core's metadata snapshot |
//! | `solrh refresh` | Fetch repeatedly, keeping the last good snapshot |
//!
//! ## Examples
//!
//! ```bash
//! # Look at a batch before sending it anywhere
//! solrh analyze ./data.json
//!
//! # Index it into the `docs` core on a remote Solr
//! solrh upload ./data.json --host solr.internal --core docs
//!
//! # Machine-readable snapshot
//! solrh metadata --core docs --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use solr_harness::config;
use solr_harness::error::ClassifiedError;
use solr_harness::ingest;
use solr_harness::metadata_cmd;
use solr_harness::models::ConnectionProfile;
use solr_harness::progress::ProgressMode;

/// Solr Harness CLI: upload JSON batches to a Solr core and inspect its metadata.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "solrh",
    about = "Solr Harness — upload JSON batches to a Solr core and inspect its metadata",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/solrh.toml")]
    config: PathBuf,

    /// Solr host (overrides `[profile].host`).
    #[arg(long, global = true)]
    host: Option<String>,

    /// Solr port (overrides `[profile].port`).
    #[arg(long, global = true)]
    port: Option<String>,

    /// Core name (overrides `[profile].core_name`).
    #[arg(long = "core", global = true)]
    core_name: Option<String>,

    /// Print results as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Progress on stderr: `auto`, `off`, `human`, or `json`.
    #[arg(long, global = true, default_value = "auto")]
    progress: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSON file locally.
    ///
    /// Prints file facts, the record count, the fields of the first record,
    /// and a preview of the first two records. Never contacts the backend.
    Analyze {
        /// Path to the JSON file.
        file: PathBuf,

        /// Declared media type (default: derived from the extension).
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Upload a JSON file for indexing.
    ///
    /// The file is analyzed first; nothing is sent if it is not valid JSON
    /// or the connection profile is incomplete. Failed uploads are not
    /// retried.
    Upload {
        /// Path to the JSON file.
        file: PathBuf,

        /// Declared media type (default: derived from the extension).
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Fetch the core's metadata snapshot.
    Metadata,

    /// Fetch the core's metadata repeatedly.
    ///
    /// A failed attempt keeps the previous snapshot on screen and prints
    /// the reason next to it.
    Refresh {
        /// Number of fetches.
        #[arg(long, default_value_t = 3)]
        times: u32,

        /// Seconds to wait between fetches.
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solr_harness=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let progress = ProgressMode::parse(&cli.progress).ok_or_else(|| {
        anyhow::anyhow!(
            "invalid --progress '{}': expected auto, off, human, or json",
            cli.progress
        )
    })?;

    let cfg = config::load_config(&cli.config)?;

    let mut profile: ConnectionProfile = cfg.profile.to_profile();
    if let Some(host) = cli.host {
        profile.host = host;
    }
    if let Some(port) = cli.port {
        profile.port = port;
    }
    if let Some(core_name) = cli.core_name {
        profile.core_name = core_name;
    }

    let result = match cli.command {
        Commands::Analyze { file, media_type } => {
            ingest::run_analyze(&cfg, &file, media_type.as_deref(), cli.json)
        }
        Commands::Upload { file, media_type } => {
            ingest::run_upload(
                &cfg,
                profile,
                &file,
                media_type.as_deref(),
                cli.json,
                progress,
            )
            .await
        }
        Commands::Metadata => metadata_cmd::run_metadata(&cfg, profile, cli.json, progress).await,
        Commands::Refresh {
            times,
            interval_secs,
        } => {
            metadata_cmd::run_refresh(
                &cfg,
                profile,
                times,
                Duration::from_secs(interval_secs),
                cli.json,
                progress,
            )
            .await
        }
    };

    match result {
        // Classified errors have already been rendered.
        Err(e) if e.downcast_ref::<ClassifiedError>().is_some() => std::process::exit(1),
        other => other,
    }
}
