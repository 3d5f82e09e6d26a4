//! `rito` server binary.
//!
//! Reads `rito.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the JSON API, imports a file of event-stream
//! records, or syncs one account's follows from a DID list.
//!
//! ```text
//! rito serve
//! rito --config /etc/rito.toml import events.jsonl
//! rito follows did:plc:abc follows.txt
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rito_server::{ServerConfig, app, import_events, sync_follows};
use rito_store_sqlite::SqliteStore;
use tokio::{fs::File, io::BufReader, net::TcpListener};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rito bookmark server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rito.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API over HTTP.
  Serve,
  /// Apply newline-delimited JSON events from a file, then exit.
  Import {
    /// The event file.
    path: PathBuf,
  },
  /// Replace an account's follows with the DIDs listed in a file.
  Follows {
    /// DID of the following account.
    observer: String,
    /// One target DID per line.
    path:     PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RITO"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Serve => serve(store, &server_cfg).await,
    Command::Import { path } => {
      let file = File::open(&path)
        .await
        .with_context(|| format!("failed to open {path:?}"))?;
      let summary = import_events(&store, BufReader::new(file))
        .await
        .with_context(|| format!("failed to read {path:?}"))?;
      tracing::info!(
        applied = summary.applied,
        skipped = summary.skipped,
        failed = summary.failed,
        "import finished"
      );
      Ok(())
    }
    Command::Follows { observer, path } => {
      let file = File::open(&path)
        .await
        .with_context(|| format!("failed to open {path:?}"))?;
      sync_follows(&store, &observer, BufReader::new(file))
        .await
        .with_context(|| format!("failed to sync follows from {path:?}"))?;
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let router = app(Arc::new(store), server_cfg);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, router).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
