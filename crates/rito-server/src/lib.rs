//! Rito server: configuration, router assembly, event import and follow
//! sync.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use rito_core::{
  filter::DEFAULT_PAGE_SIZE,
  ingest::{Event, Outcome, apply_event},
  store::{IngestStore, RitoStore},
};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Server configuration, loaded from a TOML file layered under `RITO_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path: PathBuf,
  /// Listing page size when a request does not ask for one.
  pub page_size:  u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8787,
      store_path: PathBuf::from("rito.db"),
      page_size:  DEFAULT_PAGE_SIZE,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted at `/api`, with request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: RitoStore + 'static,
{
  Router::new()
    .nest("/api", rito_api::api_router(store, config.page_size))
    .layer(TraceLayer::new_for_http())
}

// ─── Import ───────────────────────────────────────────────────────────────────

/// Tally of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
  pub applied: u64,
  pub skipped: u64,
  pub failed:  u64,
}

/// Apply newline-delimited JSON events from `reader` in order.
///
/// Blank lines are ignored. A line that does not parse, or whose event the
/// store rejects, is logged and counted; the import carries on.
pub async fn import_events<S, R>(store: &S, reader: R) -> std::io::Result<ImportSummary>
where
  S: IngestStore,
  S::Error: From<rito_core::Error>,
  R: AsyncBufRead + Unpin,
{
  let mut summary = ImportSummary::default();
  let mut lines = reader.lines();
  let mut line_no = 0u64;

  while let Some(line) = lines.next_line().await? {
    line_no += 1;
    if line.trim().is_empty() {
      continue;
    }

    let event = match Event::from_json(&line) {
      Ok(event) => event,
      Err(e) => {
        tracing::warn!(line = line_no, error = %e, "unparsable event");
        summary.failed += 1;
        continue;
      }
    };

    match apply_event(store, &event).await {
      Ok(Outcome::Skipped) => {
        tracing::debug!(line = line_no, kind = %event.kind, "skipped event");
        summary.skipped += 1;
      }
      Ok(outcome) => {
        tracing::info!(line = line_no, ?outcome, "applied event");
        summary.applied += 1;
      }
      Err(e) => {
        tracing::warn!(line = line_no, error = %e, "event rejected");
        summary.failed += 1;
      }
    }
  }

  Ok(summary)
}

// ─── Follow sync ──────────────────────────────────────────────────────────────

/// Replace `observer_did`'s follows with the DIDs listed in `reader`, one per
/// line. Blank lines and `#` comments are ignored; duplicates collapse.
/// Returns the number of distinct targets stored.
pub async fn sync_follows<S, R>(
  store: &S,
  observer_did: &str,
  reader: R,
) -> anyhow::Result<usize>
where
  S: IngestStore,
  R: AsyncBufRead + Unpin,
{
  let mut targets = Vec::new();
  let mut lines = reader.lines();
  while let Some(line) = lines.next_line().await? {
    let did = line.trim();
    if did.is_empty() || did.starts_with('#') {
      continue;
    }
    if !did.starts_with("did:") {
      anyhow::bail!("not a DID: {did:?}");
    }
    if !targets.iter().any(|t| t == did) {
      targets.push(did.to_owned());
    }
  }

  store.replace_follows(observer_did, &targets).await?;
  tracing::info!(observer = observer_did, count = targets.len(), "follows synced");
  Ok(targets.len())
}
