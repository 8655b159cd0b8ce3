//! Wiring for the bizdir HTTP server: configuration, store options, and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use bizdir_store_sqlite::{SqliteStore, StoreOptions};
use config::{ConfigBuilder, builder::DefaultState};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Prefix for environment overrides, e.g. `BIZDIR_PORT=9000`.
pub const ENV_PREFIX: &str = "BIZDIR";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  pub store_timeout_ms: u64,
  pub read_retries:     u32,
  pub retry_backoff_ms: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let store = StoreOptions::default();
    Self {
      host:             "127.0.0.1".to_owned(),
      port:             8080,
      store_path:       PathBuf::from("~/.local/share/bizdir/bizdir.db"),
      store_timeout_ms: store.timeout.as_millis() as u64,
      read_retries:     store.read_retries,
      retry_backoff_ms: store.retry_backoff.as_millis() as u64,
    }
  }
}

impl ServerConfig {
  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      timeout:       Duration::from_millis(self.store_timeout_ms),
      read_retries:  self.read_retries,
      retry_backoff: Duration::from_millis(self.retry_backoff_ms),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Layer the optional TOML file at `path` under `BIZDIR_*` environment
/// variables.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  parse_config(
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
  )
}

fn parse_config(
  builder: ConfigBuilder<DefaultState>,
) -> anyhow::Result<ServerConfig> {
  builder
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The complete HTTP application for `store`, with request tracing.
pub fn app(store: SqliteStore) -> Router {
  bizdir_api::api_router(Arc::new(store)).layer(TraceLayer::new_for_http())
}
