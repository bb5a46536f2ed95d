//! Typed configuration.
//!
//! Storage locations are passed explicitly at construction time through
//! [`QueueConfig`]; nothing reads process-wide state once a queue exists.
//! Values come from environment variables or a TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::queue::{Backend, DEFAULT_BATCH_SIZE, Ordering};

/// How to construct a queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub backend: Backend,
    pub ordering: Ordering,
    /// SQLite database file. Required for the durable backend.
    pub path: Option<PathBuf>,
    /// Items taken by a pull when no limit is given.
    pub batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            ordering: Ordering::Fifo,
            path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct QueueFile {
    queue: QueueConfig,
}

impl QueueConfig {
    /// A durable queue at `path`.
    pub fn durable(path: impl Into<PathBuf>, ordering: Ordering) -> Self {
        Self {
            backend: Backend::Durable,
            ordering,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// An in-memory queue.
    pub fn memory(ordering: Ordering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    /// Load from `WORKQ_*` environment variables, defaulting what is unset.
    ///
    /// - `WORKQ_BACKEND`: `memory` | `durable`
    /// - `WORKQ_ORDER`: `fifo` | `lifo`
    /// - `WORKQ_PATH`: database file
    /// - `WORKQ_BATCH_SIZE`: positive integer
    pub fn from_env() -> Result<Self> {
        let config = Self::read_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read `WORKQ_*` variables without validating the combination, so
    /// later overrides (CLI flags) can complete it.
    fn read_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(backend) = optional_var("WORKQ_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(order) = optional_var("WORKQ_ORDER") {
            config.ordering = order.parse()?;
        }
        if let Some(path) = optional_var("WORKQ_PATH") {
            config.path = Some(PathBuf::from(path));
        }
        if let Some(size) = optional_var("WORKQ_BATCH_SIZE") {
            config.batch_size = size
                .parse()
                .map_err(|e| Error::Config(format!("invalid WORKQ_BATCH_SIZE {size:?}: {e}")))?;
        }
        Ok(config)
    }

    /// Parse the `[queue]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: QueueFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad queue config: {e}")))?;
        file.queue.validate()?;
        Ok(file.queue)
    }

    /// Load the `[queue]` table from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read queue config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations no backend can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Durable && self.path.is_none() {
            return Err(Error::Config(
                "durable backend requires a storage path".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Process configuration for the `workq` binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub queue: QueueConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this. The queue
    /// section is not validated here; validate it once overrides are applied.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            queue: QueueConfig::read_env()?,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
        })
    }
}

/// Unset and empty variables both read as `None`.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
