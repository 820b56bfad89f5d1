//! Server configuration, read from `concordancia.json` in the working directory

use anyhow::{Context, Result};
use concordancia_lib::{DirFetcher, EngineConfig, Fetcher, HttpFetcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONFIG_FILE: &str = "concordancia.json";

/// Where shard documents are read from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Http { base_url: String },
    Dir { root: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Dir {
            root: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
    pub source: SourceConfig,
    pub engine: EngineConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            source: SourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Read `path`, or use the defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&body).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn fetcher(&self) -> Result<Arc<dyn Fetcher>> {
        let fetcher: Arc<dyn Fetcher> = match &self.source {
            SourceConfig::Http { base_url } => {
                Arc::new(HttpFetcher::new(base_url.as_str()).context("Failed to build HTTP client")?)
            }
            SourceConfig::Dir { root } => Arc::new(DirFetcher::new(root.clone())),
        };
        Ok(fetcher)
    }
}
