//! Fetch boundary: where shard and manifest documents come from
//!
//! The engine never touches the network or the filesystem directly. It is
//! handed a [`Fetcher`] and asks it for documents by dataset-relative path
//! (`concordancia/a/a1.json`), which keeps every component testable with an
//! in-memory source.

use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the raw body of the document at `path`
    async fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

/// Fetches documents from a static web host
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { client, base_url })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(self.url_for(path))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

/// Reads the same layout from a local directory
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Fetcher for DirFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|part| part == "..") {
            return Err(FetchError::NotFound(path.to_string()));
        }

        match tokio::fs::read_to_string(self.root.join(relative)).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(path.to_string()))
            }
            Err(e) => Err(FetchError::Io(e.to_string())),
        }
    }
}

/// In-memory documents with per-path hit counters
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<String, String>,
    failures: HashMap<String, FetchError>,
    hits: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.documents.insert(path.into(), body.into());
        self
    }

    pub fn with_failure(mut self, path: impl Into<String>, error: FetchError) -> Self {
        self.failures.insert(path.into(), error);
        self
    }

    /// How many times `path` was requested
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .map(|hits| hits.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().map(|hits| hits.values().sum()).unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        if let Ok(mut hits) = self.hits.lock() {
            *hits.entry(path.to_string()).or_insert(0) += 1;
        }

        if let Some(error) = self.failures.get(path) {
            return Err(error.clone());
        }

        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }
}
