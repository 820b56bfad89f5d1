//! Per-letter shard fetching and normalization

use crate::entry::{Dataset, Entry};
use crate::error::{EngineError, Result};
use crate::fetch::Fetcher;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;

/// Entries gathered from every shard of one letter, in shard order
#[derive(Debug, Default)]
pub struct LetterLoad {
    pub entries: Vec<Entry>,
    pub loaded: usize,
    pub failed: usize,
}

impl LetterLoad {
    /// Every listed shard failed, so the letter has no usable data
    pub fn is_total_failure(&self) -> bool {
        self.loaded == 0 && self.failed > 0
    }
}

#[derive(Clone)]
pub struct ShardLoader {
    fetcher: Arc<dyn Fetcher>,
    dataset: Dataset,
}

impl ShardLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, dataset: Dataset) -> Self {
        Self { fetcher, dataset }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Fetch and parse one shard, reporting failures
    pub async fn fetch_shard(&self, letter: &str, file: &str) -> Result<Vec<Entry>> {
        let path = self.dataset.shard_path(letter, file);
        let unavailable = |reason: String| EngineError::ShardUnavailable {
            letter: letter.to_string(),
            file: file.to_string(),
            reason,
        };

        let body = self
            .fetcher
            .fetch(&path)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let root: Value = serde_json::from_str(&body).map_err(|e| unavailable(e.to_string()))?;

        let key = self.dataset.shard_key(letter);
        let items = match root {
            Value::Object(mut map) => match map.remove(&key) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => {
                    tracing::debug!(%path, %key, "Shard has no entries under its letter key");
                    return Ok(Vec::new());
                }
                Some(_) => return Err(unavailable(format!("\"{}\" is not an array", key))),
            },
            _ => return Err(unavailable("document is not an object".to_string())),
        };

        let mut entries = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            match self.dataset.parse_entry(item) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(%path, idx, error = %e, "Skipping malformed entry"),
            }
        }
        Ok(entries)
    }

    /// Like [`fetch_shard`](Self::fetch_shard) but a bad shard is an empty list
    pub async fn load_shard(&self, letter: &str, file: &str) -> Vec<Entry> {
        match self.fetch_shard(letter, file).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping shard");
                Vec::new()
            }
        }
    }

    /// Load every shard of a letter, `batch_width` at a time.
    ///
    /// Results are concatenated in the order of `files`, whatever order the
    /// fetches complete in.
    pub async fn load_letter(&self, letter: &str, files: &[String], batch_width: usize) -> LetterLoad {
        let mut load = LetterLoad::default();

        for batch in files.chunks(batch_width.max(1)) {
            let results = join_all(batch.iter().map(|file| self.fetch_shard(letter, file))).await;
            for result in results {
                match result {
                    Ok(entries) => {
                        load.loaded += 1;
                        load.entries.extend(entries);
                    }
                    Err(e) => {
                        load.failed += 1;
                        tracing::warn!(error = %e, "Skipping shard");
                    }
                }
            }
        }

        load
    }
}
