//! Letter -> shard filename manifest, loaded once per session

use crate::entry::Dataset;
use crate::error::{EngineError, Result};
use crate::fetch::Fetcher;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    letters: BTreeMap<String, Vec<String>>,
    /// True when the manifest could not be loaded and the built-in list is used
    pub fallback: bool,
}

impl Catalog {
    /// Keys are lowercased. Keys that differ only in case are merged in key order.
    pub fn new(letters: BTreeMap<String, Vec<String>>) -> Self {
        let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (letter, files) in letters {
            let key = letter.to_lowercase();
            if merged.contains_key(&key) {
                tracing::warn!(letter = %letter, merged_into = %key, "Manifest lists a letter twice; merging shard lists");
            }
            merged.entry(key).or_default().extend(files);
        }
        Self { letters: merged, fallback: false }
    }

    /// Minimal catalog used when the manifest is unreachable
    pub fn fallback() -> Self {
        let mut letters = BTreeMap::new();
        letters.insert(
            "a".to_string(),
            vec!["a1".to_string(), "a2".to_string(), "a3".to_string(), "a4".to_string()],
        );
        Self { letters, fallback: true }
    }

    pub fn files(&self, letter: &str) -> &[String] {
        self.letters
            .get(&letter.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn letters(&self) -> impl Iterator<Item = &str> {
        self.letters.keys().map(String::as_str)
    }

    pub fn shard_count(&self) -> usize {
        self.letters.values().map(Vec::len).sum()
    }
}

pub struct ShardCatalog {
    fetcher: Arc<dyn Fetcher>,
    dataset: Dataset,
    cell: OnceCell<Arc<Catalog>>,
}

impl ShardCatalog {
    pub fn new(fetcher: Arc<dyn Fetcher>, dataset: Dataset) -> Self {
        Self {
            fetcher,
            dataset,
            cell: OnceCell::new(),
        }
    }

    /// The catalog, fetching the manifest on first use.
    ///
    /// Concurrent first callers share one fetch. A failed fetch resolves to
    /// [`Catalog::fallback`] and that result is kept for the session.
    pub async fn get(&self) -> Arc<Catalog> {
        self.cell
            .get_or_init(|| async {
                match self.fetch_manifest().await {
                    Ok(catalog) => {
                        tracing::info!(
                            dataset = %self.dataset,
                            letters = catalog.letters.len(),
                            shards = catalog.shard_count(),
                            "Loaded shard manifest"
                        );
                        Arc::new(catalog)
                    }
                    Err(e) => {
                        tracing::warn!(dataset = %self.dataset, error = %e, "Using fallback shard catalog");
                        Arc::new(Catalog::fallback())
                    }
                }
            })
            .await
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    async fn fetch_manifest(&self) -> Result<Catalog> {
        let path = self.dataset.manifest_path();
        let body = self
            .fetcher
            .fetch(&path)
            .await
            .map_err(|e| EngineError::ManifestUnavailable(e.to_string()))?;

        let letters: BTreeMap<String, Vec<String>> = serde_json::from_str(&body)
            .map_err(|e| EngineError::ManifestUnavailable(format!("{}: {}", path, e)))?;

        Ok(Catalog::new(letters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;

    const MANIFEST: &str = "concordancia/lista_letras.json";

    #[tokio::test]
    async fn test_loads_manifest_once() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_document(MANIFEST, r#"{"a": ["a1", "a2"], "B": ["b1"]}"#),
        );
        let catalog = ShardCatalog::new(fetcher.clone(), Dataset::Concordance);

        let (first, second) = tokio::join!(catalog.get(), catalog.get());
        assert_eq!(first, second);
        assert_eq!(first.files("A"), ["a1", "a2"]);
        assert_eq!(first.files("b"), ["b1"]);
        assert!(first.files("z").is_empty());
        assert!(!first.fallback);

        catalog.get().await;
        assert_eq!(fetcher.hits(MANIFEST), 1);
    }

    #[test]
    fn test_case_variant_letters_are_merged() {
        let letters: BTreeMap<String, Vec<String>> =
            serde_json::from_str(r#"{"a": ["a2"], "A": ["a1"], "b": ["b1"]}"#).unwrap();
        let catalog = Catalog::new(letters);

        assert_eq!(catalog.files("a"), ["a1", "a2"]);
        assert_eq!(catalog.letters().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(catalog.shard_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_manifest_falls_back() {
        let fetcher = Arc::new(StaticFetcher::new());
        let catalog = ShardCatalog::new(fetcher.clone(), Dataset::Concordance);

        let loaded = catalog.get().await;
        assert!(loaded.fallback);
        assert!(!loaded.files("a").is_empty());

        // fallback is kept, not retried
        catalog.get().await;
        assert_eq!(fetcher.hits(MANIFEST), 1);
    }

    #[tokio::test]
    async fn test_malformed_manifest_falls_back() {
        let fetcher = Arc::new(StaticFetcher::new().with_document(MANIFEST, "[1, 2, 3]"));
        let catalog = ShardCatalog::new(fetcher, Dataset::Concordance);
        assert!(catalog.get().await.fallback);
    }
}
