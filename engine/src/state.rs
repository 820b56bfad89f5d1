//! Engine state: one explicitly constructed service per dataset

use crate::cache::{CacheStats, LetterCache, LetterPage};
use crate::catalog::{Catalog, ShardCatalog};
use crate::config::EngineConfig;
use crate::entry::Dataset;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::loader::ShardLoader;
use crate::search::{GlobalSearch, SearchResults};
use std::sync::Arc;

/// Catalog, letter cache and search engine sharing one fetcher.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Engine {
    dataset: Dataset,
    config: EngineConfig,
    catalog: Arc<ShardCatalog>,
    cache: LetterCache,
    search: GlobalSearch,
}

impl Engine {
    pub fn new(fetcher: Arc<dyn Fetcher>, dataset: Dataset, config: EngineConfig) -> Self {
        let config = config.sanitized();
        let catalog = Arc::new(ShardCatalog::new(fetcher.clone(), dataset));
        let loader = ShardLoader::new(fetcher, dataset);

        Self {
            dataset,
            cache: LetterCache::new(catalog.clone(), loader.clone(), config.clone()),
            search: GlobalSearch::new(catalog.clone(), loader, config.batch_width),
            catalog,
            config,
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn catalog(&self) -> Arc<Catalog> {
        self.catalog.get().await
    }

    pub async fn page(&self, letter: &str, page: usize) -> Arc<LetterPage> {
        self.cache.get_page(letter, page).await
    }

    pub async fn page_sized(&self, letter: &str, page: usize, page_size: usize) -> Arc<LetterPage> {
        self.cache.get_page_sized(letter, page, page_size).await
    }

    pub async fn search(&self, term: &str) -> Result<SearchResults> {
        self.search.search(term).await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!(dataset = %self.dataset, "Cleared letter cache");
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
