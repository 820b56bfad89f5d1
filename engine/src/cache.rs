//! Per-letter aggregation and page memoization with request coalescing

use crate::catalog::ShardCatalog;
use crate::config::EngineConfig;
use crate::entry::{Entry, Occurrence};
use crate::error::{EngineError, Result};
use crate::loader::ShardLoader;
use lru::LruCache;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

/// Shared by every caller of one key while its value is being produced
type Slot<T> = Arc<OnceCell<T>>;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PageKey {
    letter: String,
    page: usize,
    page_size: usize,
}

/// One page of a letter's merged entry list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterPage {
    pub letter: String,
    pub page: usize,
    pub page_size: usize,
    pub entries: Vec<Entry>,
    pub has_more: bool,
    pub total_count: usize,
    /// Placeholder content served because the letter could not be loaded
    pub fallback: bool,
}

impl LetterPage {
    fn slice(letter: &str, page: usize, page_size: usize, all: &[Entry]) -> Self {
        let start = page.saturating_mul(page_size);
        let entries: Vec<Entry> = all.iter().skip(start).take(page_size).cloned().collect();
        let has_more = page.saturating_add(1).saturating_mul(page_size) < all.len();

        Self {
            letter: letter.to_string(),
            page,
            page_size,
            entries,
            has_more,
            total_count: all.len(),
            fallback: false,
        }
    }

    fn empty(letter: &str, page: usize, page_size: usize) -> Self {
        Self::slice(letter, page, page_size, &[])
    }

    fn fallback(letter: &str, page_size: usize) -> Self {
        let sample = Entry::new(
            "exemplo",
            vec![Occurrence::new(
                "Exemplo 1:1",
                "Este é um exemplo de dados de fallback.",
            )],
        )
        .with_source("Dados de exemplo");

        Self {
            letter: letter.to_string(),
            page: 0,
            page_size,
            entries: vec![sample],
            has_more: false,
            total_count: 1,
            fallback: true,
        }
    }

    /// Real data inside the letter. Placeholders and pages past the end are
    /// served but never kept.
    fn is_memoizable(&self) -> bool {
        !self.fallback && self.page.saturating_mul(self.page_size) < self.total_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub cached_pages: usize,
    pub pending_pages: usize,
    pub cached_letters: usize,
    pub catalog_loaded: bool,
}

pub struct LetterCache {
    catalog: Arc<ShardCatalog>,
    loader: ShardLoader,
    config: EngineConfig,
    pages: Mutex<LruCache<PageKey, Arc<LetterPage>>>,
    pending: Mutex<HashMap<PageKey, Slot<Arc<LetterPage>>>>,
    /// `None` is a failed aggregation, kept only until its waiters have seen it
    letters: Mutex<LruCache<String, Slot<Option<Arc<Vec<Entry>>>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn capacity(slots: usize) -> NonZeroUsize {
    NonZeroUsize::new(slots).unwrap_or(NonZeroUsize::MIN)
}

pub fn is_valid_letter(letter: &str) -> bool {
    let mut chars = letter.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

impl LetterCache {
    pub fn new(catalog: Arc<ShardCatalog>, loader: ShardLoader, config: EngineConfig) -> Self {
        Self {
            catalog,
            loader,
            pages: Mutex::new(LruCache::new(capacity(config.page_slots))),
            pending: Mutex::new(HashMap::new()),
            letters: Mutex::new(LruCache::new(capacity(config.letter_slots))),
            config,
        }
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    pub async fn get_page(&self, letter: &str, page: usize) -> Arc<LetterPage> {
        self.get_page_sized(letter, page, self.config.page_size).await
    }

    /// Page `page` of `letter`, `page_size` entries wide (clamped to the
    /// configured maximum).
    ///
    /// Identical concurrent requests share one computation and all receive its
    /// result, placeholder included. Pages holding real data are memoized until
    /// [`clear`](Self::clear) or eviction. If the letter cannot be loaded at all
    /// a one-entry placeholder page is returned and a later call retries.
    pub async fn get_page_sized(&self, letter: &str, page: usize, page_size: usize) -> Arc<LetterPage> {
        let letter = letter.trim().to_lowercase();
        let page_size = self.config.clamp_page_size(page_size);
        if !is_valid_letter(&letter) {
            return Arc::new(LetterPage::empty(&letter, page, page_size));
        }

        let key = PageKey {
            letter: letter.clone(),
            page,
            page_size,
        };
        let slot = {
            let mut pending = lock(&self.pending);
            if let Some(hit) = lock(&self.pages).get(&key) {
                tracing::debug!(%letter, page, "Page cache hit");
                return Arc::clone(hit);
            }
            pending
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = slot
            .get_or_init(|| self.compute_page(&letter, page, page_size))
            .await
            .clone();
        self.settle(&key, &slot, &result);
        result
    }

    async fn compute_page(&self, letter: &str, page: usize, page_size: usize) -> Arc<LetterPage> {
        match self.letter_entries(letter).await {
            Ok(all) => Arc::new(LetterPage::slice(letter, page, page_size, &all)),
            Err(e) => {
                tracing::warn!(%letter, error = %e, "Serving fallback page");
                Arc::new(LetterPage::fallback(letter, page_size))
            }
        }
    }

    /// Retire a finished pending slot, keeping its page if it holds real data.
    /// Only the first waiter to get here does anything.
    fn settle(&self, key: &PageKey, slot: &Slot<Arc<LetterPage>>, page: &Arc<LetterPage>) {
        let mut pending = lock(&self.pending);
        if !pending.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            return;
        }
        pending.remove(key);
        if page.is_memoizable() {
            lock(&self.pages).put(key.clone(), Arc::clone(page));
        }
    }

    /// The whole merged entry list of a letter
    pub async fn letter_entries(&self, letter: &str) -> Result<Arc<Vec<Entry>>> {
        let letter = letter.trim().to_lowercase();
        let slot = lock(&self.letters)
            .get_or_insert(letter.clone(), || Arc::new(OnceCell::new()))
            .clone();

        let outcome = slot
            .get_or_init(|| async { self.aggregate(&letter).await.ok() })
            .await
            .clone();

        match outcome {
            Some(entries) => Ok(entries),
            None => {
                let mut letters = lock(&self.letters);
                if letters.peek(&letter).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                    letters.pop(&letter);
                }
                Err(EngineError::LetterUnavailable(letter))
            }
        }
    }

    async fn aggregate(&self, letter: &str) -> Result<Arc<Vec<Entry>>> {
        let catalog = self.catalog.get().await;
        let files = catalog.files(letter);
        if files.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let load = self
            .loader
            .load_letter(letter, files, self.config.batch_width)
            .await;
        if load.is_total_failure() {
            return Err(EngineError::LetterUnavailable(letter.to_string()));
        }

        tracing::info!(
            letter,
            entries = load.entries.len(),
            shards = load.loaded,
            failed = load.failed,
            "Aggregated letter"
        );
        Ok(Arc::new(load.entries))
    }

    /// Drop memoized pages and letter aggregations. The catalog is kept.
    pub fn clear(&self) {
        lock(&self.pending).clear();
        lock(&self.pages).clear();
        lock(&self.letters).clear();
    }

    pub fn stats(&self) -> CacheStats {
        let cached_pages = lock(&self.pages).len();
        let pending_pages = lock(&self.pending).len();
        CacheStats {
            cached_pages,
            pending_pages,
            cached_letters: lock(&self.letters).len(),
            catalog_loaded: self.catalog.is_loaded(),
        }
    }
}
