//! Browse/search session driving a presenter
//!
//! A [`Session`] holds what the user is looking at: the current letter or
//! search, the accumulated results and the active filters. Requests that
//! fetch data are tagged with a generation number; when a request finishes
//! after the session has moved on, its result is dropped instead of drawn.

use crate::entry::Entry;
use crate::error::{EngineError, Result};
use crate::filter::{apply_filters, BookFilter, FilterSpec, TestamentFilter};
use crate::state::Engine;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Rendering side of a session. Never called with the session lock held.
pub trait ResultPresenter: Send + Sync {
    /// Draw `entries`, replacing what is shown unless `append` is set
    fn render(&self, entries: &[Entry], append: bool);

    fn update_counter(&self, visible: usize, total: usize);

    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    NoResults { term: String },
    Error { message: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::NoResults { term } => write!(f, "Nenhum resultado encontrado para \"{}\"", term),
            Notice::Error { message } => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Letter {
        letter: String,
        page: usize,
        /// Size of the first page; later pages are fetched with the same size
        page_size: usize,
    },
    Search {
        term: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    /// Nothing to do in the current mode
    Unchanged,
    /// Superseded while fetching; the result was discarded
    Stale,
}

struct SessionState {
    mode: Mode,
    /// Last browsed letter, restored when a search is cleared
    letter: Option<String>,
    results: Vec<Entry>,
    total: usize,
    has_more: bool,
    filters: FilterSpec,
    generation: u64,
    in_flight: Option<u64>,
}

/// What to hand to the presenter once the lock is released
struct Frame {
    entries: Vec<Entry>,
    append: bool,
    visible: usize,
    total: usize,
    notice: Option<Notice>,
}

impl SessionState {
    fn begin(&mut self) -> Result<u64> {
        if self.in_flight.is_some() {
            return Err(EngineError::SearchInProgress);
        }
        self.generation += 1;
        self.in_flight = Some(self.generation);
        Ok(self.generation)
    }

    /// Release the in-flight slot. False when the request was superseded.
    fn complete(&mut self, generation: u64) -> bool {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
        self.generation == generation
    }

    fn supersede(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    fn clear_results(&mut self) {
        self.mode = Mode::Idle;
        self.results.clear();
        self.total = 0;
        self.has_more = false;
        self.filters = FilterSpec::default();
    }

    fn redraw(&self, notice: Option<Notice>) -> Frame {
        let entries = apply_filters(&self.results, &self.filters);
        Frame {
            visible: entries.len(),
            entries,
            append: false,
            total: self.total,
            notice,
        }
    }
}

pub struct Session {
    engine: Arc<Engine>,
    presenter: Arc<dyn ResultPresenter>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(engine: Arc<Engine>, presenter: Arc<dyn ResultPresenter>) -> Self {
        Self {
            engine,
            presenter,
            state: Mutex::new(SessionState {
                mode: Mode::Idle,
                letter: None,
                results: Vec::new(),
                total: 0,
                has_more: false,
                filters: FilterSpec::default(),
                generation: 0,
                in_flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn show(&self, frame: Frame) {
        self.presenter.render(&frame.entries, frame.append);
        self.presenter.update_counter(frame.visible, frame.total);
        if let Some(notice) = frame.notice {
            self.presenter.notify(notice);
        }
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode.clone()
    }

    pub fn filters(&self) -> FilterSpec {
        self.lock().filters.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Entries currently shown, after filtering
    pub fn visible(&self) -> Vec<Entry> {
        let state = self.lock();
        apply_filters(&state.results, &state.filters)
    }

    /// Browse a letter from its first page. Filters and any search are reset
    /// and the word filter is re-enabled.
    pub async fn select_letter(&self, letter: &str) -> Result<Outcome> {
        let generation = self.lock().begin()?;
        let page = self.engine.page(letter, 0).await;

        let frame = {
            let mut state = self.lock();
            if !state.complete(generation) {
                tracing::debug!(generation, "Discarding stale letter page");
                return Ok(Outcome::Stale);
            }
            state.mode = Mode::Letter {
                letter: page.letter.clone(),
                page: 0,
                page_size: page.page_size,
            };
            state.letter = Some(page.letter.clone());
            state.results = page.entries.clone();
            state.total = page.total_count;
            state.has_more = page.has_more;
            state.filters = FilterSpec::default();
            state.redraw(None)
        };

        self.show(frame);
        Ok(Outcome::Rendered)
    }

    /// Append the next page of the current letter
    pub async fn load_more(&self) -> Result<Outcome> {
        let (generation, letter, next, page_size) = {
            let mut state = self.lock();
            let Mode::Letter { letter, page, page_size } = &state.mode else {
                return Ok(Outcome::Unchanged);
            };
            if !state.has_more {
                return Ok(Outcome::Unchanged);
            }
            let (letter, next, page_size) = (letter.clone(), page + 1, *page_size);
            (state.begin()?, letter, next, page_size)
        };

        let page = self.engine.page_sized(&letter, next, page_size).await;

        let frame = {
            let mut state = self.lock();
            if !state.complete(generation) {
                tracing::debug!(generation, "Discarding stale page");
                return Ok(Outcome::Stale);
            }

            if page.fallback {
                state.has_more = false;
                None
            } else {
                let added = apply_filters(&page.entries, &state.filters);
                state.results.extend(page.entries.iter().cloned());
                state.total = page.total_count;
                state.has_more = page.has_more;
                state.mode = Mode::Letter {
                    letter: letter.clone(),
                    page: next,
                    page_size,
                };
                Some(Frame {
                    entries: added,
                    append: true,
                    visible: apply_filters(&state.results, &state.filters).len(),
                    total: state.total,
                    notice: None,
                })
            }
        };

        match frame {
            Some(frame) => self.show(frame),
            None => self.presenter.notify(Notice::Error {
                message: format!("Não foi possível carregar mais resultados da letra {}", letter),
            }),
        }
        Ok(Outcome::Rendered)
    }

    /// Search every letter. An empty term leaves search mode and goes back to
    /// the last browsed letter, or to idle.
    pub async fn search(&self, term: &str) -> Result<Outcome> {
        let term = term.trim();
        if term.is_empty() {
            return self.leave_search().await;
        }

        let generation = self.lock().begin()?;
        let result = self.engine.search(term).await;

        let frame = {
            let mut state = self.lock();
            if !state.complete(generation) {
                tracing::debug!(generation, term, "Discarding stale search");
                return Ok(Outcome::Stale);
            }
            result.map(|results| {
                state.mode = Mode::Search {
                    term: results.term.clone(),
                };
                state.results = results.entries();
                state.total = results.total;
                state.has_more = false;
                state.filters = FilterSpec {
                    word_enabled: false,
                    ..FilterSpec::default()
                };
                let notice = (results.total == 0).then(|| Notice::NoResults {
                    term: results.term.clone(),
                });
                state.redraw(notice)
            })
        };

        match frame {
            Ok(frame) => {
                self.show(frame);
                Ok(Outcome::Rendered)
            }
            Err(e) => {
                self.presenter.notify(Notice::Error { message: e.to_string() });
                Err(e)
            }
        }
    }

    async fn leave_search(&self) -> Result<Outcome> {
        let letter = {
            let state = self.lock();
            if state.in_flight.is_some() {
                return Err(EngineError::SearchInProgress);
            }
            state.letter.clone()
        };

        if let Some(letter) = letter {
            return self.select_letter(&letter).await;
        }

        let frame = {
            let mut state = self.lock();
            state.clear_results();
            state.redraw(None)
        };
        self.show(frame);
        Ok(Outcome::Rendered)
    }

    /// Narrow by testament. The book filter goes back to all books.
    pub fn set_testament(&self, value: &str) -> Result<Outcome> {
        let testament: TestamentFilter = value.parse()?;
        let frame = {
            let mut state = self.lock();
            state.filters.testament = testament;
            state.filters.book = BookFilter::All;
            state.redraw(None)
        };
        self.show(frame);
        Ok(Outcome::Rendered)
    }

    pub fn set_book(&self, value: &str) -> Result<Outcome> {
        let book: BookFilter = value.parse()?;
        let frame = {
            let mut state = self.lock();
            state.filters.book = book;
            state.redraw(None)
        };
        self.show(frame);
        Ok(Outcome::Rendered)
    }

    /// Filter by headword. Ignored while a global search is shown.
    pub fn set_word_filter(&self, text: &str) -> Outcome {
        let frame = {
            let mut state = self.lock();
            if !state.filters.word_enabled {
                return Outcome::Unchanged;
            }
            state.filters.word = text.to_string();
            state.redraw(None)
        };
        self.show(frame);
        Outcome::Rendered
    }

    /// Back to idle; anything still loading is discarded when it lands
    pub fn reset(&self) {
        let frame = {
            let mut state = self.lock();
            state.supersede();
            state.clear_results();
            state.letter = None;
            state.redraw(None)
        };
        self.show(frame);
    }

    pub fn clear_cache(&self) {
        self.engine.clear_cache();
        self.lock().supersede();
    }
}
