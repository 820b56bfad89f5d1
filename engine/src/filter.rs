//! Refinement of an already-loaded result set by word, testament and book

use crate::books::{self, Book, Testament};
use crate::entry::{Entry, Occurrence};
use crate::error::{EngineError, Result};
use serde::{Serialize, Serializer};
use std::str::FromStr;

fn is_all(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("all") || value.eq_ignore_ascii_case("todos")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestamentFilter {
    #[default]
    All,
    Only(Testament),
}

impl FromStr for TestamentFilter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        if is_all(s) {
            return Ok(TestamentFilter::All);
        }
        s.parse::<Testament>()
            .map(TestamentFilter::Only)
            .map_err(EngineError::InvalidFilter)
    }
}

impl Serialize for TestamentFilter {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TestamentFilter::All => serializer.serialize_str("all"),
            TestamentFilter::Only(t) => t.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookFilter {
    #[default]
    All,
    Book(&'static Book),
}

impl FromStr for BookFilter {
    type Err = EngineError;

    /// Accepts a book id (`gn`, `1jo`) or a book name
    fn from_str(s: &str) -> Result<Self> {
        if is_all(s) {
            return Ok(BookFilter::All);
        }
        books::find_book(s)
            .or_else(|| books::book_for_name(s))
            .map(BookFilter::Book)
            .ok_or_else(|| EngineError::InvalidFilter(format!("unknown book: {}", s.trim())))
    }
}

impl Serialize for BookFilter {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BookFilter::All => serializer.serialize_str("all"),
            BookFilter::Book(book) => serializer.serialize_str(book.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub testament: TestamentFilter,
    pub book: BookFilter,
    pub word: String,
    /// The word stage is skipped while disabled, whatever `word` holds
    pub word_enabled: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            testament: TestamentFilter::All,
            book: BookFilter::All,
            word: String::new(),
            word_enabled: true,
        }
    }
}

impl FilterSpec {
    pub fn is_noop(&self) -> bool {
        self.testament == TestamentFilter::All && self.book == BookFilter::All && !self.word_active()
    }

    fn word_active(&self) -> bool {
        self.word_enabled && !self.word.trim().is_empty()
    }
}

/// Run the word, testament and book stages in that order.
///
/// Narrowing stages drop entries left with no occurrences; counts follow the
/// narrowed occurrence lists.
pub fn apply_filters(entries: &[Entry], spec: &FilterSpec) -> Vec<Entry> {
    let mut current: Vec<Entry> = if spec.word_active() {
        let needle = spec.word.trim().to_lowercase();
        entries
            .iter()
            .filter(|e| e.headword.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    } else {
        entries.to_vec()
    };

    if let TestamentFilter::Only(testament) = spec.testament {
        current = narrow(current, |o| {
            books::testament_of_reference(&o.reference) == Some(testament)
        });
    }

    if let BookFilter::Book(book) = spec.book {
        current = narrow(current, |o| in_book(o, book));
    }

    current
}

fn in_book(occurrence: &Occurrence, book: &Book) -> bool {
    let name = books::extract_book_name(&occurrence.reference);
    books::book_for_name(&name).is_some_and(|b| b.id == book.id)
}

fn narrow<F>(entries: Vec<Entry>, keep: F) -> Vec<Entry>
where
    F: Fn(&Occurrence) -> bool,
{
    entries
        .into_iter()
        .filter_map(|mut entry| {
            entry.occurrences.retain(|o| keep(o));
            (!entry.occurrences.is_empty()).then_some(entry)
        })
        .collect()
}
