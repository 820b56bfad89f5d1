//! Concordância - Biblical concordance and dictionary engine
//!
//! Loads letter-sharded JSON datasets on demand, pages and searches them,
//! and refines results by testament, book and headword.

pub mod error;
pub mod config;
pub mod entry;
pub mod books;
pub mod fetch;
pub mod catalog;
pub mod loader;
pub mod cache;
pub mod search;
pub mod filter;
pub mod state;
pub mod session;

pub use error::{EngineError, FetchError};
pub use config::EngineConfig;
pub use entry::{Dataset, Definition, Entry, Occurrence};
pub use books::{
    books, extract_book_name, find_book, format_reference, group_by_book, testament_of,
    testament_of_reference, Book, BookGroup, Testament,
};
pub use fetch::{DirFetcher, Fetcher, HttpFetcher, StaticFetcher};
pub use catalog::{Catalog, ShardCatalog};
pub use loader::{LetterLoad, ShardLoader};
pub use cache::{CacheStats, LetterCache, LetterPage};
pub use search::{GlobalSearch, MatchRule, SearchHit, SearchResults, WordMatcher};
pub use filter::{apply_filters, BookFilter, FilterSpec, TestamentFilter};
pub use state::Engine;
pub use session::{Mode, Notice, Outcome, ResultPresenter, Session};
