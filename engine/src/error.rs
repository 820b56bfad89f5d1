//! Error types for the concordance engine

use thiserror::Error;

/// Failure at the fetch boundary (network, filesystem or in-memory source).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Manifest unavailable: {0}")]
    ManifestUnavailable(String),

    #[error("Shard {letter}/{file} unavailable: {reason}")]
    ShardUnavailable {
        letter: String,
        file: String,
        reason: String,
    },

    #[error("No shard could be loaded for letter {0}")]
    LetterUnavailable(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Another request is still in progress")]
    SearchInProgress,
}

impl serde::Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
