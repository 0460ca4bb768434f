use std::time::Duration;

use thiserror::Error;

/// Failure of a single pipeline turn or of one of the services it calls.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("pipeline run exceeded its {}s budget", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("no indexable documents found in {0}")]
    EmptyCorpus(String),
}

impl RagError {
    pub fn io<E: std::fmt::Display>(err: E) -> Self {
        RagError::Io(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        RagError::Storage(err.to_string())
    }

    pub fn network<E: std::fmt::Display>(err: E) -> Self {
        RagError::Network(err.to_string())
    }

    /// Short stable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Configuration(_) => "configuration",
            RagError::Io(_) => "io",
            RagError::Storage(_) => "storage",
            RagError::Network(_) => "network",
            RagError::Authentication(_) => "authentication",
            RagError::Protocol(_) => "protocol",
            RagError::Timeout(_) => "timeout",
            RagError::EmptyCorpus(_) => "empty_corpus",
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::io(err)
    }
}

impl From<sqlx::Error> for RagError {
    fn from(err: sqlx::Error) -> Self {
        RagError::storage(err)
    }
}
