// ⚠️ Error taxonomy - one variant per pipeline stage boundary
// Every variant is fatal to the run; nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read source snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Exchange rate for {0} not found in rate table")]
    RateLookup(String),

    #[error("Invalid rate table {origin}: {reason}")]
    RateTable { origin: String, reason: String },

    #[error("Failed to write {sink} sink: {source}")]
    SinkWrite {
        sink: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Query failed `{sql}`: {source}")]
    Query {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database connection {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to append to progress log {path:?}: {source}")]
    ProgressLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EtlError {
    pub fn extraction(message: impl Into<String>) -> Self {
        EtlError::Extraction(message.into())
    }

    pub fn sink_write<E>(sink: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        EtlError::SinkWrite {
            sink,
            source: source.into(),
        }
    }
}

pub type EtlResult<T> = Result<T, EtlError>;
