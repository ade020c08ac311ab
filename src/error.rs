//! Error taxonomy for the store layer
//!
//! Two kinds matter to callers: a referenced record that does not exist
//! (HTTP glue maps this to 404) and an unavailable backing store (5xx).
//! Data-quality problems (unparseable durations, zero-division in rate
//! computation) never surface here; they are absorbed locally with defined
//! defaults so a single malformed record cannot abort a pass or a query.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced agent or version is absent
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A query, aggregate, or write against the backing store failed.
    /// Never retried by this layer.
    #[error("store unavailable: {source}")]
    Unavailable {
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }

    pub fn unavailable(source: impl Into<anyhow::Error>) -> Self {
        StoreError::Unavailable { source: source.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::unavailable(err)
    }
}
