use thiserror::Error;

use crate::cache::store::StoreError;

/// Errors surfaced by the query pipeline.
///
/// Only the cache store and the caller-supplied fetcher can produce hard
/// errors; the enhancer, classifier and ranker degrade to neutral output
/// on malformed input instead of erroring.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
