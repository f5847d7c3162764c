pub mod cache;
pub mod core;
pub mod pipeline;
pub mod query;
pub mod ranking;
pub mod utils;

pub use utils::{safe_truncate, safe_truncate_ellipsis};

pub use cache::{CacheEngine, CacheStore, CacheStrategy, MemoryStore, QueryType};
pub use core::config::PipelineConfig;
pub use core::error::{PipelineError, Result};
pub use pipeline::{PipelineResponse, QueryPipeline, QueryRequest};
pub use query::fuzzy::{EnhancedQuery, FuzzyEnhancer};
pub use query::intent::{IntentClassification, IntentClassifier, QueryIntent};
pub use ranking::{QueryContext, RankingWeights, ResourceRecord, ResultRanker, ScoredResult};

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

pub const DEFAULT_CACHE_CAPACITY: usize = 5000;

pub const DEFAULT_REFRESH_FACTOR: f64 = 0.8;
