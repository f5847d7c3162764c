use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheContext, CacheEngine, CacheStore, CacheStrategy, QueryType};
use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::query::fuzzy::{EnhancedQuery, FuzzyEnhancer};
use crate::query::intent::{IntentClassification, IntentClassifier};
use crate::ranking::{QueryContext, ResourceRecord, ResultRanker, ScoredResult};
use crate::utils::safe_truncate_ellipsis;

/// Optional supplier of known names (organizations, systems, services)
/// for fuzzy candidate matching.
pub trait CandidateSource: Send + Sync {
    fn candidates(&self) -> Vec<String>;
}

/// One inbound operator query with its parameters and identity.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    pub params: HashMap<String, Value>,
    pub organization_id: Option<String>,
    pub user_id: Option<String>,
    pub force_refresh: bool,
}

impl QueryRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Ranked, annotated answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub enhanced: EnhancedQuery,
    pub intent: IntentClassification,
    pub query_type: QueryType,
    /// True when the upstream fetch failed and an expired cache entry
    /// was served instead.
    pub served_stale: bool,
    pub results: Vec<ScoredResult>,
}

/// Sequences the pipeline: enhance -> classify -> cached fetch -> rank.
///
/// Owns every component; nothing in the crate lives in module-level
/// mutable state, so independent pipelines never interfere.
pub struct QueryPipeline {
    config: PipelineConfig,
    enhancer: FuzzyEnhancer,
    classifier: IntentClassifier,
    cache: CacheEngine,
    ranker: ResultRanker,
    candidate_source: Option<Arc<dyn CandidateSource>>,
}

impl QueryPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            enhancer: FuzzyEnhancer::from_config(&config),
            classifier: IntentClassifier::new(),
            cache: CacheEngine::with_refresh_factor(store, config.refresh_factor),
            ranker: ResultRanker::new(),
            candidate_source: None,
            config,
        }
    }

    #[must_use]
    pub fn with_candidate_source(mut self, source: Arc<dyn CandidateSource>) -> Self {
        self.candidate_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_ranker(mut self, ranker: ResultRanker) -> Self {
        self.ranker = ranker;
        self
    }

    /// The cache engine, for invalidation and refresh-signal wiring.
    #[must_use]
    pub fn cache(&self) -> &CacheEngine {
        &self.cache
    }

    /// Answer one query. `fetch` is called on cache miss (at most once)
    /// and is expected to return the raw result records as JSON.
    ///
    /// A low-confidence classification is not an error: the response
    /// carries `Unknown` with clarifying suggestions. A failed fetch
    /// with no cached value surfaces as [`PipelineError::Upstream`].
    pub async fn answer<F, Fut>(&self, request: QueryRequest, fetch: F) -> Result<PipelineResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if request.query.trim().is_empty() {
            return Err(PipelineError::Validation("query must not be empty".to_string()));
        }
        info!(
            query = %safe_truncate_ellipsis(&request.query, 80),
            "answering query"
        );

        let candidates = self
            .candidate_source
            .as_deref()
            .map(|source| source.candidates())
            .unwrap_or_default();

        let enhanced = self.enhancer.enhance(&request.query, &candidates, None);
        let intent = self.classifier.classify(&enhanced.corrected);
        let query_type = intent.primary_intent.query_type();
        debug!(
            intent = %intent.primary_intent,
            confidence = intent.confidence,
            query_type = %query_type,
            "query classified"
        );

        let cache_context = CacheContext {
            organization_id: request.organization_id.clone(),
            user_id: request.user_id.clone(),
        };
        let key = CacheEngine::key_for(&enhanced.corrected, &request.params, &cache_context);
        let tags = invalidation_tags(&cache_context);

        let fetched = self
            .cache
            .get_or_fetch_tagged(&key, query_type, request.force_refresh, &tags, fetch)
            .await?;

        let strategy = CacheStrategy::for_type(query_type);
        if strategy.refresh_before_expiry && !fetched.served_stale {
            if let Err(err) = self.cache.schedule_refresh(&key, query_type, strategy.ttl()) {
                warn!(error = %err, "failed to arm refresh timer");
            }
        }

        let records = decode_records(&fetched.value);
        let query_context = extract_entities(&enhanced.corrected, &candidates);
        let mut results =
            self.ranker
                .rank(&records, &query_context, request.user_id.as_deref(), None);
        if self.config.max_results > 0 && results.len() > self.config.max_results {
            debug!(
                dropped = results.len() - self.config.max_results,
                "truncating ranked results"
            );
            results.truncate(self.config.max_results);
        }

        Ok(PipelineResponse {
            enhanced,
            intent,
            query_type,
            served_stale: fetched.served_stale,
            results,
        })
    }
}

fn invalidation_tags(context: &CacheContext) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(org) = &context.organization_id {
        tags.push(format!("org:{org}"));
    }
    if let Some(user) = &context.user_id {
        tags.push(format!("user:{user}"));
    }
    tags
}

/// Decode upstream JSON into records. Accepts a bare array, an object
/// with a `results` array, or a single record; anything undecodable is
/// skipped rather than failing the query.
fn decode_records(value: &Value) -> Vec<ResourceRecord> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("results").and_then(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![value],
        },
        _ => Vec::new(),
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<ResourceRecord>((*item).clone()) {
            Ok(record) => records.push(record),
            Err(err) => warn!(error = %err, "skipping undecodable result record"),
        }
    }
    records
}

lazy_static! {
    static ref IP_ADDRESS: Option<Regex> =
        Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").ok();
}

/// Pull rankable entities out of the corrected query: IP addresses,
/// hostname-shaped tokens, and any candidate names the query mentions.
fn extract_entities(corrected: &str, candidates: &[String]) -> QueryContext {
    let lower = corrected.to_lowercase();
    let mut context = QueryContext::from_query(corrected);

    if let Some(ip_pattern) = IP_ADDRESS.as_ref() {
        for m in ip_pattern.find_iter(&lower) {
            context.ip_addresses.push(m.as_str().to_string());
        }
    }
    for token in lower.split_whitespace() {
        if token.len() >= 3 && token.contains('-') && token.chars().any(|c| c.is_ascii_digit()) {
            context.servers.push(token.to_string());
        }
    }
    for candidate in candidates {
        if lower.contains(&candidate.to_lowercase()) {
            context.organizations.push(candidate.clone());
        }
    }

    context
}
