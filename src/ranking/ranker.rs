use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::factors::{
    completeness_score, entity_relevance, fuzzy_text_score, popularity_score, recency_score,
    type_priority, user_context_score,
};
use super::models::{
    PopularityProvider, QueryContext, RankingFactors, RankingWeights, ResourceRecord,
    ScoredResult, UserProfileProvider,
};

/// Above this many results the ordering is diversified by type.
const DIVERSIFY_THRESHOLD: usize = 5;
/// Max results of one type in the diversified head of the ordering.
const MAX_PER_TYPE: usize = 3;

/// Multi-factor result ranker: dedup, score, sort, diversify.
///
/// Pure over its inputs; the only outside reads are the injected
/// popularity and user-profile providers, so output is deterministic
/// given their state.
pub struct ResultRanker {
    popularity: Option<Arc<dyn PopularityProvider>>,
    profiles: Option<Arc<dyn UserProfileProvider>>,
}

impl ResultRanker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            popularity: None,
            profiles: None,
        }
    }

    #[must_use]
    pub fn with_providers(
        popularity: Option<Arc<dyn PopularityProvider>>,
        profiles: Option<Arc<dyn UserProfileProvider>>,
    ) -> Self {
        Self {
            popularity,
            profiles,
        }
    }

    /// Rank `results` against the query context. Duplicates (same dedup
    /// key) keep their first occurrence. Inputs are never mutated.
    #[must_use]
    pub fn rank(
        &self,
        results: &[ResourceRecord],
        context: &QueryContext,
        user_id: Option<&str>,
        weights: Option<&RankingWeights>,
    ) -> Vec<ScoredResult> {
        let default_weights = RankingWeights::default();
        let weights = weights.unwrap_or(&default_weights);
        let profile = user_id.and_then(|id| {
            self.profiles
                .as_deref()
                .and_then(|provider| provider.profile(id))
        });

        let mut seen: HashSet<String> = HashSet::new();
        let mut scored: Vec<ScoredResult> = Vec::with_capacity(results.len());

        for record in results {
            let dedup_key = dedup_key(record);
            if !seen.insert(dedup_key.clone()) {
                continue;
            }

            let factors = RankingFactors {
                fuzzy_score: fuzzy_text_score(&context.query_text, record),
                entity_relevance: entity_relevance(context, record),
                recency_score: recency_score(record.updated_at.as_deref()),
                popularity_score: popularity_score(record, self.popularity.as_deref()),
                user_context_score: user_context_score(record, profile.as_ref()),
                type_priority: type_priority(&record.resource_type),
                completeness_score: completeness_score(record),
            };

            scored.push(ScoredResult {
                score: factors.total(weights),
                factors,
                dedup_key,
                source_type: record.resource_type.clone(),
                data: record.clone(),
            });
        }

        // Stable sort: equal scores keep input order, which makes
        // re-ranking an already-ranked list reproduce itself.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let ranked = diversify(scored);
        debug!(
            input = results.len(),
            ranked = ranked.len(),
            "ranking complete"
        );
        ranked
    }
}

impl Default for ResultRanker {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identity of a logical result across duplicate raw records:
/// `type:id` when an id exists, `type:name:org` when only names do,
/// otherwise a hash of the full sorted field set.
#[must_use]
pub fn dedup_key(record: &ResourceRecord) -> String {
    if let Some(id) = record.id.as_deref().filter(|v| !v.trim().is_empty()) {
        return format!("{}:{}", record.resource_type, id);
    }
    if let Some(name) = record.name.as_deref().filter(|v| !v.trim().is_empty()) {
        let org = record.organization.as_deref().unwrap_or("");
        return format!(
            "{}:{}:{}",
            record.resource_type,
            normalize(name),
            normalize(org)
        );
    }

    // serde_json maps are sorted by key, so serializing the fields gives
    // a canonical byte sequence.
    let mut hasher = Sha256::new();
    hasher.update(record.resource_type.as_bytes());
    hasher.update(
        serde_json::to_string(&record.fields)
            .unwrap_or_default()
            .as_bytes(),
    );
    format!("{}:{:x}", record.resource_type, hasher.finalize())
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// When more than [`DIVERSIFY_THRESHOLD`] results are present, cap each
/// type at [`MAX_PER_TYPE`] occurrences in the head of the ordering and
/// defer the overflow to the tail in its original relative order.
fn diversify(sorted: Vec<ScoredResult>) -> Vec<ScoredResult> {
    if sorted.len() <= DIVERSIFY_THRESHOLD {
        return sorted;
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut head: Vec<ScoredResult> = Vec::with_capacity(sorted.len());
    let mut deferred: Vec<ScoredResult> = Vec::new();

    for result in sorted {
        let count = counts.entry(result.source_type.clone()).or_insert(0);
        if *count < MAX_PER_TYPE {
            *count += 1;
            head.push(result);
        } else {
            deferred.push(result);
        }
    }

    head.extend(deferred);
    head
}
