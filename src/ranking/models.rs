use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw result record from the upstream data source.
///
/// Known identity fields are typed; everything else passes through
/// `fields` untouched so the ranker can score records it does not fully
/// understand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "type", default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn default_resource_type() -> String {
    "other".to_string()
}

impl ResourceRecord {
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            name: None,
            organization: None,
            updated_at: None,
            fields: Map::new(),
        }
    }

    /// A string-valued extra field, if present and non-empty.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// A numeric extra field, if present.
    #[must_use]
    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }
}

/// Entities extracted from the (corrected) query, used for relevance
/// scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    pub query_text: String,
    pub organizations: Vec<String>,
    pub ip_addresses: Vec<String>,
    pub servers: Vec<String>,
}

impl QueryContext {
    #[must_use]
    pub fn from_query(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Self::default()
        }
    }
}

/// The seven ranking factors, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RankingFactors {
    pub fuzzy_score: f64,
    pub entity_relevance: f64,
    pub recency_score: f64,
    pub popularity_score: f64,
    pub user_context_score: f64,
    pub type_priority: f64,
    pub completeness_score: f64,
}

impl RankingFactors {
    /// Weighted sum of all factors, clamped to [0, 1].
    #[must_use]
    pub fn total(&self, weights: &RankingWeights) -> f64 {
        let sum = self.fuzzy_score * weights.fuzzy
            + self.entity_relevance * weights.entity_relevance
            + self.recency_score * weights.recency
            + self.popularity_score * weights.popularity
            + self.user_context_score * weights.user_context
            + self.type_priority * weights.type_priority
            + self.completeness_score * weights.completeness;
        sum.clamp(0.0, 1.0)
    }
}

/// Per-factor weights. The defaults sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankingWeights {
    pub fuzzy: f64,
    pub entity_relevance: f64,
    pub recency: f64,
    pub popularity: f64,
    pub user_context: f64,
    pub type_priority: f64,
    pub completeness: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            fuzzy: 0.25,
            entity_relevance: 0.20,
            recency: 0.15,
            popularity: 0.10,
            user_context: 0.10,
            type_priority: 0.10,
            completeness: 0.10,
        }
    }
}

/// A ranked result: the record, its score and the factor breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    pub data: ResourceRecord,
    pub score: f64,
    pub factors: RankingFactors,
    pub dedup_key: String,
    pub source_type: String,
}

/// Profile of a user's typical access patterns, supplied by an injected
/// provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub typical_organizations: Vec<String>,
    pub typical_types: Vec<String>,
    pub recent_item_ids: Vec<String>,
}

/// Popularity signal for an item, normalized to [0, 1].
pub trait PopularityProvider: Send + Sync {
    fn popularity(&self, item_id: &str) -> Option<f64>;
}

/// Access-pattern profiles keyed by user id.
pub trait UserProfileProvider: Send + Sync {
    fn profile(&self, user_id: &str) -> Option<UserProfile>;
}
