pub mod models;
pub mod patterns;

pub use models::{IntentClassification, QueryIntent};

use tracing::debug;

use crate::utils::safe_truncate_ellipsis;

use patterns::{INTENT_PATTERNS, score_group};

/// Deterministic pattern-scoring classifier. No I/O, no learned state;
/// the same query always yields the same classification.
pub struct IntentClassifier;

impl IntentClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Score the query against every intent group and pick the winner.
    ///
    /// A query that matches nothing (empty, punctuation, unrelated text)
    /// classifies as `Unknown` with confidence 0.0.
    #[must_use]
    pub fn classify(&self, query: &str) -> IntentClassification {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return IntentClassification::unknown();
        }
        debug!("Classifying query: {}", safe_truncate_ellipsis(&normalized, 80));

        let mut scored: Vec<(QueryIntent, f64, Vec<String>)> = Vec::new();
        for pattern in INTENT_PATTERNS.iter() {
            let (score, matched) = score_group(pattern, &normalized);
            if score > 0.0 {
                scored.push((pattern.intent, score, matched));
            }
        }

        let total: f64 = scored.iter().map(|(_, s, _)| s).sum();
        if total <= 0.0 {
            return IntentClassification::unknown();
        }

        // First group wins ties, keeping the table order authoritative.
        let (primary, primary_score, matched_keywords) = scored
            .iter()
            .fold(None::<(QueryIntent, f64, &Vec<String>)>, |best, (i, s, m)| {
                match best {
                    Some((_, bs, _)) if *s <= bs => best,
                    _ => Some((*i, *s, m)),
                }
            })
            .map(|(i, s, m)| (i, s, m.clone()))
            .unwrap_or((QueryIntent::Unknown, 0.0, Vec::new()));

        let mut secondary: Vec<(QueryIntent, f64)> = scored
            .iter()
            .filter(|(intent, score, _)| *intent != primary && *score > 0.5)
            .map(|(intent, score, _)| (*intent, score / total))
            .collect();
        secondary.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        secondary.truncate(2);

        IntentClassification {
            primary_intent: primary,
            confidence: primary_score / total,
            secondary_intents: secondary,
            strategy: primary.strategy().to_string(),
            matched_keywords,
            suggested_actions: primary.suggested_actions(),
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
