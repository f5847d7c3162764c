use chrono::{DateTime, Utc};
use serde_json::Value;

use super::models::{PopularityProvider, QueryContext, ResourceRecord, UserProfile};

/// Fields a well-maintained record is expected to carry; the
/// completeness factor is the fraction of these present and non-empty.
const IMPORTANT_FIELDS: &[&str] = &["id", "name", "organization", "updated_at", "description", "url"];

const NEUTRAL: f64 = 0.5;

/// Fraction of query tokens found in the record's searchable text. An
/// exact name match scores 1.0; an empty query is neutral.
#[must_use]
pub fn fuzzy_text_score(query_text: &str, record: &ResourceRecord) -> f64 {
    let query = query_text.trim().to_lowercase();
    if query.is_empty() {
        return NEUTRAL;
    }

    let haystack = searchable_text(record);
    if let Some(name) = &record.name {
        if name.trim().to_lowercase() == query {
            return 1.0;
        }
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return NEUTRAL;
    }
    let hits = tokens
        .iter()
        .filter(|token| haystack.contains(*token))
        .count();
    hits as f64 / tokens.len() as f64
}

/// Overlap between the query's extracted entities and the record. No
/// entities means no signal, which scores neutral.
#[must_use]
pub fn entity_relevance(context: &QueryContext, record: &ResourceRecord) -> f64 {
    let entities: Vec<String> = context
        .organizations
        .iter()
        .chain(context.ip_addresses.iter())
        .chain(context.servers.iter())
        .map(|e| e.to_lowercase())
        .collect();
    if entities.is_empty() {
        return NEUTRAL;
    }

    let haystack = searchable_text(record);
    let hits = entities.iter().filter(|e| haystack.contains(*e)).count();
    hits as f64 / entities.len() as f64
}

/// Fixed age-decay table over `updated_at`. Missing or unparseable
/// timestamps are neutral.
#[must_use]
pub fn recency_score(updated_at: Option<&str>) -> f64 {
    let Some(parsed) = updated_at.and_then(parse_datetime_utc) else {
        return NEUTRAL;
    };

    let age_hours = (Utc::now() - parsed).num_seconds() as f64 / 3600.0;
    if age_hours <= 1.0 {
        1.0
    } else if age_hours <= 24.0 {
        0.9
    } else if age_hours <= 24.0 * 7.0 {
        0.75
    } else if age_hours <= 24.0 * 30.0 {
        0.6
    } else if age_hours <= 24.0 * 90.0 {
        0.4
    } else if age_hours <= 24.0 * 365.0 {
        0.2
    } else {
        0.1
    }
}

/// Popularity from the injected tracker when available, else log-scaled
/// `access_count`, else a 0-10 `importance` field. Unknown records are
/// neutral.
#[must_use]
pub fn popularity_score(record: &ResourceRecord, provider: Option<&dyn PopularityProvider>) -> f64 {
    if let (Some(provider), Some(id)) = (provider, record.id.as_deref()) {
        if let Some(score) = provider.popularity(id) {
            return score.clamp(0.0, 1.0);
        }
    }

    if let Some(count) = record.field_f64("access_count") {
        if count >= 0.0 {
            return ((1.0 + count).ln() / (1001.0_f64).ln()).clamp(0.0, 1.0);
        }
    }
    if let Some(importance) = record.field_f64("importance") {
        return (importance / 10.0).clamp(0.0, 1.0);
    }

    NEUTRAL
}

/// How well the record matches a user's typical access patterns. Scores
/// neutral when no profile is available.
#[must_use]
pub fn user_context_score(record: &ResourceRecord, profile: Option<&UserProfile>) -> f64 {
    let Some(profile) = profile else {
        return NEUTRAL;
    };

    let mut score: f64 = 0.0;
    if let Some(org) = &record.organization {
        if profile
            .typical_organizations
            .iter()
            .any(|o| o.eq_ignore_ascii_case(org))
        {
            score += 0.4;
        }
    }
    if profile
        .typical_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&record.resource_type))
    {
        score += 0.3;
    }
    if let Some(id) = &record.id {
        if profile.recent_item_ids.iter().any(|r| r == id) {
            score += 0.3;
        }
    }
    score.clamp(0.0, 1.0)
}

/// Static priority of a result type: credentials first, generic records
/// last.
#[must_use]
pub fn type_priority(resource_type: &str) -> f64 {
    match resource_type.to_lowercase().as_str() {
        "password" => 0.95,
        "configuration" => 0.85,
        "organization" => 0.80,
        "flexible_asset" => 0.75,
        "document" => 0.70,
        "contact" => 0.65,
        "location" => 0.60,
        _ => 0.50,
    }
}

/// Fraction of [`IMPORTANT_FIELDS`] present and non-empty.
#[must_use]
pub fn completeness_score(record: &ResourceRecord) -> f64 {
    let present = IMPORTANT_FIELDS
        .iter()
        .filter(|field| match **field {
            "id" => record.id.as_deref().is_some_and(|v| !v.trim().is_empty()),
            "name" => record.name.as_deref().is_some_and(|v| !v.trim().is_empty()),
            "organization" => record
                .organization
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty()),
            "updated_at" => record
                .updated_at
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty()),
            other => record.field_str(other).is_some(),
        })
        .count();
    present as f64 / IMPORTANT_FIELDS.len() as f64
}

fn parse_datetime_utc(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(&value.replace('Z', "+00:00"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Lowercased concatenation of the record's name, organization and
/// string field values.
fn searchable_text(record: &ResourceRecord) -> String {
    let mut text = String::new();
    for part in [&record.name, &record.organization] {
        if let Some(value) = part {
            text.push_str(&value.to_lowercase());
            text.push(' ');
        }
    }
    for value in record.fields.values() {
        if let Value::String(s) = value {
            text.push_str(&s.to_lowercase());
            text.push(' ');
        }
    }
    text
}
