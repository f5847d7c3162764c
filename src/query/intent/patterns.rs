use lazy_static::lazy_static;
use regex::Regex;

use super::models::QueryIntent;

/// One weighted scoring group. Regex hits add `weight`, keyword hits add
/// `0.5 * weight`, then any boost whose trigger appears in the query
/// multiplies the accumulated score.
pub struct IntentPattern {
    pub intent: QueryIntent,
    pub regexes: Vec<Regex>,
    pub keywords: &'static [&'static str],
    pub weight: f64,
    pub boosts: &'static [(&'static str, f64)],
}

fn group(
    intent: QueryIntent,
    patterns: &[&str],
    keywords: &'static [&'static str],
    weight: f64,
    boosts: &'static [(&'static str, f64)],
) -> IntentPattern {
    IntentPattern {
        intent,
        // Unparseable patterns are dropped rather than panicking.
        regexes: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
        keywords,
        weight,
        boosts,
    }
}

lazy_static! {
    /// Ordered scoring groups for every classifiable intent. Queries are
    /// lowercased before matching, so patterns are written lowercase.
    pub static ref INTENT_PATTERNS: Vec<IntentPattern> = vec![
        group(
            QueryIntent::PasswordLookup,
            &[
                r"\b(password|passwords|credential|credentials|passphrase)\b",
                r"\b(login|log in|sign in) (details|info|credentials)\b",
            ],
            &["secret", "admin", "vault", "passcode"],
            2.0,
            &[("prod", 1.2), ("urgent", 1.3)],
        ),
        group(
            QueryIntent::ConfigurationLookup,
            &[
                r"\b(config|configuration|configurations|settings)\b",
                r"\bhow is \S+ (set up|configured)\b",
            ],
            &["setup", "spec", "specs", "hardware", "warranty"],
            1.5,
            &[("server", 1.2)],
        ),
        group(
            QueryIntent::NetworkInfo,
            &[
                r"\b(subnet|vlan|gateway|ip address|ip range|dns|dhcp)\b",
                r"\b(network|networks) (for|of|in|map|layout)\b",
            ],
            &["firewall", "router", "switch", "wifi", "wireless"],
            1.5,
            &[("topology", 1.3)],
        ),
        group(
            QueryIntent::OrganizationInfo,
            &[
                r"\b(organization|organisation|company|client|customer) (details|info|profile|overview)\b",
                r"\b(about|tell me about) (the )?(org|organization|client|customer)\b",
            ],
            &["tenant", "account"],
            1.5,
            &[],
        ),
        group(
            QueryIntent::ContactLookup,
            &[
                r"\b(contact|contacts|phone number|email address)\b",
                r"\bwho (is|do i call|manages|owns)\b",
            ],
            &["reach", "call", "escalation"],
            1.5,
            &[],
        ),
        group(
            QueryIntent::LocationLookup,
            &[
                r"\b(location|locations|site|sites|office|offices|datacenter|data center)\b",
                r"\bwhere is\b",
            ],
            &["address", "building", "rack", "floor"],
            1.2,
            &[],
        ),
        group(
            QueryIntent::DocumentSearch,
            &[
                r"\b(document|documents|documentation|runbook|procedure|guide|manual)\b",
                r"\b(how to|how do i|steps to)\b",
            ],
            &["article", "kb", "knowledge", "instructions", "sop"],
            1.5,
            &[("onboarding", 1.2)],
        ),
        group(
            QueryIntent::AssetInventory,
            &[
                r"\b(asset|assets|inventory|devices|workstations|laptops)\b",
                r"\b(list|show|count) all\b",
            ],
            &["serial", "model", "endpoint"],
            1.2,
            &[],
        ),
        group(
            QueryIntent::Troubleshooting,
            &[
                r"\b(down|offline|unreachable|not working|broken|crash|crashed|crashing)\b",
                r"\b(error|errors|failure|failed|failing|issue|issues|problem|problems)\b",
                r"\b(troubleshoot|diagnose|debug)\b",
            ],
            &["outage", "incident", "slow", "timeout", "alert"],
            2.0,
            &[("server", 1.2), ("production", 1.3), ("prod", 1.3)],
        ),
        group(
            QueryIntent::AuditReport,
            &[
                r"\b(audit|compliance|review) (log|logs|trail|report)\b",
                r"\bwho (accessed|viewed|changed|modified)\b",
            ],
            &["audit", "compliance", "soc2"],
            1.5,
            &[],
        ),
        group(
            QueryIntent::ChangeHistory,
            &[
                r"\b(change|changes|changed|modified|updated) (recently|history|log)\b",
                r"\bwhat (changed|was changed|has changed)\b",
            ],
            &["revision", "diff", "history"],
            1.5,
            &[("yesterday", 1.2), ("today", 1.2)],
        ),
        group(
            QueryIntent::AccessRequest,
            &[
                r"\b(grant|request|give|need) (me )?(access|permission|permissions)\b",
                r"\b(onboard|offboard) (user|employee|engineer)\b",
            ],
            &["rights", "role", "mfa"],
            1.8,
            &[],
        ),
        group(
            QueryIntent::BackupStatus,
            &[
                r"\b(backup|backups|restore|snapshot|snapshots)\b",
                r"\blast (successful )?backup\b",
            ],
            &["retention", "recovery", "rpo", "rto"],
            1.5,
            &[("failed", 1.3)],
        ),
        group(
            QueryIntent::LicenseLookup,
            &[
                r"\b(license|licenses|licence|subscription|subscriptions)\b",
                r"\b(seats|renewal|expiry|expiration) (date|count)?\b",
            ],
            &["activation", "key", "entitlement"],
            1.5,
            &[],
        ),
        group(
            QueryIntent::MonitoringStatus,
            &[
                r"\b(monitoring|uptime|health check|heartbeat)\b",
                r"\b(current|live) (status|state)\b",
            ],
            &["nagios", "zabbix", "datadog", "sensor"],
            1.5,
            &[],
        ),
        group(
            QueryIntent::GeneralSearch,
            &[
                r"\b(search|find|look up|lookup|show me|anything about)\b",
            ],
            &["related", "everything"],
            0.8,
            &[],
        ),
    ];
}

/// Accumulated score and matched keywords for one group against a
/// lowercased query.
#[must_use]
pub fn score_group(pattern: &IntentPattern, query: &str) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut matched = Vec::new();

    for regex in &pattern.regexes {
        if let Some(m) = regex.find(query) {
            score += pattern.weight;
            matched.push(m.as_str().to_string());
        }
    }
    for keyword in pattern.keywords {
        if query.contains(keyword) {
            score += 0.5 * pattern.weight;
            matched.push((*keyword).to_string());
        }
    }
    for (trigger, factor) in pattern.boosts {
        if query.contains(trigger) {
            score *= factor;
        }
    }

    (score, matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        for pattern in INTENT_PATTERNS.iter() {
            assert!(!pattern.regexes.is_empty(), "{:?}", pattern.intent);
        }
    }

    #[test]
    fn test_score_group_accumulates() {
        let troubleshooting = INTENT_PATTERNS
            .iter()
            .find(|p| p.intent == QueryIntent::Troubleshooting)
            .unwrap();
        let (score, matched) = score_group(troubleshooting, "server is down and showing errors");
        // Two regex hits at weight 2.0, then the "server" boost.
        assert!((score - 4.8).abs() < 1e-9);
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_score_group_zero_for_unrelated() {
        let passwords = INTENT_PATTERNS
            .iter()
            .find(|p| p.intent == QueryIntent::PasswordLookup)
            .unwrap();
        let (score, matched) = score_group(passwords, "where is the berlin office");
        assert_eq!(score, 0.0);
        assert!(matched.is_empty());
    }
}
