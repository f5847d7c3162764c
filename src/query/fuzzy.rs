use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::PipelineConfig;
use crate::utils::safe_truncate_ellipsis;

use super::dictionaries::{correct_typo, expand_acronym, is_common_word};
use super::phonetic::{PhoneticAlgorithm, match_phonetic};

/// How a token was matched to its correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Typo,
    Acronym,
    Prefix,
    Substring,
    Levenshtein,
    Phonetic,
}

/// One applied token correction, in query order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCorrection {
    pub original: String,
    pub corrected: String,
    pub confidence: f64,
    pub kind: MatchKind,
}

/// The outcome of fuzzy enhancement for one query.
///
/// `fallback_to_exact` implies `corrected == original`: when the combined
/// confidence drops below the threshold every correction is discarded,
/// not just the weak ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedQuery {
    pub original: String,
    pub corrected: String,
    pub token_corrections: Vec<TokenCorrection>,
    pub overall_confidence: f64,
    pub fallback_to_exact: bool,
}

impl EnhancedQuery {
    fn passthrough(query: &str) -> Self {
        Self {
            original: query.to_string(),
            corrected: query.to_string(),
            token_corrections: Vec::new(),
            overall_confidence: 1.0,
            fallback_to_exact: false,
        }
    }
}

const TYPO_CONFIDENCE: f64 = 0.9;
const ACRONYM_CONFIDENCE: f64 = 0.85;
const PHONETIC_WEIGHT: f64 = 0.8;

/// Corrects noisy operator queries: typo dictionary, acronym expansion,
/// then similarity matching against caller-supplied candidate names.
///
/// Pure given the static dictionaries; identical input yields identical
/// output, and concurrent calls share no mutable state.
pub struct FuzzyEnhancer {
    min_confidence: f64,
    preserve_exact_match: bool,
    enable_phonetic: bool,
}

impl FuzzyEnhancer {
    #[must_use]
    pub fn new(min_confidence: f64, preserve_exact_match: bool, enable_phonetic: bool) -> Self {
        Self {
            min_confidence,
            preserve_exact_match,
            enable_phonetic,
        }
    }

    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.min_confidence,
            config.preserve_exact_match,
            config.enable_phonetic,
        )
    }

    /// Enhance `query` against optional candidate names (organizations,
    /// systems, services). `context` may carry extra session-scoped
    /// candidates (e.g. recently referenced organizations); they are
    /// matched exactly like `candidates`.
    pub fn enhance(
        &self,
        query: &str,
        candidates: &[String],
        context: Option<&[String]>,
    ) -> EnhancedQuery {
        if query.trim().is_empty() {
            return EnhancedQuery::passthrough(query);
        }
        debug!("Enhancing query: {}", safe_truncate_ellipsis(query, 80));

        let extra = context.unwrap_or(&[]);
        let mut corrected_tokens: Vec<String> = Vec::new();
        let mut corrections: Vec<TokenCorrection> = Vec::new();
        let mut overall: f64 = 1.0;

        for token in query.split_whitespace() {
            let lower = token.to_lowercase();

            // Exact candidate hits are preserved untouched.
            if self.preserve_exact_match
                && candidates
                    .iter()
                    .chain(extra.iter())
                    .any(|c| c.eq_ignore_ascii_case(token))
            {
                corrected_tokens.push(token.to_string());
                continue;
            }

            if let Some(fix) = correct_typo(&lower) {
                corrections.push(TokenCorrection {
                    original: token.to_string(),
                    corrected: fix.to_string(),
                    confidence: TYPO_CONFIDENCE,
                    kind: MatchKind::Typo,
                });
                corrected_tokens.push(fix.to_string());
                overall *= TYPO_CONFIDENCE;
                continue;
            }

            if let Some(expansion) = expand_acronym(&lower) {
                corrections.push(TokenCorrection {
                    original: token.to_string(),
                    corrected: expansion.to_string(),
                    confidence: ACRONYM_CONFIDENCE,
                    kind: MatchKind::Acronym,
                });
                corrected_tokens.push(expansion.to_string());
                overall *= ACRONYM_CONFIDENCE;
                continue;
            }

            // Scaffolding words, short tokens and identifiers (hostnames,
            // IPs) are never fuzzy-matched.
            if lower.chars().count() <= 2
                || !lower.chars().all(|c| c.is_ascii_alphabetic())
                || is_common_word(&lower)
            {
                corrected_tokens.push(token.to_string());
                continue;
            }

            // Vowel-less alphabetic tokens are unpronounceable garbage;
            // if one also fails to match a candidate it drags the overall
            // confidence so the query falls back to exact.
            let pronounceable = lower
                .chars()
                .any(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y'));

            match self.best_candidate(&lower, candidates.iter().chain(extra.iter())) {
                Some((candidate, score, kind)) if score >= self.min_confidence => {
                    corrections.push(TokenCorrection {
                        original: token.to_string(),
                        corrected: candidate.clone(),
                        confidence: score,
                        kind,
                    });
                    corrected_tokens.push(candidate);
                    overall *= score;
                }
                Some((_, score, _)) if !pronounceable => {
                    corrected_tokens.push(token.to_string());
                    overall *= score;
                }
                None if !pronounceable => {
                    corrected_tokens.push(token.to_string());
                    overall *= 0.3;
                }
                _ => corrected_tokens.push(token.to_string()),
            }
        }

        let overall = overall.clamp(0.0, 1.0);

        if overall < self.min_confidence && self.preserve_exact_match {
            info!(
                confidence = overall,
                "Low-confidence enhancement, falling back to exact query"
            );
            return EnhancedQuery {
                original: query.to_string(),
                corrected: query.to_string(),
                token_corrections: Vec::new(),
                overall_confidence: overall,
                fallback_to_exact: true,
            };
        }

        EnhancedQuery {
            original: query.to_string(),
            corrected: corrected_tokens.join(" "),
            token_corrections: corrections,
            overall_confidence: overall,
            fallback_to_exact: false,
        }
    }

    /// Best-scoring candidate for a token, or None without candidates.
    /// Ties keep the earliest candidate, so the result is deterministic.
    fn best_candidate<'a, I>(&self, token: &str, candidates: I) -> Option<(String, f64, MatchKind)>
    where
        I: Iterator<Item = &'a String>,
    {
        let mut best: Option<(String, f64, MatchKind)> = None;

        for candidate in candidates {
            let cand_lower = candidate.to_lowercase();
            let (score, kind) = self.score_pair(token, &cand_lower);
            if best.as_ref().is_none_or(|(_, b, _)| score > *b) {
                best = Some((candidate.clone(), score, kind));
            }
        }

        best
    }

    fn score_pair(&self, token: &str, candidate: &str) -> (f64, MatchKind) {
        if token == candidate {
            return (1.0, MatchKind::Exact);
        }

        let token_len = token.chars().count() as f64;
        let cand_len = candidate.chars().count() as f64;
        let ratio = token_len.min(cand_len) / token_len.max(cand_len);

        let mut score = string_similarity(token, candidate);
        let mut kind = MatchKind::Levenshtein;

        if (candidate.starts_with(token) || token.starts_with(candidate))
            && token_len.min(cand_len) >= 3.0
        {
            let prefix_score = 0.75 + 0.2 * ratio;
            if prefix_score > score {
                score = prefix_score;
                kind = MatchKind::Prefix;
            }
        } else if (candidate.contains(token) || token.contains(candidate))
            && token_len.min(cand_len) >= 4.0
        {
            let substring_score = 0.7 + 0.15 * ratio;
            if substring_score > score {
                score = substring_score;
                kind = MatchKind::Substring;
            }
        }

        if self.enable_phonetic {
            let phonetic =
                PHONETIC_WEIGHT * match_phonetic(token, candidate, PhoneticAlgorithm::DoubleMetaphone);
            if phonetic > score {
                score = phonetic;
                kind = MatchKind::Phonetic;
            }
        }

        (score.clamp(0.0, 1.0), kind)
    }
}

impl Default for FuzzyEnhancer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Normalized edit-distance similarity in [0, 1].
fn string_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
