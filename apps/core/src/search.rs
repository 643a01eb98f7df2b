use serde::{Deserialize, Serialize};

use crate::fuzzy::FuzzyMatcher;
use crate::model::CanonicalRecord;
use crate::normalize::Normalizer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchTier {
    /// Approximate AND-of-tokens over name/code/barcode, falling back to exact
    /// substrings of the concatenated key when nothing matches.
    FuzzyWithFallback { threshold: f64 },
    /// Exact AND-of-tokens, each token a substring of name, code or barcode.
    ExactOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Normalized queries shorter than this browse instead of searching.
    pub browse_min_chars: usize,
    pub browse_limit: usize,
    pub display_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Browse,
    Fuzzy,
    Fallback,
    Exact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<'a> {
    pub mode: MatchMode,
    /// Matches before the display cap (dataset size when browsing).
    pub total: usize,
    pub hits: Vec<&'a CanonicalRecord>,
}

impl SearchOutcome<'_> {
    pub fn is_truncated(&self) -> bool {
        self.total > self.hits.len()
    }
}

struct IndexedFields {
    name: Vec<char>,
    code: Vec<char>,
    barcode: Vec<char>,
}

pub struct SearchIndex {
    records: Vec<CanonicalRecord>,
    fields: Vec<IndexedFields>,
    tier: SearchTier,
    limits: SearchLimits,
    normalizer: Normalizer,
}

impl SearchIndex {
    pub fn build(
        records: Vec<CanonicalRecord>,
        tier: SearchTier,
        limits: SearchLimits,
        normalizer: Normalizer,
    ) -> Self {
        let fields = match tier {
            SearchTier::FuzzyWithFallback { .. } => records
                .iter()
                .map(|record| IndexedFields {
                    name: record.normalized_name().chars().collect(),
                    code: record.normalized_code().chars().collect(),
                    barcode: record.normalized_barcode().chars().collect(),
                })
                .collect(),
            SearchTier::ExactOnly => Vec::new(),
        };

        Self {
            records,
            fields,
            tier,
            limits,
            normalizer,
        }
    }

    pub fn empty(tier: SearchTier, limits: SearchLimits, normalizer: Normalizer) -> Self {
        Self::build(Vec::new(), tier, limits, normalizer)
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CanonicalRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tier(&self) -> SearchTier {
        self.tier
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    pub fn tokens(&self, query: &str) -> Vec<String> {
        tokenize(&self.normalizer.apply(query))
    }

    pub fn search(&self, query: &str) -> SearchOutcome<'_> {
        let normalized = self.normalizer.apply(query);
        if normalized.chars().count() < self.limits.browse_min_chars {
            return SearchOutcome {
                mode: MatchMode::Browse,
                total: self.records.len(),
                hits: self.records.iter().take(self.limits.browse_limit).collect(),
            };
        }

        let tokens = tokenize(&normalized);
        match self.tier {
            SearchTier::ExactOnly => self.finish(MatchMode::Exact, self.exact_hits(&tokens)),
            SearchTier::FuzzyWithFallback { threshold } => {
                let fuzzy = self.fuzzy_hits(&tokens, FuzzyMatcher::new(threshold));
                if fuzzy.is_empty() {
                    self.finish(MatchMode::Fallback, self.fallback_hits(&tokens))
                } else {
                    self.finish(MatchMode::Fuzzy, fuzzy)
                }
            }
        }
    }

    fn finish<'a>(&'a self, mode: MatchMode, hits: Vec<&'a CanonicalRecord>) -> SearchOutcome<'a> {
        let total = hits.len();
        let mut hits = hits;
        hits.truncate(self.limits.display_limit);
        SearchOutcome { mode, total, hits }
    }

    fn exact_hits(&self, tokens: &[String]) -> Vec<&CanonicalRecord> {
        self.records
            .iter()
            .filter(|record| {
                tokens.iter().all(|token| {
                    record.normalized_name().contains(token.as_str())
                        || record.normalized_code().contains(token.as_str())
                        || record.normalized_barcode().contains(token.as_str())
                })
            })
            .collect()
    }

    fn fallback_hits(&self, tokens: &[String]) -> Vec<&CanonicalRecord> {
        self.records
            .iter()
            .filter(|record| {
                tokens
                    .iter()
                    .all(|token| record.normalized_all().contains(token.as_str()))
            })
            .collect()
    }

    fn fuzzy_hits(&self, tokens: &[String], matcher: FuzzyMatcher) -> Vec<&CanonicalRecord> {
        let token_chars: Vec<Vec<char>> = tokens.iter().map(|t| t.chars().collect()).collect();

        let mut scored: Vec<(usize, usize)> = self
            .fields
            .iter()
            .enumerate()
            .filter_map(|(position, fields)| {
                score_fields(fields, &token_chars, &matcher).map(|errors| (errors, position))
            })
            .collect();

        scored.sort_unstable();
        scored
            .into_iter()
            .map(|(_, position)| &self.records[position])
            .collect()
    }
}

fn score_fields(fields: &IndexedFields, tokens: &[Vec<char>], matcher: &FuzzyMatcher) -> Option<usize> {
    let mut total = 0;
    for token in tokens {
        let best = [&fields.name, &fields.code, &fields.barcode]
            .into_iter()
            .filter_map(|field| matcher.match_token(token, field))
            .min()?;
        total += best;
    }
    Some(total)
}

pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
