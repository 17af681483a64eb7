//! In-memory catalog index for instructor name resolution.
//!
//! Built once from the store's instructor projection and queried read-only
//! by the disambiguator. Three-tier scoring, deterministic for a given
//! catalog and query:
//! 1. exact case-insensitive full-name match (short-circuits at top score)
//! 2. token-set overlap, order-independent ("Smith John" == "John Smith")
//! 3. Jaro-Winkler over the full string, with a hard similarity floor
//!
//! A department hint boosts the score as a tie-breaker; it never filters,
//! so instructors teaching across departments stay reachable.

use crate::types::Instructor;
use serde::{Deserialize, Serialize};

/// Weight applied to the token-overlap fraction. Keeps token matches below
/// exact matches (1.0) and above fuzzy matches.
pub const TOKEN_MATCH_WEIGHT: f64 = 0.9;

/// Weight applied to the Jaro-Winkler similarity.
pub const FUZZY_MATCH_WEIGHT: f64 = 0.8;

/// Jaro-Winkler similarity below which a fuzzy candidate is excluded
/// entirely.
pub const SIMILARITY_FLOOR: f64 = 0.82;

/// Candidates scoring below this are dropped from the result.
pub const MIN_CANDIDATE_SCORE: f64 = 0.45;

/// Score boost when the department hint matches. Tie-breaker, not a filter.
pub const DEPARTMENT_BOOST: f64 = 0.05;

/// A scored match between a name reference and a stored instructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub instructor_id: String,

    /// The matched name form ("First Last")
    pub name: String,

    pub department: String,

    /// Similarity score in (0.0, 1.0]
    pub score: f64,
}

/// One indexed instructor.
#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    display_name: String,
    normalized: String,
    tokens: Vec<String>,
    department: String,
}

/// Queryable projection of instructor identity data.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<IndexEntry>,
}

impl CatalogIndex {
    /// Build the index from the store's instructor projection.
    pub fn build(instructors: &[Instructor]) -> Self {
        let entries = instructors
            .iter()
            .map(|instructor| {
                let display_name = instructor.full_name();
                let tokens: Vec<String> = display_name
                    .split_whitespace()
                    .map(|t| t.to_lowercase())
                    .collect();
                IndexEntry {
                    id: instructor.id.clone(),
                    normalized: tokens.join(" "),
                    display_name,
                    tokens,
                    department: instructor.department.clone(),
                }
            })
            .collect();

        Self { entries }
    }

    /// Number of indexed instructors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up candidates for a name reference, best first.
    ///
    /// Returns an empty list when nothing scores above
    /// `MIN_CANDIDATE_SCORE`. Sorting is total (score desc, then name,
    /// then id) so repeated lookups are reproducible.
    pub fn lookup(&self, name_text: &str, department_hint: Option<&str>) -> Vec<Candidate> {
        let query_tokens: Vec<String> = name_text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        if query_tokens.is_empty() {
            return Vec::new();
        }

        let query = query_tokens.join(" ");

        // Tier 1: exact full-name matches short-circuit. Names are not
        // unique, so several entries can tie at 1.0 and surface as an
        // ambiguity downstream.
        let exact: Vec<Candidate> = self
            .entries
            .iter()
            .filter(|entry| entry.normalized == query)
            .map(|entry| entry.to_candidate(1.0))
            .collect();

        if !exact.is_empty() {
            return sorted(exact);
        }

        let mut candidates: Vec<Candidate> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let base = entry.match_score(&query, &query_tokens)?;
                let score = apply_department_boost(base, &entry.department, department_hint);
                if score >= MIN_CANDIDATE_SCORE {
                    Some(entry.to_candidate(score))
                } else {
                    None
                }
            })
            .collect();

        candidates = sorted(candidates);
        tracing::debug!(
            "Catalog lookup for {:?} produced {} candidates",
            name_text,
            candidates.len()
        );
        candidates
    }
}

impl IndexEntry {
    fn to_candidate(&self, score: f64) -> Candidate {
        Candidate {
            instructor_id: self.id.clone(),
            name: self.display_name.clone(),
            department: self.department.clone(),
            score,
        }
    }

    /// Tier 2/3 score for this entry, or None when excluded.
    fn match_score(&self, query: &str, query_tokens: &[String]) -> Option<f64> {
        // Tier 2: order-independent token overlap
        let hits = query_tokens
            .iter()
            .filter(|qt| self.tokens.contains(qt))
            .count();

        if hits > 0 {
            let fraction = hits as f64 / query_tokens.len() as f64;
            return Some(TOKEN_MATCH_WEIGHT * fraction);
        }

        // Tier 3: fuzzy full-string similarity with a hard floor
        let similarity = strsim::jaro_winkler(query, &self.normalized);
        if similarity >= SIMILARITY_FLOOR {
            Some(FUZZY_MATCH_WEIGHT * similarity)
        } else {
            None
        }
    }
}

/// Apply the department tie-breaker boost, capped at 1.0.
fn apply_department_boost(score: f64, department: &str, hint: Option<&str>) -> f64 {
    match hint {
        Some(hint) if department.eq_ignore_ascii_case(hint.trim()) => {
            (score + DEPARTMENT_BOOST).min(1.0)
        }
        _ => score,
    }
}

/// Total order: score descending, then name, then id.
fn sorted(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.instructor_id.cmp(&b.instructor_id))
    });
    candidates
}
