//! Disambiguator: decide whether a name reference resolves uniquely.
//!
//! Pure function of (catalog index, intent); repeated calls with identical
//! catalog state and query text produce the identical outcome class.

use crate::parse::Intent;
use ratewise_catalog::{Candidate, CatalogIndex};

/// Score margin by which the top candidate must beat the runner-up to
/// resolve without asking the user.
pub const RESOLVE_MARGIN: f64 = 0.10;

/// How many candidates an ambiguous outcome carries.
pub const MAX_AMBIGUOUS_CANDIDATES: usize = 3;

/// The three-way resolution outcome. Exhaustive: later pipeline stages are
/// only reachable through `Resolved`.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A single instructor matched with sufficient confidence
    Resolved(Candidate),

    /// Multiple plausible instructors; caller should present these
    Ambiguous(Vec<Candidate>),

    /// Nothing scored above the match threshold
    NotFound,
}

/// Resolve an intent's instructor reference against the catalog.
pub fn resolve(intent: &Intent, index: &CatalogIndex) -> Resolution {
    let mut candidates = index.lookup(&intent.name_text, intent.department_hint.as_deref());

    match candidates.len() {
        0 => Resolution::NotFound,
        1 => {
            let only = candidates.remove(0);
            tracing::debug!("Resolved {:?} to {}", intent.name_text, only.name);
            Resolution::Resolved(only)
        }
        _ => {
            let margin = candidates[0].score - candidates[1].score;
            if margin >= RESOLVE_MARGIN {
                let top = candidates.remove(0);
                tracing::debug!(
                    "Resolved {:?} to {} (margin {:.2})",
                    intent.name_text,
                    top.name,
                    margin
                );
                Resolution::Resolved(top)
            } else {
                candidates.truncate(MAX_AMBIGUOUS_CANDIDATES);
                tracing::debug!(
                    "Ambiguous reference {:?}: {} candidates within margin",
                    intent.name_text,
                    candidates.len()
                );
                Resolution::Ambiguous(candidates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use ratewise_catalog::{CatalogIndex, Instructor};

    fn instructor(id: &str, first: &str, last: &str, dept: &str) -> Instructor {
        Instructor {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            department: dept.to_string(),
            overall_rating: 3.0,
            material_clear: 3.0,
            student_difficulties: 3.0,
            num_evals: 5,
        }
    }

    #[test]
    fn test_unique_name_resolves() {
        let index = CatalogIndex::build(&[
            instructor("i1", "Theresa", "Migler", "CSC"),
            instructor("i2", "Hugh", "Smith", "MATH"),
        ]);
        let intent = parse("How is Theresa Migler's grading?");

        match resolve(&intent, &index) {
            Resolution::Resolved(c) => assert_eq!(c.instructor_id, "i1"),
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let index = CatalogIndex::build(&[
            instructor("i1", "John", "Smith", "CSC"),
            instructor("i2", "John", "Smith", "PHIL"),
        ]);
        let intent = parse("Tell me about John Smith");

        match resolve(&intent, &index) {
            Resolution::Ambiguous(candidates) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let index = CatalogIndex::build(&[instructor("i1", "Theresa", "Migler", "CSC")]);
        let intent = parse("Who is Zzyzx Qwerty?");

        assert!(matches!(resolve(&intent, &index), Resolution::NotFound));
    }

    #[test]
    fn test_margin_resolves_over_weak_runner_up() {
        // "Lee Ann" is not an exact form, so both Lees score via token
        // overlap: i1 hits both tokens, i2 only one. The gap exceeds
        // RESOLVE_MARGIN, so this resolves without asking.
        let index = CatalogIndex::build(&[
            instructor("i1", "Ann", "Lee", "CSC"),
            instructor("i2", "Ann", "Chen", "MATH"),
        ]);
        let intent = parse("Tell me about Lee Ann");

        match resolve(&intent, &index) {
            Resolution::Resolved(c) => assert_eq!(c.instructor_id, "i1"),
            other => panic!("expected Resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_is_capped() {
        let index = CatalogIndex::build(&[
            instructor("i1", "John", "Smith", "CSC"),
            instructor("i2", "Jane", "Smith", "PHIL"),
            instructor("i3", "Jim", "Smith", "MATH"),
            instructor("i4", "Joan", "Smith", "BIO"),
        ]);
        let intent = parse("Tell me about Smith");

        match resolve(&intent, &index) {
            Resolution::Ambiguous(candidates) => {
                assert_eq!(candidates.len(), MAX_AMBIGUOUS_CANDIDATES);
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let index = CatalogIndex::build(&[
            instructor("i1", "John", "Smith", "CSC"),
            instructor("i2", "John", "Smith", "PHIL"),
        ]);
        let intent = parse("Tell me about John Smith");

        for _ in 0..3 {
            assert!(matches!(resolve(&intent, &index), Resolution::Ambiguous(_)));
        }
    }
}
