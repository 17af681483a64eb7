//! Retriever: select the fragments a synthesis request is grounded on.
//!
//! Eligibility (ownership, course match, aspect filter) is enforced by the
//! store query; this module does the budgeted selection: partition by
//! requested aspect, interleave round-robin so no aspect starves the
//! others, and take greedily while the combined token estimate stays under
//! the budget.

use ratewise_catalog::{store, Aspect, ReviewFragment};
use ratewise_core::AppResult;
use rusqlite::Connection;
use std::collections::VecDeque;

/// Outcome of fragment retrieval.
///
/// `NoData` and `BudgetExhausted` are distinct states (nothing tagged vs
/// nothing that fits), but callers render both as a no-data outcome.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// Fragments selected for synthesis, interleaved across aspects
    Selected(Vec<ReviewFragment>),

    /// No eligible fragments for this instructor/course/aspect combination
    NoData,

    /// Eligible fragments exist but none fit the token budget
    BudgetExhausted,
}

/// Retrieve the most relevant fragments for a resolved query.
pub fn retrieve(
    conn: &Connection,
    instructor_id: &str,
    course_code: Option<&str>,
    aspects: &[Aspect],
    budget: u32,
) -> AppResult<Retrieval> {
    let eligible = store::eligible_fragments(conn, instructor_id, course_code, aspects)?;

    if eligible.is_empty() {
        tracing::debug!(
            "No fragments for instructor {} (course {:?}, aspects {:?})",
            instructor_id,
            course_code,
            aspects
        );
        return Ok(Retrieval::NoData);
    }

    let total_eligible = eligible.len();
    let selected = select_within_budget(eligible, aspects, budget);

    if selected.is_empty() {
        tracing::debug!(
            "{} eligible fragments, none fit budget {}",
            total_eligible,
            budget
        );
        return Ok(Retrieval::BudgetExhausted);
    }

    tracing::debug!(
        "Selected {}/{} fragments within budget {}",
        selected.len(),
        total_eligible,
        budget
    );
    Ok(Retrieval::Selected(selected))
}

/// Round-robin budgeted selection.
///
/// Fragments arrive newest-review-first; partitioning preserves that order
/// within each aspect. A fragment that would overflow the budget is
/// skipped, not a stopping point — a smaller, older fragment may still fit.
fn select_within_budget(
    fragments: Vec<ReviewFragment>,
    aspects: &[Aspect],
    budget: u32,
) -> Vec<ReviewFragment> {
    let mut partitions = partition_by_aspect(fragments, aspects);

    let mut selected = Vec::new();
    let mut spent: u32 = 0;

    while partitions.iter().any(|p| !p.is_empty()) {
        for partition in partitions.iter_mut() {
            if let Some(fragment) = partition.pop_front() {
                if spent + fragment.token_count <= budget {
                    spent += fragment.token_count;
                    selected.push(fragment);
                }
            }
        }
    }

    selected
}

/// Partition fragments by requested aspect, preserving recency order.
///
/// An unrestricted request (empty or just `overall`) yields a single
/// partition, so selection degenerates to plain recency-ordered take.
fn partition_by_aspect(
    fragments: Vec<ReviewFragment>,
    aspects: &[Aspect],
) -> Vec<VecDeque<ReviewFragment>> {
    let unrestricted = aspects.is_empty() || aspects == [Aspect::Overall];
    if unrestricted {
        return vec![fragments.into()];
    }

    let mut partitions: Vec<VecDeque<ReviewFragment>> =
        aspects.iter().map(|_| VecDeque::new()).collect();

    for fragment in fragments {
        if let Some(slot) = aspects.iter().position(|a| *a == fragment.aspect) {
            partitions[slot].push_back(fragment);
        }
    }

    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ratewise_catalog::{store, Course, Instructor, Review, Sentiment};
    use tempfile::NamedTempFile;

    fn fragment(id: i64, aspect: Aspect, tokens: u32, year: i32) -> ReviewFragment {
        ReviewFragment {
            id,
            review_id: format!("r{}", id),
            instructor_id: "i1".to_string(),
            course_code: "CSC 349".to_string(),
            aspect,
            sentiment: Sentiment::Neutral,
            text: format!("fragment {}", id),
            token_count: tokens,
            post_date: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_budget_is_never_exceeded() {
        let fragments = vec![
            fragment(1, Aspect::Workload, 50, 2024),
            fragment(2, Aspect::Workload, 50, 2023),
            fragment(3, Aspect::Workload, 50, 2022),
        ];

        let selected = select_within_budget(fragments, &[Aspect::Workload], 100);
        let total: u32 = selected.iter().map(|f| f.token_count).sum();
        assert!(total <= 100);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_round_robin_interleaves_aspects() {
        // Two aspects, three fragments each, budget fits four: at least one
        // fragment from each aspect must appear.
        let fragments = vec![
            fragment(1, Aspect::Workload, 25, 2024),
            fragment(2, Aspect::Workload, 25, 2023),
            fragment(3, Aspect::Workload, 25, 2022),
            fragment(4, Aspect::GradingExams, 25, 2024),
            fragment(5, Aspect::GradingExams, 25, 2023),
            fragment(6, Aspect::GradingExams, 25, 2022),
        ];

        let aspects = [Aspect::Workload, Aspect::GradingExams];
        let selected = select_within_budget(fragments, &aspects, 100);

        assert_eq!(selected.len(), 4);
        assert!(selected.iter().any(|f| f.aspect == Aspect::Workload));
        assert!(selected.iter().any(|f| f.aspect == Aspect::GradingExams));
        // Alternating order, newest first within each aspect
        assert_eq!(selected[0].id, 1);
        assert_eq!(selected[1].id, 4);
    }

    #[test]
    fn test_oversized_fragment_is_skipped_not_terminal() {
        let fragments = vec![
            fragment(1, Aspect::Workload, 500, 2024),
            fragment(2, Aspect::Workload, 30, 2023),
        ];

        let selected = select_within_budget(fragments, &[Aspect::Workload], 100);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 2);
    }

    #[test]
    fn test_unrestricted_request_single_partition() {
        let fragments = vec![
            fragment(1, Aspect::Workload, 10, 2024),
            fragment(2, Aspect::Personality, 10, 2023),
        ];

        let selected = select_within_budget(fragments, &[Aspect::Overall], 100);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, 1);
    }

    fn seeded_store() -> (NamedTempFile, Connection) {
        let tmp = NamedTempFile::new().unwrap();
        let conn = store::open_store(tmp.path()).unwrap();

        store::insert_instructor(
            &conn,
            &Instructor {
                id: "i1".to_string(),
                first_name: "Theresa".to_string(),
                last_name: "Migler".to_string(),
                department: "CSC".to_string(),
                overall_rating: 3.8,
                material_clear: 3.6,
                student_difficulties: 3.2,
                num_evals: 41,
            },
        )
        .unwrap();

        store::insert_course(
            &conn,
            &Course {
                code: "CSC 349".to_string(),
                name: "Design and Analysis of Algorithms".to_string(),
                department: "CSC".to_string(),
            },
        )
        .unwrap();

        store::insert_review(
            &conn,
            &Review {
                id: "r1".to_string(),
                instructor_id: "i1".to_string(),
                course_code: "CSC 349".to_string(),
                grade: "B".to_string(),
                grade_level: "Junior".to_string(),
                course_type: "Required".to_string(),
                rating_text: "text".to_string(),
                post_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            },
        )
        .unwrap();

        store::insert_fragment(&conn, "r1", "grading_exams", "negative", "hard exams", 5)
            .unwrap();

        (tmp, conn)
    }

    #[test]
    fn test_retrieve_no_data_for_untagged_aspect() {
        let (_tmp, conn) = seeded_store();
        let result = retrieve(&conn, "i1", None, &[Aspect::Workload], 100).unwrap();
        assert!(matches!(result, Retrieval::NoData));
    }

    #[test]
    fn test_retrieve_budget_exhausted_is_distinct() {
        let (_tmp, conn) = seeded_store();
        let result = retrieve(&conn, "i1", None, &[Aspect::GradingExams], 2).unwrap();
        assert!(matches!(result, Retrieval::BudgetExhausted));
    }

    #[test]
    fn test_retrieve_respects_ownership() {
        let (_tmp, conn) = seeded_store();
        let result = retrieve(&conn, "other", None, &[], 100).unwrap();
        assert!(matches!(result, Retrieval::NoData));
    }

    #[test]
    fn test_retrieve_selects_fragments() {
        let (_tmp, conn) = seeded_store();
        match retrieve(&conn, "i1", Some("CSC 349"), &[Aspect::GradingExams], 100).unwrap() {
            Retrieval::Selected(fragments) => {
                assert_eq!(fragments.len(), 1);
                assert_eq!(fragments[0].text, "hard exams");
            }
            other => panic!("expected Selected, got {:?}", other),
        }
    }
}
