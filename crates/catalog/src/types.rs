//! Catalog domain entities.
//!
//! This module defines the persisted data model shared between the offline
//! ingestion/classification collaborators and the online query pipeline.
//! The `Aspect` enumeration (and its keyword table) is the single source of
//! truth for review dimensions: the query parser and the fragment-tag
//! validation both consult it, so the two cannot drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review dimension. Fixed set; offline classifier tags and parsed query
/// aspects are both drawn from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    TeachingStyle,
    GradingExams,
    Workload,
    Accessibility,
    CourseStructure,
    Personality,
    Overall,
}

impl Aspect {
    /// All aspects, in canonical order.
    pub const ALL: [Aspect; 7] = [
        Aspect::TeachingStyle,
        Aspect::GradingExams,
        Aspect::Workload,
        Aspect::Accessibility,
        Aspect::CourseStructure,
        Aspect::Personality,
        Aspect::Overall,
    ];

    /// The snake_case wire label stored in the database and used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Aspect::TeachingStyle => "teaching_style",
            Aspect::GradingExams => "grading_exams",
            Aspect::Workload => "workload",
            Aspect::Accessibility => "accessibility",
            Aspect::CourseStructure => "course_structure",
            Aspect::Personality => "personality",
            Aspect::Overall => "overall",
        }
    }

    /// Parse a wire label. Unknown labels are rejected (used to validate
    /// offline-produced fragment tags at insert time).
    pub fn parse_label(s: &str) -> Option<Aspect> {
        match s.trim().to_lowercase().as_str() {
            "teaching_style" => Some(Aspect::TeachingStyle),
            "grading_exams" => Some(Aspect::GradingExams),
            "workload" => Some(Aspect::Workload),
            "accessibility" => Some(Aspect::Accessibility),
            "course_structure" => Some(Aspect::CourseStructure),
            "personality" => Some(Aspect::Personality),
            "overall" => Some(Aspect::Overall),
            _ => None,
        }
    }

    /// Query keywords that map to this aspect.
    ///
    /// Consulted by the query parser; lowercase, single tokens.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Aspect::TeachingStyle => &[
                "teaching", "teach", "teacher", "lecture", "lectures", "lecturer", "explain",
                "explains", "explanations", "style",
            ],
            Aspect::GradingExams => &[
                "grading", "grade", "grades", "graded", "grader", "exam", "exams", "test",
                "tests", "midterm", "midterms", "final", "finals", "quiz", "quizzes", "curve",
            ],
            Aspect::Workload => &[
                "workload", "homework", "assignment", "assignments", "projects", "busywork",
                "load",
            ],
            Aspect::Accessibility => &[
                "accessible", "accessibility", "approachable", "available", "responsive",
                "email", "emails", "office",
            ],
            Aspect::CourseStructure => &[
                "structure", "structured", "organized", "organization", "syllabus", "schedule",
                "curriculum", "pacing",
            ],
            Aspect::Personality => &[
                "personality", "nice", "friendly", "funny", "rude", "strict", "chill",
                "personable", "mean",
            ],
            Aspect::Overall => &["overall", "general", "recommend", "recommended", "worth"],
        }
    }

    /// Map a single lowercase token to an aspect via the keyword table.
    pub fn from_keyword(token: &str) -> Option<Aspect> {
        Aspect::ALL
            .iter()
            .copied()
            .find(|aspect| aspect.keywords().contains(&token))
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Sentiment label attached to a fragment by the offline classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// The lowercase wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Parse a wire label; unknown labels are rejected.
    pub fn parse_label(s: &str) -> Option<Sentiment> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

/// An instructor with aggregate numeric ratings.
///
/// Immutable once ingested; the online pipeline only reads it. Unique by
/// `id`; names are NOT guaranteed unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    /// Opaque identifier from the rating service
    pub id: String,

    pub first_name: String,
    pub last_name: String,
    pub department: String,

    /// Aggregate ratings on a fixed 0.0-4.0 scale
    pub overall_rating: f64,
    pub material_clear: f64,
    pub student_difficulties: f64,

    /// Number of evaluations behind the aggregates
    pub num_evals: u32,
}

impl Instructor {
    /// Display name ("First Last").
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A course offering. Many-to-many with instructors through reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Course code (e.g. "CSC 349")
    pub code: String,
    pub name: String,
    pub department: String,
}

/// One raw student submission. Owned by exactly one instructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub instructor_id: String,
    pub course_code: String,
    pub grade: String,
    pub grade_level: String,
    pub course_type: String,
    pub rating_text: String,
    pub post_date: DateTime<Utc>,
}

/// An aspect-tagged slice of a review's text — the unit of retrieval.
///
/// Produced by the offline classification pipeline. Owning-review fields
/// (instructor, course, post date) are denormalized here so the retriever's
/// ordering and ownership invariants are checkable without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFragment {
    pub id: i64,
    pub review_id: String,
    pub instructor_id: String,
    pub course_code: String,
    pub aspect: Aspect,
    pub sentiment: Sentiment,
    pub text: String,

    /// Token-count estimate used for retrieval budgeting
    pub token_count: u32,

    /// Post date of the owning review
    pub post_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_label_round_trip() {
        for aspect in Aspect::ALL {
            assert_eq!(Aspect::parse_label(aspect.label()), Some(aspect));
        }
    }

    #[test]
    fn test_aspect_label_rejects_unknown() {
        assert_eq!(Aspect::parse_label("vibes"), None);
        assert_eq!(Aspect::parse_label(""), None);
    }

    #[test]
    fn test_aspect_from_keyword() {
        assert_eq!(Aspect::from_keyword("grading"), Some(Aspect::GradingExams));
        assert_eq!(Aspect::from_keyword("exams"), Some(Aspect::GradingExams));
        assert_eq!(Aspect::from_keyword("homework"), Some(Aspect::Workload));
        assert_eq!(Aspect::from_keyword("organized"), Some(Aspect::CourseStructure));
        assert_eq!(Aspect::from_keyword("nonsense"), None);
    }

    #[test]
    fn test_keywords_are_unambiguous() {
        // No token may map to two aspects; the table is a function.
        let mut seen = std::collections::HashSet::new();
        for aspect in Aspect::ALL {
            for kw in aspect.keywords() {
                assert!(seen.insert(*kw), "keyword {:?} appears twice", kw);
            }
        }
    }

    #[test]
    fn test_sentiment_round_trip() {
        for s in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
            assert_eq!(Sentiment::parse_label(s.label()), Some(s));
        }
        assert_eq!(Sentiment::parse_label("mixed"), None);
    }

    #[test]
    fn test_full_name() {
        let instructor = Instructor {
            id: "i1".to_string(),
            first_name: "Theresa".to_string(),
            last_name: "Migler".to_string(),
            department: "CSC".to_string(),
            overall_rating: 3.8,
            material_clear: 3.6,
            student_difficulties: 3.2,
            num_evals: 41,
        };
        assert_eq!(instructor.full_name(), "Theresa Migler");
    }
}
