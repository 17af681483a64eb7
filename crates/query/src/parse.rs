//! Query parser: free text to structured intent.
//!
//! `parse` is total — malformed input degrades to a best-guess `Intent`
//! with an empty name reference and the `overall` aspect, it never fails.
//! Extraction is heuristic: a capitalization-based name span guarded by a
//! question-word stoplist, a department-prefix + number course pattern, and
//! the aspect keyword table owned by the `Aspect` enum.

use ratewise_catalog::Aspect;
use serde::{Deserialize, Serialize};

/// Structured result of parsing a free-text query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Raw name reference extracted from the query (may be empty)
    pub name_text: String,

    /// Department hint (course prefix or explicit "X department" phrasing)
    pub department_hint: Option<String>,

    /// Normalized course code (e.g. "CSC 349"), if one was mentioned
    pub course: Option<String>,

    /// Requested aspects in first-seen order; never empty
    pub aspects: Vec<Aspect>,

    /// The original query text, retained for prompt construction
    pub raw_query: String,
}

/// Question words and filler that can never be part of a name, even when
/// sentence-capitalized.
const STOPLIST: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "at", "bad", "be", "but", "can", "class", "course",
    "did", "do", "does", "dr", "for", "from", "good", "has", "have", "her", "him", "his", "how",
    "i", "if", "in", "instructor", "is", "it", "like", "me", "my", "of", "on", "or", "prof",
    "professor", "should", "so", "take", "taking", "teacher", "tell", "that", "the", "their",
    "them", "there", "they", "this", "to", "was", "were", "what", "whats", "when", "which", "who",
    "whos", "why", "will", "with", "would", "you",
];

/// Parse a free-text query into an `Intent`. Never fails.
pub fn parse(text: &str) -> Intent {
    let raw_query = text.to_string();

    let (course, course_parts) = extract_course(text);
    let aspects = extract_aspects(text);
    let name_text = extract_name(text, &course_parts);
    let department_hint = extract_department_hint(text, course.as_deref());

    let intent = Intent {
        name_text,
        department_hint,
        course,
        aspects,
        raw_query,
    };

    tracing::debug!(
        "Parsed query into name {:?}, course {:?}, aspects {:?}",
        intent.name_text,
        intent.course,
        intent.aspects
    );
    intent
}

/// Strip surrounding quotes, punctuation, and possessive suffixes from a
/// whitespace token.
fn clean_token(token: &str) -> &str {
    let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric());
    trimmed
        .strip_suffix("'s")
        .or_else(|| trimmed.strip_suffix("\u{2019}s"))
        .unwrap_or(trimmed)
}

/// Extract a course code: 2-4 letters followed by 2-4 digits (optional
/// trailing section letter), with or without a separating space or hyphen.
///
/// Returns the normalized code ("CSC 349") and the raw parts consumed, so
/// the name extractor can skip them.
fn extract_course(text: &str) -> (Option<String>, Vec<String>) {
    let tokens: Vec<&str> = text.split_whitespace().map(clean_token).collect();

    for (i, token) in tokens.iter().enumerate() {
        // Attached form: "csc349", "CSC349E"
        if let Some((prefix, number)) = split_attached_code(token) {
            return (
                Some(format!("{} {}", prefix.to_uppercase(), number.to_uppercase())),
                vec![token.to_string()],
            );
        }

        // Split form: "CSC 349"
        if is_course_prefix(token, text) {
            if let Some(next) = tokens.get(i + 1) {
                if is_course_number(next) {
                    return (
                        Some(format!("{} {}", token.to_uppercase(), next.to_uppercase())),
                        vec![token.to_string(), next.to_string()],
                    );
                }
            }
        }
    }

    (None, Vec::new())
}

/// "csc349" / "csc-349" -> ("csc", "349")
fn split_attached_code(token: &str) -> Option<(&str, &str)> {
    let letters = token.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if !(2..=4).contains(&letters) || letters == token.len() {
        return None;
    }

    let (prefix, rest) = token.split_at(letters);
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    if is_course_number(rest) {
        Some((prefix, rest))
    } else {
        None
    }
}

/// A plausible department prefix: 2-4 letters, and either written in all
/// caps or not a common English word (so "take 349" is not a course).
fn is_course_prefix(token: &str, original_text: &str) -> bool {
    if !(2..=4).contains(&token.len()) || !token.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    let all_caps = original_text.contains(&token.to_uppercase());
    all_caps || !STOPLIST.contains(&token.to_lowercase().as_str())
}

/// 2-4 digits with an optional trailing section letter ("349", "101a").
fn is_course_number(token: &str) -> bool {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    if !(2..=4).contains(&digits) {
        return false;
    }

    let rest = &token[digits..];
    rest.is_empty() || (rest.len() == 1 && rest.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Scan every token of the whole text against the aspect keyword table,
/// collecting hits in first-seen order. Defaults to `overall`.
fn extract_aspects(text: &str) -> Vec<Aspect> {
    let mut aspects = Vec::new();

    for token in text.split_whitespace() {
        let cleaned = clean_token(token).to_lowercase();
        if let Some(aspect) = Aspect::from_keyword(&cleaned) {
            if !aspects.contains(&aspect) {
                aspects.push(aspect);
            }
        }
    }

    if aspects.is_empty() {
        aspects.push(Aspect::Overall);
    }

    aspects
}

/// Extract the person-name span: the longest first run of capitalized
/// tokens in the first clause that are not stoplist words, aspect
/// keywords, or course-code parts. At most 4 tokens; may be empty.
fn extract_name(text: &str, course_parts: &[String]) -> String {
    let first_clause = text
        .split(['?', '.', '!'])
        .find(|clause| !clause.trim().is_empty())
        .unwrap_or("");

    let mut best: Vec<&str> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for token in first_clause.split_whitespace() {
        let cleaned = clean_token(token);
        let lower = cleaned.to_lowercase();

        let is_name_token = cleaned.chars().next().is_some_and(|c| c.is_uppercase())
            && cleaned.chars().all(|c| c.is_alphabetic() || c == '-')
            && !STOPLIST.contains(&lower.as_str())
            && Aspect::from_keyword(&lower).is_none()
            && !course_parts.iter().any(|p| p.eq_ignore_ascii_case(cleaned));

        if is_name_token && run.len() < 4 {
            run.push(cleaned);
        } else {
            if run.len() > best.len() {
                best = std::mem::take(&mut run);
            } else {
                run.clear();
            }
        }
    }

    if run.len() > best.len() {
        best = run;
    }

    best.join(" ")
}

/// Department hint: course prefix when a course was found, otherwise
/// explicit "X department" / "department of X" phrasing.
fn extract_department_hint(text: &str, course: Option<&str>) -> Option<String> {
    if let Some(course) = course {
        return course.split_whitespace().next().map(|p| p.to_string());
    }

    let tokens: Vec<&str> = text.split_whitespace().map(clean_token).collect();

    for (i, token) in tokens.iter().enumerate() {
        if !token.eq_ignore_ascii_case("department") {
            continue;
        }

        // "the CSC department"
        if i > 0 {
            let prev = tokens[i - 1];
            if !STOPLIST.contains(&prev.to_lowercase().as_str()) && !prev.is_empty() {
                return Some(prev.to_uppercase());
            }
        }

        // "department of Philosophy"
        if let (Some(of), Some(dept)) = (tokens.get(i + 1), tokens.get(i + 2)) {
            if of.eq_ignore_ascii_case("of") && !dept.is_empty() {
                return Some(dept.to_uppercase());
            }
        }
    }

    None
}
