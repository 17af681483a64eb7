//! Synthesizer: build the grounded prompt, call the model, parse the reply.
//!
//! The prompt states the instructor's aggregate stats verbatim, lists each
//! retrieved fragment behind its aspect tag, and pins the model to a fixed
//! output shape (`ANALYSIS:` then `EXCERPTS:`). Parsing degrades
//! gracefully: a reply without the expected markers becomes a plain-text
//! analysis with no excerpts — only the model call itself can fail.

use crate::parse::Intent;
use handlebars::Handlebars;
use ratewise_catalog::{Aspect, Instructor, ReviewFragment};
use ratewise_core::{AppError, AppResult};
use ratewise_llm::{LlmClient, LlmRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sampling temperature for synthesis. Low, for factual answers.
pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;

/// Completion size ceiling for synthesis.
pub const SYNTHESIS_MAX_TOKENS: u32 = 400;

const ANALYSIS_MARKER: &str = "ANALYSIS:";
const EXCERPTS_MARKER: &str = "EXCERPTS:";

/// Handlebars template for the synthesis prompt.
const PROMPT_TEMPLATE: &str = r#"Based on the following student review excerpts about {{instructor}} from the {{department}} department, answer this question: "{{question}}"

{{stats}}
Student review excerpts:
{{fragments}}

Answer only about these aspects: {{aspects}}.
Do not assert anything that is not supported by the excerpts above.

Respond in exactly this format:

ANALYSIS:
Your analysis of the requested aspects.

EXCERPTS:
- [aspect] the text of each excerpt you relied on, copied verbatim
"#;

/// System prompt pinning the model to grounded answering.
const SYSTEM_PROMPT: &str = "You analyze student reviews of university instructors. \
Ground every statement in the provided review excerpts and the stats block. \
If the excerpts do not cover something, say so instead of guessing. \
Keep the analysis concise and factual.";

/// A cited excerpt, traceable to the fragment it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Excerpt {
    pub aspect: Aspect,
    pub text: String,
    pub fragment_id: i64,
}

/// The structured answer produced by synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The resolved instructor the answer is about
    pub instructor: Instructor,

    /// The numeric stats block, as included in the prompt
    pub stats: String,

    /// Synthesized prose analysis
    pub analysis: String,

    /// Excerpts the model cited, each mapped back to a real fragment
    pub excerpts: Vec<Excerpt>,
}

/// Build the prompt, invoke the model, and parse the fixed-shape reply.
///
/// Fails only on the model-call boundary (timeout, transport, bad status);
/// an unparseable reply falls back to a marker-free analysis.
pub async fn synthesize(
    client: &dyn LlmClient,
    model: &str,
    intent: &Intent,
    instructor: &Instructor,
    fragments: &[ReviewFragment],
) -> AppResult<Answer> {
    let stats = format_stats(instructor);
    let prompt = build_prompt(intent, instructor, &stats, fragments)?;

    tracing::debug!(
        "Synthesizing answer for {} from {} fragments",
        instructor.full_name(),
        fragments.len()
    );

    let request = LlmRequest::new(prompt, model)
        .with_system(SYSTEM_PROMPT)
        .with_temperature(SYNTHESIS_TEMPERATURE)
        .with_max_tokens(SYNTHESIS_MAX_TOKENS);

    let response = client.complete(&request).await?;

    let (analysis, excerpts) = parse_response(&response.content, fragments);

    Ok(Answer {
        instructor: instructor.clone(),
        stats,
        analysis,
        excerpts,
    })
}

/// Render the instructor's aggregate numeric stats.
pub fn format_stats(instructor: &Instructor) -> String {
    format!(
        "Instructor {} - {}\n\n\
         Basic Stats (out of 4.0):\n\
         • Overall Rating: {:.1}/4\n\
         • Material Clarity: {:.1}/4\n\
         • Recognition of Student Difficulties: {:.1}/4\n\
         • Number of Evaluations: {}\n",
        instructor.full_name(),
        instructor.department,
        instructor.overall_rating,
        instructor.material_clear,
        instructor.student_difficulties,
        instructor.num_evals,
    )
}

/// Render the synthesis prompt from the Handlebars template.
fn build_prompt(
    intent: &Intent,
    instructor: &Instructor,
    stats: &str,
    fragments: &[ReviewFragment],
) -> AppResult<String> {
    let fragment_lines = fragments
        .iter()
        .map(|f| format!("- [{}] {}", f.aspect.label(), f.text))
        .collect::<Vec<_>>()
        .join("\n");

    let aspect_list = intent
        .aspects
        .iter()
        .map(|a| a.label())
        .collect::<Vec<_>>()
        .join(", ");

    let mut variables = HashMap::new();
    variables.insert("question".to_string(), intent.raw_query.clone());
    variables.insert("instructor".to_string(), instructor.full_name());
    variables.insert("department".to_string(), instructor.department.clone());
    variables.insert("stats".to_string(), stats.to_string());
    variables.insert("fragments".to_string(), fragment_lines);
    variables.insert("aspects".to_string(), aspect_list);

    let mut handlebars = Handlebars::new();

    // Plain text prompt, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("synthesis", PROMPT_TEMPLATE)
        .map_err(|e| AppError::Other(format!("Failed to register prompt template: {}", e)))?;

    handlebars
        .render("synthesis", &variables)
        .map_err(|e| AppError::Other(format!("Failed to render prompt template: {}", e)))
}

/// Parse the model's reply into (analysis, cited excerpts).
///
/// A reply without the `ANALYSIS:` marker degrades to the whole text as
/// analysis with no excerpts. Excerpt lines that cannot be traced back to
/// a retrieved fragment are dropped.
fn parse_response(content: &str, fragments: &[ReviewFragment]) -> (String, Vec<Excerpt>) {
    let Some(analysis_at) = content.find(ANALYSIS_MARKER) else {
        tracing::warn!("Model response missing expected shape, using raw text");
        return (content.trim().to_string(), Vec::new());
    };

    let after_analysis = &content[analysis_at + ANALYSIS_MARKER.len()..];

    let (analysis_part, excerpt_part) = match after_analysis.find(EXCERPTS_MARKER) {
        Some(i) => (
            &after_analysis[..i],
            Some(&after_analysis[i + EXCERPTS_MARKER.len()..]),
        ),
        None => (after_analysis, None),
    };

    let analysis = analysis_part.trim().to_string();
    let excerpts = excerpt_part
        .map(|part| parse_excerpts(part, fragments))
        .unwrap_or_default();

    (analysis, excerpts)
}

/// Parse `- [aspect] text` lines, keeping only lines traceable to a real
/// fragment. The cited text is canonicalized to the fragment's own text.
fn parse_excerpts(section: &str, fragments: &[ReviewFragment]) -> Vec<Excerpt> {
    let mut excerpts: Vec<Excerpt> = Vec::new();

    for line in section.lines() {
        let line = line.trim();
        let Some(line) = line
            .strip_prefix('-')
            .or_else(|| line.strip_prefix('•'))
            .map(str::trim)
        else {
            continue;
        };

        let Some((label, text)) = split_tagged_line(line) else {
            continue;
        };

        let Some(aspect) = Aspect::parse_label(label) else {
            tracing::debug!("Dropping excerpt with unknown aspect tag {:?}", label);
            continue;
        };

        let Some(fragment) = find_source_fragment(aspect, text, fragments) else {
            tracing::debug!("Dropping untraceable excerpt {:?}", text);
            continue;
        };

        if excerpts.iter().all(|e| e.fragment_id != fragment.id) {
            excerpts.push(Excerpt {
                aspect: fragment.aspect,
                text: fragment.text.clone(),
                fragment_id: fragment.id,
            });
        }
    }

    excerpts
}

/// Split "[aspect] text" into its parts.
fn split_tagged_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let close = rest.find(']')?;
    let label = &rest[..close];
    let text = rest[close + 1..].trim();
    Some((label, text))
}

/// Locate the retrieved fragment an excerpt line came from.
///
/// Matches on aspect plus case-insensitive text containment in either
/// direction, tolerating a model that trims or lightly truncates.
fn find_source_fragment<'a>(
    aspect: Aspect,
    text: &str,
    fragments: &'a [ReviewFragment],
) -> Option<&'a ReviewFragment> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    fragments.iter().find(|f| {
        if f.aspect != aspect {
            return false;
        }
        let hay = f.text.to_lowercase();
        hay == needle || hay.contains(&needle) || needle.contains(&hay)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use chrono::{TimeZone, Utc};
    use ratewise_catalog::Sentiment;
    use ratewise_core::AppError;
    use ratewise_llm::{LlmResponse, LlmUsage};

    struct MockClient {
        content: String,
    }

    #[async_trait::async_trait]
    impl LlmClient for MockClient {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse {
                content: self.content.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(100, 50),
            })
        }
    }

    struct TimeoutClient;

    #[async_trait::async_trait]
    impl LlmClient for TimeoutClient {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            Err(AppError::LlmTimeout(30))
        }
    }

    fn test_instructor() -> Instructor {
        Instructor {
            id: "i1".to_string(),
            first_name: "Theresa".to_string(),
            last_name: "Migler".to_string(),
            department: "CSC".to_string(),
            overall_rating: 3.8,
            material_clear: 3.6,
            student_difficulties: 3.2,
            num_evals: 41,
        }
    }

    fn test_fragments() -> Vec<ReviewFragment> {
        vec![
            ReviewFragment {
                id: 1,
                review_id: "r1".to_string(),
                instructor_id: "i1".to_string(),
                course_code: "CSC 349".to_string(),
                aspect: Aspect::GradingExams,
                sentiment: Sentiment::Negative,
                text: "The exams were long but fair".to_string(),
                token_count: 7,
                post_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            },
            ReviewFragment {
                id: 2,
                review_id: "r2".to_string(),
                instructor_id: "i1".to_string(),
                course_code: "CSC 349".to_string(),
                aspect: Aspect::Workload,
                sentiment: Sentiment::Neutral,
                text: "Weekly problem sets take a few hours".to_string(),
                token_count: 8,
                post_date: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            },
        ]
    }

    #[test]
    fn test_stats_block_contents() {
        let stats = format_stats(&test_instructor());
        assert!(stats.contains("Instructor Theresa Migler - CSC"));
        assert!(stats.contains("Overall Rating: 3.8/4"));
        assert!(stats.contains("Material Clarity: 3.6/4"));
        assert!(stats.contains("Number of Evaluations: 41"));
    }

    #[test]
    fn test_prompt_contents() {
        let intent = parse("How is Theresa Migler's grading?");
        let instructor = test_instructor();
        let fragments = test_fragments();
        let stats = format_stats(&instructor);

        let prompt = build_prompt(&intent, &instructor, &stats, &fragments).unwrap();

        assert!(prompt.contains("How is Theresa Migler's grading?"));
        assert!(prompt.contains(&stats));
        assert!(prompt.contains("- [grading_exams] The exams were long but fair"));
        assert!(prompt.contains("- [workload] Weekly problem sets"));
        assert!(prompt.contains("these aspects: grading_exams"));
        assert!(prompt.contains("ANALYSIS:"));
        assert!(prompt.contains("EXCERPTS:"));
    }

    #[test]
    fn test_parse_well_formed_response() {
        let fragments = test_fragments();
        let content = "ANALYSIS:\nExams are long but fair overall.\n\nEXCERPTS:\n- [grading_exams] The exams were long but fair\n";

        let (analysis, excerpts) = parse_response(content, &fragments);
        assert_eq!(analysis, "Exams are long but fair overall.");
        assert_eq!(excerpts.len(), 1);
        assert_eq!(excerpts[0].fragment_id, 1);
        assert_eq!(excerpts[0].aspect, Aspect::GradingExams);
    }

    #[test]
    fn test_fabricated_excerpt_is_dropped() {
        let fragments = test_fragments();
        let content = "ANALYSIS:\nSome analysis.\n\nEXCERPTS:\n- [grading_exams] Exams are impossible and everyone fails\n";

        let (_, excerpts) = parse_response(content, &fragments);
        assert!(excerpts.is_empty());
    }

    #[test]
    fn test_truncated_excerpt_still_traces() {
        let fragments = test_fragments();
        let content =
            "ANALYSIS:\nOk.\n\nEXCERPTS:\n- [grading_exams] the exams were long\n";

        let (_, excerpts) = parse_response(content, &fragments);
        assert_eq!(excerpts.len(), 1);
        // Canonicalized to the fragment's own text
        assert_eq!(excerpts[0].text, "The exams were long but fair");
    }

    #[test]
    fn test_wrong_aspect_tag_is_dropped() {
        let fragments = test_fragments();
        let content =
            "ANALYSIS:\nOk.\n\nEXCERPTS:\n- [workload] The exams were long but fair\n";

        let (_, excerpts) = parse_response(content, &fragments);
        assert!(excerpts.is_empty());
    }

    #[test]
    fn test_unshaped_response_falls_back() {
        let fragments = test_fragments();
        let content = "The instructor is generally well liked.";

        let (analysis, excerpts) = parse_response(content, &fragments);
        assert_eq!(analysis, content);
        assert!(excerpts.is_empty());
    }

    #[test]
    fn test_missing_excerpts_section() {
        let fragments = test_fragments();
        let content = "ANALYSIS:\nJust an analysis, no excerpt list.";

        let (analysis, excerpts) = parse_response(content, &fragments);
        assert_eq!(analysis, "Just an analysis, no excerpt list.");
        assert!(excerpts.is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_produces_answer() {
        let client = MockClient {
            content: "ANALYSIS:\nFair exams.\n\nEXCERPTS:\n- [grading_exams] The exams were long but fair\n".to_string(),
        };
        let intent = parse("How is Theresa Migler's grading?");
        let instructor = test_instructor();
        let fragments = test_fragments();

        let answer = synthesize(&client, "test-model", &intent, &instructor, &fragments)
            .await
            .unwrap();

        assert_eq!(answer.analysis, "Fair exams.");
        assert_eq!(answer.excerpts.len(), 1);
        assert!(answer.stats.contains("Overall Rating: 3.8/4"));
        assert_eq!(answer.instructor.id, "i1");
    }

    #[tokio::test]
    async fn test_synthesize_surfaces_timeout() {
        let intent = parse("How is Theresa Migler's grading?");
        let instructor = test_instructor();
        let fragments = test_fragments();

        let err = synthesize(&TimeoutClient, "test-model", &intent, &instructor, &fragments)
            .await
            .unwrap_err();

        assert!(err.is_model_failure());
    }
}
