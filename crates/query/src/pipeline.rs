//! Pipeline orchestration: parse, resolve, retrieve, synthesize.
//!
//! One logical task per query; stages are strictly sequential and each may
//! short-circuit with a typed outcome. The catalog index and the store are
//! read-only here, so concurrent queries need no coordination — the model
//! call is the only await point.

use crate::outcome::QueryOutcome;
use crate::parse::parse;
use crate::resolve::{resolve, Resolution};
use crate::retrieve::{retrieve, Retrieval};
use crate::synthesize::synthesize;
use ratewise_catalog::{store, CatalogIndex};
use ratewise_core::{AppError, AppResult};
use ratewise_llm::LlmClient;
use rusqlite::Connection;

/// Resolve a free-text question end to end.
///
/// Store errors propagate as `AppError`; model-call failures are caught
/// and returned as `QueryOutcome::SynthesisFailed` so the caller can
/// render them without losing the rest of the pipeline's work.
pub async fn answer_query(
    conn: &Connection,
    index: &CatalogIndex,
    client: &dyn LlmClient,
    model: &str,
    token_budget: u32,
    question: &str,
) -> AppResult<QueryOutcome> {
    let intent = parse(question);
    tracing::info!(
        "Resolving query: name {:?}, course {:?}, aspects {:?}",
        intent.name_text,
        intent.course,
        intent.aspects
    );

    let candidate = match resolve(&intent, index) {
        Resolution::NotFound => return Ok(QueryOutcome::NotFound),
        Resolution::Ambiguous(candidates) => {
            return Ok(QueryOutcome::Ambiguous { candidates })
        }
        Resolution::Resolved(candidate) => candidate,
    };

    let instructor = store::get_instructor(conn, &candidate.instructor_id)?.ok_or_else(|| {
        AppError::Store(format!(
            "Catalog index references missing instructor: {}",
            candidate.instructor_id
        ))
    })?;

    let fragments = match retrieve(
        conn,
        &instructor.id,
        intent.course.as_deref(),
        &intent.aspects,
        token_budget,
    )? {
        Retrieval::NoData | Retrieval::BudgetExhausted => {
            return Ok(QueryOutcome::NoData {
                aspects: intent.aspects.clone(),
            })
        }
        Retrieval::Selected(fragments) => fragments,
    };

    match synthesize(client, model, &intent, &instructor, &fragments).await {
        Ok(answer) => Ok(QueryOutcome::Answered { answer }),
        Err(e) if e.is_model_failure() => {
            tracing::error!("Synthesis failed: {}", e);
            Ok(QueryOutcome::SynthesisFailed {
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}
