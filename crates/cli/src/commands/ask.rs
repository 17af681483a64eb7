//! Ask command handler.
//!
//! Runs the full query-resolution pipeline for one question and renders
//! the typed outcome: an answer with cited excerpts, a disambiguation
//! list, or not-found / no-data guidance.

use clap::Args;
use ratewise_catalog::{store, CatalogIndex};
use ratewise_core::{config::AppConfig, AppError, AppResult};
use ratewise_llm::create_client;
use ratewise_query::{answer_query, QueryOutcome};
use std::path::PathBuf;

/// Ask a question about an instructor
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask (alternative to --file)
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        // 1. Get the question text
        let question = self
            .get_question()
            .ok_or_else(|| AppError::Config("No question provided".to_string()))?;

        // 2. Open the catalog; refuse to answer from a store that was
        // never populated
        if !config.database.exists() {
            return Err(AppError::Config(format!(
                "Catalog database not found: {:?}. Run 'ratewise init' and the offline ingestion pipeline first.",
                config.database
            )));
        }

        let conn = store::open_store(&config.database)?;
        let instructors = store::load_instructors(&conn)?;
        let index = CatalogIndex::build(&instructors);

        tracing::debug!("Catalog index built with {} instructors", index.len());

        // 3. Create the LLM client
        config.validate()?;
        let endpoint = config.resolve_endpoint(&config.provider)?;
        let api_key = config.resolve_api_key(&config.provider)?;

        let client = create_client(
            &config.provider,
            endpoint.as_deref(),
            api_key.as_deref(),
            config.timeout_secs,
        )
        .map_err(AppError::Config)?;

        // 4. Run the pipeline
        let outcome = answer_query(
            &conn,
            &index,
            client.as_ref(),
            &config.model,
            config.token_budget,
            &question,
        )
        .await?;

        // 5. Render
        if self.json {
            let json = serde_json::to_string_pretty(&outcome)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        self.render_text(outcome)
    }

    /// Render the outcome as human-readable text on stdout.
    fn render_text(&self, outcome: QueryOutcome) -> AppResult<()> {
        match outcome {
            QueryOutcome::Answered { answer } => {
                println!("{}", answer.stats);
                println!("{}", answer.analysis);

                if !answer.excerpts.is_empty() {
                    println!("\nReview Excerpts Used:");
                    for excerpt in &answer.excerpts {
                        println!("• [{}] {}", excerpt.aspect.label(), excerpt.text);
                    }
                }

                Ok(())
            }
            QueryOutcome::Ambiguous { candidates } => {
                println!("That name matches more than one instructor. Did you mean:");
                for candidate in &candidates {
                    println!("  - {} ({})", candidate.name, candidate.department);
                }
                Ok(())
            }
            QueryOutcome::NotFound => {
                println!("Instructor not found in the catalog.");
                Ok(())
            }
            QueryOutcome::NoData { aspects } => {
                let labels = aspects
                    .iter()
                    .map(|a| a.label())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("No review excerpts found for: {}.", labels);
                Ok(())
            }
            QueryOutcome::SynthesisFailed { reason } => {
                // The one outcome that is a genuine failure
                Err(AppError::Llm(reason))
            }
        }
    }

    /// Get the question text from argument or file.
    fn get_question(&self) -> Option<String> {
        self.question.clone().or_else(|| {
            self.file.as_ref().and_then(|path| {
                std::fs::read_to_string(path)
                    .map_err(|e| tracing::error!("Failed to read question file: {}", e))
                    .ok()
            })
        })
    }
}
