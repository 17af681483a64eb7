//! Stats command handler.
//!
//! Shows catalog counts from the store.

use clap::Args;
use ratewise_catalog::store;
use ratewise_core::{config::AppConfig, AppError, AppResult};

/// Show catalog statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    /// Execute the stats command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        if !config.database.exists() {
            return Err(AppError::Config(format!(
                "Catalog database not found: {:?}. Run 'ratewise init' first.",
                config.database
            )));
        }

        let conn = store::open_store(&config.database)?;
        let (instructors, reviews, fragments) = store::store_stats(&conn)?;

        if self.json {
            let output = serde_json::json!({
                "instructors": instructors,
                "reviews": reviews,
                "fragments": fragments,
            });
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("Instructors: {}", instructors);
            println!("Reviews:     {}", reviews);
            println!("Fragments:   {}", fragments);
        }

        Ok(())
    }
}
