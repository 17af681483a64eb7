//! Init command handler.
//!
//! Creates the catalog database schema. Population is the job of the
//! offline ingestion and classification pipelines; this just sets up the
//! store boundary they write into.

use clap::Args;
use ratewise_catalog::store;
use ratewise_core::{config::AppConfig, AppResult};

/// Initialize the catalog database schema
#[derive(Args, Debug)]
pub struct InitCommand {}

impl InitCommand {
    /// Execute the init command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing init command");

        store::open_store(&config.database)?;

        println!("Catalog initialized at {:?}", config.database);
        Ok(())
    }
}
