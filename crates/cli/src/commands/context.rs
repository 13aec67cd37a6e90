//! Context command handler.
//!
//! Prints the data context the chat handler would send for a query.

use clap::Args;
use crimestat_core::{config::AppConfig, AppResult};
use crimestat_knowledge::RagSession;

/// Show the retrieved data context for a query
#[derive(Args, Debug)]
pub struct ContextCommand {
    /// Query text
    pub query: String,
}

impl ContextCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing context command");

        let session = RagSession::initialize(&config.workspace, &config.data_dir).await?;
        let context = session.format_context(&self.query).await?;

        println!("{}", context);
        Ok(())
    }
}
