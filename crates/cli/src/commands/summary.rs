//! Summary command handler.

use clap::Args;
use crimestat_core::{config::AppConfig, AppError, AppResult};
use crimestat_knowledge::summary::render_overview;
use crimestat_knowledge::RagSession;

/// Show what data is loaded
#[derive(Args, Debug)]
pub struct SummaryCommand {
    /// Include per-table column profiles
    #[arg(short, long)]
    pub detailed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SummaryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing summary command");

        let session = RagSession::initialize(&config.workspace, &config.data_dir).await?;
        let snapshot = session.snapshot();

        if self.json {
            let mut output = serde_json::json!({
                "dataLoaded": snapshot.data_loaded,
                "stats": snapshot.stats,
                "chunks": snapshot.chunks.len(),
                "indexReady": snapshot.is_ready(),
                "model": snapshot.model_id,
            });
            if self.detailed {
                output["overview"] = serde_json::to_value(&snapshot.overview)
                    .map_err(|e| AppError::Serialization(e.to_string()))?;
            }

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", session.summary());
            if self.detailed {
                println!();
                println!("{}", render_overview(&snapshot.overview));
            }
        }

        Ok(())
    }
}
