//! Search command handler.
//!
//! Runs a nearest-neighbour query and prints the ranked chunks.

use clap::Args;
use crimestat_core::{config::AppConfig, AppError, AppResult};
use crimestat_knowledge::RagSession;

/// Search the indexed municipality summaries
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to retrieve (default: `top_k` from knowledge.yaml)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let session = RagSession::initialize(&config.workspace, &config.data_dir).await?;
        let top_k = self.top_k.unwrap_or(session.config().top_k);
        tracing::debug!("Searching with top_k = {}", top_k);
        let results = session.search(&self.query, top_k).await?;

        if self.json {
            let output = serde_json::json!({
                "query": self.query,
                "topK": top_k,
                "model": session.provider().model_id(),
                "results": results.iter().map(|r| serde_json::json!({
                    "position": r.position,
                    "distance": r.distance,
                    "municipality": r.chunk.group_key,
                    "kind": r.chunk.kind.as_str(),
                    "text": r.chunk.text,
                    "records": r.chunk.sample_records.len(),
                })).collect::<Vec<_>>(),
            });

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else if results.is_empty() {
            println!("No results.");
        } else {
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {} ({})",
                    i + 1,
                    result.distance,
                    result.chunk.group_key,
                    result.chunk.kind.as_str()
                );
                println!("   {}", result.chunk.text);
            }
        }

        Ok(())
    }
}
