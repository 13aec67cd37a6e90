//! Chat command handler.
//!
//! Answers one message, or runs an interactive loop over stdin.

use crate::chatbot::ChatbotHandler;
use clap::Args;
use crimestat_core::{config::AppConfig, AppError, AppResult};
use crimestat_prompt::{list_prompts, resolve_prompt, DEFAULT_PROMPT_ID};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: &[&str] = &["exit", "quit", "salir"];

/// Chat with the assistant
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Message to send; omit for an interactive session
    pub message: Option<String>,

    /// Prompt definition ID
    #[arg(long, default_value = DEFAULT_PROMPT_ID)]
    pub prompt: String,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let prompt = resolve_prompt(&config.workspace, &self.prompt).inspect_err(|_| {
            if let Ok(available) = list_prompts(&config.workspace) {
                tracing::error!("Available prompts: {:?}", available);
            }
        })?;

        let handler = ChatbotHandler::from_config(config, prompt).await?;

        match self.message.as_deref() {
            Some(message) => {
                println!("{}", handler.respond(message).await);
                Ok(())
            }
            None => self.interactive(&handler).await,
        }
    }

    async fn interactive(&self, handler: &ChatbotHandler) -> AppResult<()> {
        println!("{}", handler.data_summary());
        println!();
        println!("Type a question, or 'exit' to quit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await.map_err(AppError::Io)? else {
                break;
            };
            let message = line.trim();

            if message.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&message.to_lowercase().as_str()) {
                break;
            }

            println!("{}", handler.respond(message).await);
            println!();
        }

        Ok(())
    }
}
