//! Prompts command handler.

use clap::Args;
use redraft_core::{config::AppConfig, AppResult};
use redraft_prompt::{list_prompts, resolve_prompt};

/// List available rewrite prompts
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let ids = list_prompts(&config.workspace)?;

        if self.json {
            let output = serde_json::json!({
                "active": config.prompt_id,
                "prompts": ids,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        for id in &ids {
            let marker = if *id == config.prompt_id { "*" } else { " " };
            match resolve_prompt(&config.workspace, id) {
                Ok(prompt) => println!("{} {}  {}", marker, id, prompt.title),
                Err(e) => {
                    tracing::warn!("Skipping invalid prompt {}: {}", id, e);
                    println!("{} {}  (invalid)", marker, id);
                }
            }
        }

        Ok(())
    }
}
