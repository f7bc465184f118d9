//! Prompt inspection command.

use crate::commands::print_json;
use clap::Args;
use pigeon_core::{config::AppConfig, AppResult};
use pigeon_prompt::{list_prompts, load_prompt, PromptOutputSpec};
use serde::Serialize;

/// List the prompts in effect for this workspace
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptEntry {
    id: String,
    title: String,
    overridden: bool,
    output: PromptOutputSpec,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts_dir = config.prompts_dir();
        let mut entries = Vec::new();
        for id in list_prompts(&prompts_dir)? {
            let definition = load_prompt(&prompts_dir, &id)?;
            entries.push(PromptEntry {
                overridden: prompts_dir.join(format!("{}.yml", id)).exists(),
                id,
                title: definition.title,
                output: definition.output,
            });
        }

        if self.json {
            return print_json(&entries);
        }

        for entry in entries {
            println!(
                "{} - {}{}",
                entry.id,
                entry.title,
                if entry.overridden { " (workspace override)" } else { "" }
            );
            if let Some(temperature) = entry.output.temperature {
                println!("    temperature {}", temperature);
            }
            if let Some(max_tokens) = entry.output.max_tokens {
                println!("    max tokens {}", max_tokens);
            }
        }
        Ok(())
    }
}
