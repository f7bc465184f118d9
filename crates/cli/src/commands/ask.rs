//! Ask command handler.
//!
//! Drafts a reply to an email body without storing anything. Useful for
//! checking corpus coverage and persona prompts.

use crate::commands::context::{ensure_index_compatible, open_inbox};
use crate::commands::{print_json, read_input};
use clap::Args;
use pigeon_core::{config::AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Draft a reply to an email body without storing it
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Email body (alternative to --file / stdin)
    pub body: Option<String>,

    /// Read the email body from a file
    #[arg(short, long, conflicts_with = "body")]
    pub file: Option<PathBuf>,

    /// Sender address used by the persona
    #[arg(long, default_value = "someone@example.com")]
    pub sender: String,

    /// Number of documents retrieved per question
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let body = match &self.body {
            Some(body) => body.clone(),
            None => read_input(self.file.as_deref())?,
        };
        if body.trim().is_empty() {
            return Err(AppError::Config("No email body provided".to_string()));
        }

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }

        ensure_index_compatible(&config)?;
        let inbox = open_inbox(&config).await?;
        let answer = inbox.answerer().answer_email(&self.sender, &body, &[]).await?;

        tracing::debug!(
            "Answer: fallback={}, confidence={:.2}, citations={}",
            answer.split.is_fallback(),
            answer.confidence,
            answer.flattened().len()
        );

        if self.json {
            return print_json(&answer);
        }

        println!("{}", answer.reply);
        println!();
        println!("Confidence: {:.2}", answer.confidence);
        if answer.split.is_fallback() {
            println!("(the email could not be split; answered as a single question)");
        }
        for question in &answer.citations {
            println!("- {}", question.question);
            if question.documents.is_empty() {
                println!("    (no documents)");
            }
            for doc in &question.documents {
                println!("    [{}] {:.2}", doc.doc_ref, doc.score);
            }
        }

        Ok(())
    }
}
