//! Mail commands: ingest, regenerate, reply, show a response.

use crate::commands::context::{ensure_index_compatible, open_inbox};
use crate::commands::{print_json, read_input};
use clap::Args;
use pigeon_core::{config::AppConfig, AppResult};
use pigeon_inbox::{InboundEmail, IngestOutcome};
use pigeon_store::Response;
use std::path::PathBuf;

/// Ingest inbound emails from a JSON file or stdin
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// JSON file holding one email object or an array of them (default: stdin)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum InboundBatch {
    One(InboundEmail),
    Many(Vec<InboundEmail>),
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let input = read_input(self.file.as_deref())?;
        let emails = match serde_json::from_str::<InboundBatch>(&input)? {
            InboundBatch::One(email) => vec![email],
            InboundBatch::Many(emails) => emails,
        };
        tracing::info!("Ingesting {} emails", emails.len());

        ensure_index_compatible(config)?;
        let inbox = open_inbox(config).await?;

        let mut outcomes = Vec::with_capacity(emails.len());
        for email in emails {
            let message_id = email.message_id.clone();
            let outcome = inbox.ingest(email).await?;
            if !self.json {
                match &outcome {
                    IngestOutcome::Duplicate { email_id } => {
                        println!("{}: duplicate of email {}", message_id, email_id)
                    }
                    IngestOutcome::Answered {
                        thread_id,
                        email_id,
                        response,
                    } => println!(
                        "{}: email {} in thread {}, confidence {:.2}",
                        message_id, email_id, thread_id, response.confidence
                    ),
                }
            }
            outcomes.push(outcome);
        }

        if self.json {
            print_json(&outcomes)?;
        }
        Ok(())
    }
}

/// Regenerate the drafted response for a thread's latest email
#[derive(Args, Debug)]
pub struct RegenCommand {
    /// Thread id
    pub thread_id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RegenCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        ensure_index_compatible(config)?;
        let inbox = open_inbox(config).await?;
        let response = inbox.regenerate(self.thread_id).await?;

        if self.json {
            print_json(&response)
        } else {
            print_response(&response);
            Ok(())
        }
    }
}

/// Show the drafted response for an email
#[derive(Args, Debug)]
pub struct ResponseCommand {
    /// Email id
    pub email_id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResponseCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let inbox = open_inbox(config).await?;
        let response = inbox.response(self.email_id)?.ok_or_else(|| {
            pigeon_core::AppError::NotFound(format!("Response for email {}", self.email_id))
        })?;

        if self.json {
            print_json(&response)
        } else {
            print_response(&response);
            Ok(())
        }
    }
}

/// Record a reply that was sent to an email and resolve its thread
#[derive(Args, Debug)]
pub struct ReplyCommand {
    /// Id of the email being answered
    pub email_id: i64,

    /// Reply body (default: read from --file or stdin)
    #[arg(long)]
    pub body: Option<String>,

    /// Read the reply body from a file
    #[arg(short, long, conflicts_with = "body")]
    pub file: Option<PathBuf>,

    /// Message-id assigned by the mail provider (generated when omitted)
    #[arg(long)]
    pub message_id: Option<String>,
}

impl ReplyCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let body = match &self.body {
            Some(body) => body.clone(),
            None => read_input(self.file.as_deref())?,
        };
        let message_id = self
            .message_id
            .clone()
            .unwrap_or_else(|| format!("<{}@pigeon>", uuid::Uuid::new_v4()));

        let inbox = open_inbox(config).await?;
        let reply = inbox.record_reply(self.email_id, &body, &message_id)?;
        println!(
            "Recorded reply {} ({}) in thread {}",
            reply.id, reply.message_id, reply.thread_id
        );
        Ok(())
    }
}

fn print_response(response: &Response) {
    println!("{}", response.content);
    println!();
    println!(
        "Confidence: {:.2} (revision {})",
        response.confidence, response.revision
    );

    for group in response.grouped() {
        println!("- {}", group.question);
        if group.documents.is_empty() {
            println!("    (no documents)");
        }
        for scored in group.documents {
            println!(
                "    [{}] {:.2} {}",
                scored.document.id, scored.confidence, scored.document.question
            );
        }
    }
}
