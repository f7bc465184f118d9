//! Thread triage commands.

use crate::commands::context::open_inbox;
use crate::commands::print_json;
use clap::{Args, Subcommand};
use pigeon_core::{config::AppConfig, AppResult};

/// Inspect and triage conversation threads
#[derive(Args, Debug)]
pub struct ThreadsCommand {
    #[command(subcommand)]
    pub action: ThreadsAction,
}

#[derive(Subcommand, Debug)]
pub enum ThreadsAction {
    /// List threads, unresolved first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a thread resolved
    Resolve { thread_id: i64 },
    /// Mark a thread unresolved
    Unresolve { thread_id: i64 },
    /// Mark a thread read
    Read { thread_id: i64 },
    /// Mark a thread unread
    Unread { thread_id: i64 },
    /// Delete a thread with its emails and responses
    Delete { thread_id: i64 },
    /// Delete a single email and its response
    DeleteEmail { email_id: i64 },
}

impl ThreadsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let inbox = open_inbox(config).await?;

        match &self.action {
            ThreadsAction::List { json } => {
                let threads = inbox.list_threads()?;
                if *json {
                    return print_json(&threads);
                }
                if threads.is_empty() {
                    println!("No threads");
                }
                for entry in threads {
                    let thread = &entry.thread;
                    let subject = entry
                        .emails
                        .first()
                        .map(|e| e.subject.as_str())
                        .unwrap_or("");
                    println!(
                        "#{} [{}{}] {} ({} emails) {}",
                        thread.id,
                        if thread.resolved { "resolved" } else { "open" },
                        if thread.read { "" } else { ", unread" },
                        thread.first_sender,
                        entry.emails.len(),
                        subject
                    );
                }
            }
            ThreadsAction::Resolve { thread_id } => {
                inbox.resolve(*thread_id)?;
                println!("Thread {} resolved", thread_id);
            }
            ThreadsAction::Unresolve { thread_id } => {
                inbox.unresolve(*thread_id)?;
                println!("Thread {} reopened", thread_id);
            }
            ThreadsAction::Read { thread_id } => inbox.mark_read(*thread_id, true)?,
            ThreadsAction::Unread { thread_id } => inbox.mark_read(*thread_id, false)?,
            ThreadsAction::Delete { thread_id } => {
                inbox.delete_thread(*thread_id)?;
                println!("Thread {} deleted", thread_id);
            }
            ThreadsAction::DeleteEmail { email_id } => {
                if inbox.delete_email(*email_id)? {
                    println!("Email {} deleted; its thread was empty and was removed", email_id);
                } else {
                    println!("Email {} deleted", email_id);
                }
            }
        }

        Ok(())
    }
}
