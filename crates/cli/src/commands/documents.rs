//! Corpus administration commands.

use crate::commands::context::open_inbox;
use crate::commands::{print_json, read_input};
use clap::{Args, Subcommand};
use pigeon_core::{config::AppConfig, AppResult};
use pigeon_store::{DeleteOutcome, NewDocument};
use std::path::PathBuf;

/// Manage the FAQ document corpus
#[derive(Args, Debug)]
pub struct DocumentsCommand {
    #[command(subcommand)]
    pub action: DocumentsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocumentsAction {
    /// Add a document
    Add(DocumentFields),

    /// Add documents from a JSON array of {question, content, source, label}
    Import {
        /// JSON file (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Replace a document's fields
    Edit {
        id: i64,
        #[command(flatten)]
        fields: DocumentFields,
    },

    /// Delete a document (deferred while responses cite it)
    Delete { id: i64 },

    /// Delete every document
    Clear,

    /// List documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the vector index from the corpus
    Reindex,
}

#[derive(Args, Debug)]
pub struct DocumentFields {
    /// Question the document answers
    #[arg(long, default_value = "")]
    pub question: String,

    /// Answer text
    #[arg(long)]
    pub content: String,

    /// Source URL
    #[arg(long, default_value = "")]
    pub source: String,

    /// Free-form label
    #[arg(long, default_value = "")]
    pub label: String,
}

impl From<&DocumentFields> for NewDocument {
    fn from(fields: &DocumentFields) -> Self {
        NewDocument {
            question: fields.question.clone(),
            content: fields.content.clone(),
            source: fields.source.clone(),
            label: fields.label.clone(),
        }
    }
}

impl DocumentsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let inbox = open_inbox(config).await?;

        match &self.action {
            DocumentsAction::Add(fields) => {
                let doc = inbox.add_document(&fields.into())?;
                println!("Added document {}", doc.id);
            }
            DocumentsAction::Import { file } => {
                let docs: Vec<NewDocument> = serde_json::from_str(&read_input(file.as_deref())?)?;
                let stored = inbox.import_documents(&docs)?;
                println!("Imported {} documents", stored.len());
            }
            DocumentsAction::Edit { id, fields } => {
                let doc = inbox.edit_document(*id, &fields.into())?;
                println!("Updated document {}", doc.id);
            }
            DocumentsAction::Delete { id } => match inbox.delete_document(*id)? {
                DeleteOutcome::Deleted => println!("Deleted document {}", id),
                DeleteOutcome::Deferred => println!(
                    "Document {} is cited by stored responses; it will be removed once they are deleted",
                    id
                ),
            },
            DocumentsAction::Clear => {
                let stats = inbox.clear_documents()?;
                println!(
                    "Deleted {} documents, {} deferred until their responses are deleted",
                    stats.deleted, stats.deferred
                );
            }
            DocumentsAction::List { json } => {
                let docs = inbox.list_documents()?;
                if *json {
                    return print_json(&docs);
                }
                for doc in docs {
                    println!(
                        "[{}] {}{} (cited by {})",
                        doc.id,
                        doc.question,
                        if doc.to_delete { " [pending deletion]" } else { "" },
                        doc.response_count
                    );
                }
            }
            DocumentsAction::Reindex => {
                let stats = inbox.reindex().await?;
                println!(
                    "Indexed {} documents into {} in {:.2}s",
                    stats.documents, stats.backend, stats.duration_secs
                );
            }
        }

        Ok(())
    }
}
