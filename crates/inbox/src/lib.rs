//! Support inbox workflows for Pigeon.
//!
//! Ties the answering pipeline to the relational store: ingesting mail,
//! regenerating drafts, recording operator replies, thread triage and
//! corpus administration. Each workflow commits in a single store
//! transaction, so citation counts never drift from the stored responses.

mod documents;
mod ingest;
pub mod text;
mod threads;
pub mod types;

pub use types::{InboundEmail, IngestOutcome};

use pigeon_core::{AppResult, MailSettings};
use pigeon_knowledge::{history_message, Answerer, EmbeddingConfig};
use pigeon_llm::ChatMessage;
use pigeon_store::{Email, Store};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a corpus re-index unless configured otherwise.
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(60);

/// The support inbox.
pub struct Inbox {
    store: Arc<Store>,
    answerer: Answerer,
    mail: MailSettings,
    index_timeout: Duration,
    manifest: Option<(PathBuf, EmbeddingConfig)>,
}

impl Inbox {
    pub fn new(store: Arc<Store>, answerer: Answerer, mail: MailSettings) -> Self {
        Self {
            store,
            answerer,
            mail,
            index_timeout: DEFAULT_INDEX_TIMEOUT,
            manifest: None,
        }
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    /// Write `config` as the index manifest under `index_dir` after each re-index.
    pub fn with_manifest(mut self, index_dir: PathBuf, config: EmbeddingConfig) -> Self {
        self.manifest = Some((index_dir, config));
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    /// True when `sender` is the support mailbox itself.
    pub fn is_support_sender(&self, sender: &str) -> bool {
        self.mail.is_support_address(sender)
    }

    /// Turn stored emails into chat turns for the generator.
    fn history(&self, emails: &[Email]) -> Vec<ChatMessage> {
        emails
            .iter()
            .map(|email| history_message(&email.sender, &email.body, &self.mail))
            .collect()
    }

    /// Thread list, unresolved first.
    pub fn list_threads(&self) -> AppResult<Vec<pigeon_store::ThreadWithEmails>> {
        self.store.read(pigeon_store::threads::list_threads_with_emails)
    }
}
