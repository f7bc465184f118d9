//! Inbox workflow inputs and outcomes.

use chrono::{DateTime, Utc};
use pigeon_knowledge::CorpusDocument;
use pigeon_store::{Document, Response};
use serde::{Deserialize, Serialize};

/// An email as delivered by the mail provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEmail {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub message_id: String,
    /// Message-id of the email this one replies to
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
}

/// What [`crate::Inbox::ingest`] did with an email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IngestOutcome {
    /// The message-id was already stored; nothing changed
    #[serde(rename_all = "camelCase")]
    Duplicate { email_id: i64 },

    /// Stored and answered
    #[serde(rename_all = "camelCase")]
    Answered {
        thread_id: i64,
        email_id: i64,
        response: Response,
    },
}

impl IngestOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate { .. })
    }
}

pub(crate) fn corpus_document(doc: &Document) -> CorpusDocument {
    CorpusDocument {
        doc_ref: doc.id,
        question: doc.question.clone(),
        content: doc.content.clone(),
        source: doc.source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_email_from_json() {
        let email: InboundEmail = serde_json::from_str(
            r#"{"sender":"ada@mit.edu","subject":"Hi","body":"What is HackMIT?","messageId":"<1@mail>"}"#,
        )
        .unwrap();
        assert_eq!(email.message_id, "<1@mail>");
        assert!(email.in_reply_to.is_none());
    }

    #[test]
    fn test_duplicate_outcome_json() {
        let json = serde_json::to_string(&IngestOutcome::Duplicate { email_id: 3 }).unwrap();
        assert_eq!(json, r#"{"status":"duplicate","emailId":3}"#);
    }
}
