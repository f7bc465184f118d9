//! Store records.

use chrono::{DateTime, Utc};
use pigeon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// An FAQ entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub question: String,
    pub content: String,
    pub source: String,
    pub label: String,
    /// Deletion requested while still cited
    pub to_delete: bool,
    /// Number of responses citing this document
    pub response_count: u32,
}

/// Fields supplied when creating or editing a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    #[serde(default)]
    pub question: String,
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub label: String,
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteOutcome {
    /// Row removed
    Deleted,
    /// Still cited; flagged and removed when the last citation goes
    Deferred,
}

/// Counts from clearing the whole corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearStats {
    pub deleted: usize,
    pub deferred: usize,
}

/// A conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    pub first_sender: String,
    pub resolved: bool,
    pub read: bool,
    pub last_email: Option<i64>,
}

/// A stored email. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: i64,
    pub thread_id: i64,
    pub sender: String,
    pub subject: String,
    pub body: String,
    /// Provider message-id, unique across the store
    pub message_id: String,
    /// Sent by the operator rather than received
    pub is_reply: bool,
    pub date: DateTime<Utc>,
}

/// Fields for a new email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraft {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub message_id: String,
    pub is_reply: bool,
    pub date: DateTime<Utc>,
}

/// A thread with its emails in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadWithEmails {
    #[serde(flatten)]
    pub thread: Thread,
    pub emails: Vec<Email>,
}

/// One cited document occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub document_id: i64,
    pub confidence: f32,
}

/// Fields for writing a response.
///
/// `citations` is flat: the first `docs_per_question[0]` entries belong to
/// `questions[0]`, the next run to `questions[1]`, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDraft {
    pub content: String,
    pub questions: Vec<String>,
    pub docs_per_question: Vec<u32>,
    pub citations: Vec<Citation>,
    pub confidence: f32,
}

impl ResponseDraft {
    /// Build from per-question citation groups.
    pub fn from_groups(
        content: impl Into<String>,
        groups: Vec<(String, Vec<Citation>)>,
        confidence: f32,
    ) -> Self {
        let mut questions = Vec::with_capacity(groups.len());
        let mut docs_per_question = Vec::with_capacity(groups.len());
        let mut citations = Vec::new();
        for (question, cited) in groups {
            questions.push(question);
            docs_per_question.push(cited.len() as u32);
            citations.extend(cited);
        }
        Self {
            content: content.into(),
            questions,
            docs_per_question,
            citations,
            confidence,
        }
    }

    /// Check the flattening invariant.
    pub fn validate(&self) -> AppResult<()> {
        if self.docs_per_question.len() != self.questions.len() {
            return Err(AppError::Store(format!(
                "docs_per_question has {} entries for {} questions",
                self.docs_per_question.len(),
                self.questions.len()
            )));
        }
        let expected: u32 = self.docs_per_question.iter().sum();
        if expected as usize != self.citations.len() {
            return Err(AppError::Store(format!(
                "docs_per_question sums to {} but {} citations given",
                expected,
                self.citations.len()
            )));
        }
        Ok(())
    }

    /// Distinct cited document ids, in first-citation order.
    pub fn distinct_documents(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for citation in &self.citations {
            if !ids.contains(&citation.document_id) {
                ids.push(citation.document_id);
            }
        }
        ids
    }
}

/// A generated answer to one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: i64,
    pub email_id: i64,
    pub content: String,
    pub questions: Vec<String>,
    pub docs_per_question: Vec<u32>,
    /// Cited documents, flattened in question order
    pub documents: Vec<Document>,
    /// Parallel to `documents`
    pub document_confidences: Vec<f32>,
    pub confidence: f32,
    /// 0 for the first answer, +1 per regeneration
    pub revision: u32,
}

/// A document as cited under one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDocument {
    #[serde(flatten)]
    pub document: Document,
    pub confidence: f32,
}

/// Documents cited for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDocuments {
    pub question: String,
    pub documents: Vec<ScoredDocument>,
}

impl Response {
    /// Regroup the flat citation arrays by question.
    pub fn grouped(&self) -> Vec<QuestionDocuments> {
        let available = self.documents.len().min(self.document_confidences.len());
        let mut offset = 0;
        self.questions
            .iter()
            .zip(&self.docs_per_question)
            .map(|(question, &count)| {
                let end = (offset + count as usize).min(available);
                let documents = self.documents[offset..end]
                    .iter()
                    .zip(&self.document_confidences[offset..end])
                    .map(|(document, &confidence)| ScoredDocument {
                        document: document.clone(),
                        confidence,
                    })
                    .collect();
                offset = end;
                QuestionDocuments {
                    question: question.clone(),
                    documents,
                }
            })
            .collect()
    }
}
