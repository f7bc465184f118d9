//! Ingestion and regeneration.

use crate::text::strip_quoted;
use crate::types::{InboundEmail, IngestOutcome};
use crate::Inbox;
use pigeon_core::{AppError, AppResult};
use pigeon_knowledge::Answer;
use pigeon_store::documents::find_document;
use pigeon_store::responses::{insert_response, replace_response, response_for_email};
use pigeon_store::threads::{
    create_thread, find_email_by_message_id, find_thread, get_thread, insert_email,
    set_last_email, set_read, set_resolved, thread_emails,
};
use pigeon_store::{Citation, Connection, EmailDraft, Response, ResponseDraft};

impl Inbox {
    /// Store and answer an inbound email.
    ///
    /// A message-id seen before is a no-op. A reply to a stored email joins
    /// that email's thread; anything else opens a new one. The answer is
    /// generated before the store transaction opens, and the email, its
    /// response and the citation counts are committed together.
    #[tracing::instrument(skip_all, fields(message_id = %email.message_id))]
    pub async fn ingest(&self, email: InboundEmail) -> AppResult<IngestOutcome> {
        let message_id = email.message_id.trim().to_string();
        if message_id.is_empty() {
            return Err(AppError::Other(format!(
                "Inbound email from {} has no message-id",
                email.sender
            )));
        }

        if let Some(existing) = self
            .store
            .read(|conn| find_email_by_message_id(conn, &message_id))?
        {
            tracing::info!("Duplicate email {} ignored", message_id);
            return Ok(IngestOutcome::Duplicate {
                email_id: existing.id,
            });
        }

        let body = strip_quoted(&email.body).trim_end().to_string();

        let parent = match email.in_reply_to.as_deref().map(str::trim) {
            Some(reply_to) if !self.is_support_sender(&email.sender) => self
                .store
                .read(|conn| find_email_by_message_id(conn, reply_to))?,
            _ => None,
        };

        let (thread_id, earlier) = match &parent {
            Some(parent) => {
                let emails = self.store.read(|conn| thread_emails(conn, parent.thread_id))?;
                (Some(parent.thread_id), emails)
            }
            None => (None, Vec::new()),
        };
        let history = self.history(&earlier);

        let answer = self
            .answerer
            .answer_email(&email.sender, &body, &history)
            .await?;

        self.store.write(|conn| {
            if let Some(existing) = find_email_by_message_id(conn, &message_id)? {
                return Ok(IngestOutcome::Duplicate {
                    email_id: existing.id,
                });
            }

            let thread = match thread_id {
                Some(id) => find_thread(conn, id)?,
                None => None,
            };
            let thread = match thread {
                Some(thread) => thread,
                None => create_thread(conn, &email.sender)?,
            };

            let stored = insert_email(
                conn,
                thread.id,
                &EmailDraft {
                    sender: email.sender.clone(),
                    subject: email.subject.clone(),
                    body: body.clone(),
                    message_id: message_id.clone(),
                    is_reply: false,
                    date: email.date,
                },
            )?;

            let draft = response_draft(conn, &answer)?;
            let response = insert_response(conn, stored.id, &draft)?;

            set_last_email(conn, thread.id, Some(stored.id))?;
            set_resolved(conn, thread.id, false)?;
            set_read(conn, thread.id, false)?;

            tracing::info!(
                "Ingested email {} into thread {} (confidence {:.2})",
                stored.id,
                thread.id,
                response.confidence
            );

            Ok(IngestOutcome::Answered {
                thread_id: thread.id,
                email_id: stored.id,
                response,
            })
        })
    }

    /// Re-answer the latest inbound email of a thread in place.
    ///
    /// The old citations are released and the new ones counted in the
    /// same transaction. The thread, an inbound email and its response must
    /// all exist.
    #[tracing::instrument(skip(self))]
    pub async fn regenerate(&self, thread_id: i64) -> AppResult<Response> {
        let (target, earlier, existing) = self.store.read(|conn| {
            get_thread(conn, thread_id)?;
            let mut emails = thread_emails(conn, thread_id)?;

            let position = emails
                .iter()
                .rposition(|email| !email.is_reply)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Inbound email in thread {}", thread_id))
                })?;
            let target = emails.remove(position);
            emails.truncate(position);

            let existing = response_for_email(conn, target.id)?.ok_or_else(|| {
                AppError::NotFound(format!("Response for email {}", target.id))
            })?;
            Ok((target, emails, existing))
        })?;

        let history = self.history(&earlier);
        let answer = self
            .answerer
            .answer_email(&target.sender, &target.body, &history)
            .await?;

        let response = self.store.write(|conn| {
            let draft = response_draft(conn, &answer)?;
            replace_response(conn, existing.id, &draft)
        })?;

        tracing::info!(
            "Regenerated response {} (revision {}, confidence {:.2})",
            response.id,
            response.revision,
            response.confidence
        );
        Ok(response)
    }
}

/// Map an answer's citation trail onto stored documents.
///
/// The index can lag behind the store; refs to documents that are gone or
/// pending deletion are dropped.
fn response_draft(conn: &Connection, answer: &Answer) -> AppResult<ResponseDraft> {
    let mut groups = Vec::with_capacity(answer.citations.len());
    for question in &answer.citations {
        let mut cited = Vec::with_capacity(question.documents.len());
        for doc in &question.documents {
            match find_document(conn, doc.doc_ref)? {
                Some(stored) if !stored.to_delete => cited.push(Citation {
                    document_id: stored.id,
                    confidence: doc.score,
                }),
                Some(_) => tracing::warn!(
                    "Dropping citation of document {} pending deletion; re-index to refresh",
                    doc.doc_ref
                ),
                None => tracing::warn!(
                    "Dropping citation of missing document {}; re-index to refresh",
                    doc.doc_ref
                ),
            }
        }
        groups.push((question.question.clone(), cited));
    }

    Ok(ResponseDraft::from_groups(
        answer.reply.clone(),
        groups,
        answer.confidence,
    ))
}
