//! Operator actions on threads and emails.

use crate::text::strip_html;
use crate::Inbox;
use pigeon_core::AppResult;
use pigeon_store::responses::{delete_response, response_for_email};
use pigeon_store::threads::{
    delete_email, delete_thread, get_email, get_thread, insert_email, set_last_email, set_read,
    set_resolved, thread_emails,
};
use pigeon_store::{Connection, Email, EmailDraft, Response};

impl Inbox {
    /// Record a reply the operator sent and resolve the thread.
    ///
    /// Delivery happens elsewhere; `message_id` is what the provider
    /// assigned to the sent message. The drafted response stays as is.
    pub fn record_reply(&self, email_id: i64, body: &str, message_id: &str) -> AppResult<Email> {
        let text = strip_html(body)?;

        self.store.write(|conn| {
            let replied_to = get_email(conn, email_id)?;
            let reply = insert_email(
                conn,
                replied_to.thread_id,
                &EmailDraft {
                    sender: self.mail.support_address.clone(),
                    subject: replied_to.subject.clone(),
                    body: text,
                    message_id: message_id.trim().to_string(),
                    is_reply: true,
                    date: chrono::Utc::now(),
                },
            )?;

            set_last_email(conn, replied_to.thread_id, Some(reply.id))?;
            set_resolved(conn, replied_to.thread_id, true)?;

            tracing::info!(
                "Recorded reply {} to email {} in thread {}",
                reply.id,
                email_id,
                replied_to.thread_id
            );
            Ok(reply)
        })
    }

    pub fn resolve(&self, thread_id: i64) -> AppResult<()> {
        self.store.write(|conn| set_resolved(conn, thread_id, true))
    }

    pub fn unresolve(&self, thread_id: i64) -> AppResult<()> {
        self.store.write(|conn| set_resolved(conn, thread_id, false))
    }

    pub fn mark_read(&self, thread_id: i64, read: bool) -> AppResult<()> {
        self.store.write(|conn| set_read(conn, thread_id, read))
    }

    /// Stored response for an email, if one was drafted.
    pub fn response(&self, email_id: i64) -> AppResult<Option<Response>> {
        self.store.read(|conn| {
            get_email(conn, email_id)?;
            response_for_email(conn, email_id)
        })
    }

    /// Delete an email, releasing its response's citations.
    ///
    /// Returns true when the thread was left empty and removed too.
    pub fn delete_email(&self, email_id: i64) -> AppResult<bool> {
        self.store.write(|conn| {
            release_email(conn, email_id)?;
            delete_email(conn, email_id)
        })
    }

    /// Delete a thread, releasing the citations of every response in it.
    pub fn delete_thread(&self, thread_id: i64) -> AppResult<()> {
        self.store.write(|conn| {
            get_thread(conn, thread_id)?;
            for email in thread_emails(conn, thread_id)? {
                release_email(conn, email.id)?;
            }
            delete_thread(conn, thread_id)?;
            tracing::info!("Deleted thread {}", thread_id);
            Ok(())
        })
    }
}

fn release_email(conn: &Connection, email_id: i64) -> AppResult<()> {
    if let Some(response) = response_for_email(conn, email_id)? {
        let purged = delete_response(conn, response.id)?;
        tracing::debug!(
            "Released response {} of email {} ({} documents purged)",
            response.id,
            email_id,
            purged.len()
        );
    }
    Ok(())
}
