//! Threads and emails.

use crate::models::{Email, EmailDraft, Thread, ThreadWithEmails};
use crate::StoreContext;
use chrono::{DateTime, Utc};
use pigeon_core::{AppError, AppResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const THREAD_COLUMNS: &str = "id, first_sender, resolved, read, last_email";
const EMAIL_COLUMNS: &str = "id, thread_id, sender, subject, body, message_id, is_reply, date";

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: row.get(0)?,
        first_sender: row.get(1)?,
        resolved: row.get(2)?,
        read: row.get(3)?,
        last_email: row.get(4)?,
    })
}

fn email_from_row(row: &Row<'_>) -> rusqlite::Result<Email> {
    let date: String = row.get(7)?;
    let date = DateTime::parse_from_rfc3339(&date)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Email {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        sender: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        message_id: row.get(5)?,
        is_reply: row.get(6)?,
        date,
    })
}

pub fn create_thread(conn: &Connection, first_sender: &str) -> AppResult<Thread> {
    conn.execute(
        "INSERT INTO threads (first_sender) VALUES (?1)",
        params![first_sender],
    )
    .store_err("create thread")?;
    get_thread(conn, conn.last_insert_rowid())
}

pub fn find_thread(conn: &Connection, id: i64) -> AppResult<Option<Thread>> {
    conn.query_row(
        &format!("SELECT {} FROM threads WHERE id = ?1", THREAD_COLUMNS),
        params![id],
        thread_from_row,
    )
    .optional()
    .store_err("load thread")
}

pub fn get_thread(conn: &Connection, id: i64) -> AppResult<Thread> {
    find_thread(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Thread {}", id)))
}

/// Unresolved threads first, then by most recent email.
pub fn list_threads(conn: &Connection) -> AppResult<Vec<Thread>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM threads
             ORDER BY resolved ASC, last_email IS NULL, last_email DESC, id DESC",
            THREAD_COLUMNS
        ))
        .store_err("prepare thread query")?;
    let rows = stmt
        .query_map([], thread_from_row)
        .store_err("query threads")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .store_err("read thread")
}

/// [`list_threads`] with each thread's emails.
pub fn list_threads_with_emails(conn: &Connection) -> AppResult<Vec<ThreadWithEmails>> {
    list_threads(conn)?
        .into_iter()
        .map(|thread| {
            let emails = thread_emails(conn, thread.id)?;
            Ok(ThreadWithEmails { thread, emails })
        })
        .collect()
}

fn update_thread_flag(conn: &Connection, id: i64, column: &str, value: bool) -> AppResult<()> {
    let changed = conn
        .execute(
            &format!("UPDATE threads SET {} = ?1 WHERE id = ?2", column),
            params![value, id],
        )
        .store_err("update thread")?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Thread {}", id)));
    }
    Ok(())
}

pub fn set_resolved(conn: &Connection, id: i64, resolved: bool) -> AppResult<()> {
    update_thread_flag(conn, id, "resolved", resolved)
}

pub fn set_read(conn: &Connection, id: i64, read: bool) -> AppResult<()> {
    update_thread_flag(conn, id, "read", read)
}

pub fn set_last_email(conn: &Connection, thread_id: i64, email_id: Option<i64>) -> AppResult<()> {
    conn.execute(
        "UPDATE threads SET last_email = ?1 WHERE id = ?2",
        params![email_id, thread_id],
    )
    .store_err("update last email")?;
    Ok(())
}

/// Delete a thread; its emails and their responses cascade.
pub fn delete_thread(conn: &Connection, id: i64) -> AppResult<()> {
    let removed = conn
        .execute("DELETE FROM threads WHERE id = ?1", params![id])
        .store_err("delete thread")?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("Thread {}", id)));
    }
    Ok(())
}

pub fn insert_email(conn: &Connection, thread_id: i64, draft: &EmailDraft) -> AppResult<Email> {
    conn.execute(
        "INSERT INTO emails (thread_id, sender, subject, body, message_id, is_reply, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            thread_id,
            draft.sender,
            draft.subject,
            draft.body,
            draft.message_id,
            draft.is_reply,
            draft.date.to_rfc3339(),
        ],
    )
    .store_err("insert email")?;
    get_email(conn, conn.last_insert_rowid())
}

pub fn find_email(conn: &Connection, id: i64) -> AppResult<Option<Email>> {
    conn.query_row(
        &format!("SELECT {} FROM emails WHERE id = ?1", EMAIL_COLUMNS),
        params![id],
        email_from_row,
    )
    .optional()
    .store_err("load email")
}

pub fn get_email(conn: &Connection, id: i64) -> AppResult<Email> {
    find_email(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Email {}", id)))
}

pub fn find_email_by_message_id(conn: &Connection, message_id: &str) -> AppResult<Option<Email>> {
    conn.query_row(
        &format!("SELECT {} FROM emails WHERE message_id = ?1", EMAIL_COLUMNS),
        params![message_id],
        email_from_row,
    )
    .optional()
    .store_err("load email")
}

/// Emails of a thread in arrival order.
pub fn thread_emails(conn: &Connection, thread_id: i64) -> AppResult<Vec<Email>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM emails WHERE thread_id = ?1 ORDER BY id ASC",
            EMAIL_COLUMNS
        ))
        .store_err("prepare email query")?;
    let rows = stmt
        .query_map(params![thread_id], email_from_row)
        .store_err("query emails")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .store_err("read email")
}

/// Delete one email and repoint its thread.
///
/// A thread left without emails is deleted too. Returns whether that
/// happened.
pub fn delete_email(conn: &Connection, id: i64) -> AppResult<bool> {
    let email = get_email(conn, id)?;
    conn.execute("DELETE FROM emails WHERE id = ?1", params![id])
        .store_err("delete email")?;

    let latest: Option<i64> = conn
        .query_row(
            "SELECT MAX(id) FROM emails WHERE thread_id = ?1",
            params![email.thread_id],
            |row| row.get(0),
        )
        .store_err("find latest email")?;

    match latest {
        Some(latest) => {
            set_last_email(conn, email.thread_id, Some(latest))?;
            Ok(false)
        }
        None => {
            delete_thread(conn, email.thread_id)?;
            Ok(true)
        }
    }
}
