//! Responses and their citations.
//!
//! Citations are stored per occurrence (a document cited under two
//! questions has two rows) but count once toward the document's
//! `response_count`.

use crate::documents::{decrement_response_counts, document_from_row, increment_response_counts};
use crate::models::{Response, ResponseDraft};
use crate::StoreContext;
use pigeon_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};

struct ResponseRow {
    id: i64,
    email_id: i64,
    content: String,
    questions: String,
    docs_per_question: String,
    confidence: f64,
    revision: i64,
}

/// Store a first answer for `email_id` and count its citations.
pub fn insert_response(conn: &Connection, email_id: i64, draft: &ResponseDraft) -> AppResult<Response> {
    draft.validate()?;

    conn.execute(
        "INSERT INTO responses (email_id, content, questions, docs_per_question, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            email_id,
            draft.content,
            serde_json::to_string(&draft.questions)?,
            serde_json::to_string(&draft.docs_per_question)?,
            draft.confidence as f64,
        ],
    )
    .store_err("insert response")?;
    let id = conn.last_insert_rowid();

    attach_citations(conn, id, draft)?;
    tracing::debug!(
        "Stored response {} for email {} citing {} documents",
        id,
        email_id,
        draft.distinct_documents().len()
    );
    get_response(conn, id)
}

/// Overwrite a response in place with a regenerated answer.
///
/// The old citations are released before the new ones are counted.
pub fn replace_response(conn: &Connection, id: i64, draft: &ResponseDraft) -> AppResult<Response> {
    draft.validate()?;

    release_citations(conn, id)?;

    let changed = conn
        .execute(
            "UPDATE responses
             SET content = ?1, questions = ?2, docs_per_question = ?3, confidence = ?4,
                 revision = revision + 1
             WHERE id = ?5",
            params![
                draft.content,
                serde_json::to_string(&draft.questions)?,
                serde_json::to_string(&draft.docs_per_question)?,
                draft.confidence as f64,
                id,
            ],
        )
        .store_err("update response")?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Response {}", id)));
    }

    attach_citations(conn, id, draft)?;
    get_response(conn, id)
}

fn attach_citations(conn: &Connection, response_id: i64, draft: &ResponseDraft) -> AppResult<()> {
    let mut stmt = conn
        .prepare(
            "INSERT INTO response_documents (response_id, position, document_id, confidence)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .store_err("prepare citation insert")?;
    for (position, citation) in draft.citations.iter().enumerate() {
        stmt.execute(params![
            response_id,
            position as i64,
            citation.document_id,
            citation.confidence as f64,
        ])
        .store_err("insert citation")?;
    }

    increment_response_counts(conn, &draft.distinct_documents())
}

/// Drop a response's citation rows and decrement the documents they named.
///
/// Returns ids of documents removed because they were pending deletion.
pub fn release_citations(conn: &Connection, response_id: i64) -> AppResult<Vec<i64>> {
    let ids: Vec<i64> = {
        let mut stmt = conn
            .prepare("SELECT DISTINCT document_id FROM response_documents WHERE response_id = ?1")
            .store_err("prepare citation query")?;
        let rows = stmt
            .query_map(params![response_id], |row| row.get(0))
            .store_err("query citations")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .store_err("read citation")?
    };

    conn.execute(
        "DELETE FROM response_documents WHERE response_id = ?1",
        params![response_id],
    )
    .store_err("delete citations")?;

    decrement_response_counts(conn, &ids)
}

/// Release and delete a response.
pub fn delete_response(conn: &Connection, id: i64) -> AppResult<Vec<i64>> {
    let purged = release_citations(conn, id)?;
    let removed = conn
        .execute("DELETE FROM responses WHERE id = ?1", params![id])
        .store_err("delete response")?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("Response {}", id)));
    }
    Ok(purged)
}

fn load_row(conn: &Connection, column: &str, value: i64) -> AppResult<Option<ResponseRow>> {
    conn.query_row(
        &format!(
            "SELECT id, email_id, content, questions, docs_per_question, confidence, revision
             FROM responses WHERE {} = ?1",
            column
        ),
        params![value],
        |row| {
            Ok(ResponseRow {
                id: row.get(0)?,
                email_id: row.get(1)?,
                content: row.get(2)?,
                questions: row.get(3)?,
                docs_per_question: row.get(4)?,
                confidence: row.get(5)?,
                revision: row.get(6)?,
            })
        },
    )
    .optional()
    .store_err("load response")
}

fn hydrate(conn: &Connection, row: ResponseRow) -> AppResult<Response> {
    let mut stmt = conn
        .prepare(
            "SELECT d.id, d.question, d.content, d.source, d.label, d.to_delete,
                    d.response_count, rd.confidence
             FROM response_documents rd
             JOIN documents d ON d.id = rd.document_id
             WHERE rd.response_id = ?1
             ORDER BY rd.position ASC",
        )
        .store_err("prepare citation query")?;
    let cited = stmt
        .query_map(params![row.id], |r| {
            Ok((document_from_row(r)?, r.get::<_, f64>(7)? as f32))
        })
        .store_err("query citations")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .store_err("read citation")?;

    let (documents, document_confidences) = cited.into_iter().unzip();

    Ok(Response {
        id: row.id,
        email_id: row.email_id,
        content: row.content,
        questions: serde_json::from_str(&row.questions)?,
        docs_per_question: serde_json::from_str(&row.docs_per_question)?,
        documents,
        document_confidences,
        confidence: row.confidence as f32,
        revision: row.revision as u32,
    })
}

pub fn find_response(conn: &Connection, id: i64) -> AppResult<Option<Response>> {
    load_row(conn, "id", id)?
        .map(|row| hydrate(conn, row))
        .transpose()
}

pub fn get_response(conn: &Connection, id: i64) -> AppResult<Response> {
    find_response(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Response {}", id)))
}

pub fn response_for_email(conn: &Connection, email_id: i64) -> AppResult<Option<Response>> {
    load_row(conn, "email_id", email_id)?
        .map(|row| hydrate(conn, row))
        .transpose()
}
