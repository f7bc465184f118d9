//! Documents and citation reference counts.

use crate::models::{ClearStats, DeleteOutcome, Document, NewDocument};
use crate::StoreContext;
use pigeon_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const DOCUMENT_COLUMNS: &str = "id, question, content, source, label, to_delete, response_count";

pub(crate) fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        question: row.get(1)?,
        content: row.get(2)?,
        source: row.get(3)?,
        label: row.get(4)?,
        to_delete: row.get(5)?,
        response_count: row.get::<_, i64>(6)? as u32,
    })
}

pub fn insert_document(conn: &Connection, doc: &NewDocument) -> AppResult<Document> {
    conn.execute(
        "INSERT INTO documents (question, content, source, label) VALUES (?1, ?2, ?3, ?4)",
        params![doc.question, doc.content, doc.source, doc.label],
    )
    .store_err("insert document")?;

    get_document(conn, conn.last_insert_rowid())
}

pub fn find_document(conn: &Connection, id: i64) -> AppResult<Option<Document>> {
    conn.query_row(
        &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
        params![id],
        document_from_row,
    )
    .optional()
    .store_err("load document")
}

pub fn get_document(conn: &Connection, id: i64) -> AppResult<Document> {
    find_document(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Document {}", id)))
}

/// All documents, newest first, including those pending deletion.
pub fn list_documents(conn: &Connection) -> AppResult<Vec<Document>> {
    query_documents(
        conn,
        &format!("SELECT {} FROM documents ORDER BY id DESC", DOCUMENT_COLUMNS),
    )
}

/// Documents that may be indexed and cited, oldest first.
pub fn citable_documents(conn: &Connection) -> AppResult<Vec<Document>> {
    query_documents(
        conn,
        &format!(
            "SELECT {} FROM documents WHERE to_delete = 0 ORDER BY id ASC",
            DOCUMENT_COLUMNS
        ),
    )
}

fn query_documents(conn: &Connection, sql: &str) -> AppResult<Vec<Document>> {
    let mut stmt = conn.prepare(sql).store_err("prepare document query")?;
    let rows = stmt
        .query_map([], document_from_row)
        .store_err("query documents")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .store_err("read document")
}

/// Replace the editable fields of a document.
pub fn update_document(conn: &Connection, id: i64, doc: &NewDocument) -> AppResult<Document> {
    let changed = conn
        .execute(
            "UPDATE documents SET question = ?1, content = ?2, source = ?3, label = ?4
             WHERE id = ?5",
            params![doc.question, doc.content, doc.source, doc.label, id],
        )
        .store_err("update document")?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("Document {}", id)));
    }
    get_document(conn, id)
}

/// Delete now if uncited, otherwise flag for deletion.
pub fn delete_document(conn: &Connection, id: i64) -> AppResult<DeleteOutcome> {
    let removed = conn
        .execute(
            "DELETE FROM documents WHERE id = ?1 AND response_count = 0",
            params![id],
        )
        .store_err("delete document")?;
    if removed > 0 {
        tracing::info!("Deleted document {}", id);
        return Ok(DeleteOutcome::Deleted);
    }

    let flagged = conn
        .execute(
            "UPDATE documents SET to_delete = 1 WHERE id = ?1",
            params![id],
        )
        .store_err("flag document")?;
    if flagged == 0 {
        return Err(AppError::NotFound(format!("Document {}", id)));
    }

    tracing::info!("Document {} is still cited, deletion deferred", id);
    Ok(DeleteOutcome::Deferred)
}

/// Apply [`delete_document`] to every document.
pub fn clear_documents(conn: &Connection) -> AppResult<ClearStats> {
    let deleted = conn
        .execute("DELETE FROM documents WHERE response_count = 0", [])
        .store_err("clear documents")?;
    let deferred = conn
        .execute(
            "UPDATE documents SET to_delete = 1 WHERE response_count > 0",
            [],
        )
        .store_err("flag documents")?;

    tracing::info!(
        "Cleared documents: {} deleted, {} deferred",
        deleted,
        deferred
    );
    Ok(ClearStats { deleted, deferred })
}

/// Add one citing response to each document.
pub fn increment_response_counts(conn: &Connection, ids: &[i64]) -> AppResult<()> {
    let mut stmt = conn
        .prepare("UPDATE documents SET response_count = response_count + 1 WHERE id = ?1")
        .store_err("prepare increment")?;
    for id in ids {
        stmt.execute(params![id]).store_err("increment response count")?;
    }
    Ok(())
}

/// Remove one citing response from each document.
///
/// Documents flagged for deletion whose count reaches zero are removed.
/// Returns the removed ids.
pub fn decrement_response_counts(conn: &Connection, ids: &[i64]) -> AppResult<Vec<i64>> {
    let mut decrement = conn
        .prepare(
            "UPDATE documents SET response_count = MAX(response_count - 1, 0) WHERE id = ?1",
        )
        .store_err("prepare decrement")?;
    let mut purge = conn
        .prepare("DELETE FROM documents WHERE id = ?1 AND to_delete = 1 AND response_count = 0")
        .store_err("prepare purge")?;

    let mut purged = Vec::new();
    for id in ids {
        decrement
            .execute(params![id])
            .store_err("decrement response count")?;
        if purge.execute(params![id]).store_err("purge document")? > 0 {
            purged.push(*id);
        }
    }

    if !purged.is_empty() {
        tracing::info!("Removed documents pending deletion: {:?}", purged);
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn new_doc(question: &str) -> NewDocument {
        NewDocument {
            question: question.to_string(),
            content: format!("{} answer", question),
            source: "https://hackmit.org".to_string(),
            label: "general".to_string(),
        }
    }

    #[test]
    fn test_insert_and_list() {
        let store = Store::in_memory().unwrap();
        let (a, b) = store
            .write(|conn| {
                Ok((
                    insert_document(conn, &new_doc("a"))?,
                    insert_document(conn, &new_doc("b"))?,
                ))
            })
            .unwrap();

        assert_eq!(a.response_count, 0);
        assert!(!a.to_delete);
        assert!(b.id > a.id);

        let listed = store.read(list_documents).unwrap();
        assert_eq!(listed.iter().map(|d| d.id).collect::<Vec<_>>(), vec![b.id, a.id]);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = Store::in_memory().unwrap();
        let err = store
            .write(|conn| update_document(conn, 42, &new_doc("x")))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_uncited_removes_row() {
        let store = Store::in_memory().unwrap();
        let doc = store.write(|conn| insert_document(conn, &new_doc("a"))).unwrap();

        let outcome = store.write(|conn| delete_document(conn, doc.id)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(store.read(|conn| find_document(conn, doc.id)).unwrap().is_none());
    }

    #[test]
    fn test_delete_cited_defers_until_released() {
        let store = Store::in_memory().unwrap();
        let doc = store.write(|conn| insert_document(conn, &new_doc("a"))).unwrap();
        store
            .write(|conn| increment_response_counts(conn, &[doc.id]))
            .unwrap();

        let outcome = store.write(|conn| delete_document(conn, doc.id)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deferred);

        let flagged = store.read(|conn| get_document(conn, doc.id)).unwrap();
        assert!(flagged.to_delete);
        assert_eq!(flagged.response_count, 1);
        assert!(store.read(citable_documents).unwrap().is_empty());

        let purged = store
            .write(|conn| decrement_response_counts(conn, &[doc.id]))
            .unwrap();
        assert_eq!(purged, vec![doc.id]);
        assert!(store.read(|conn| find_document(conn, doc.id)).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = Store::in_memory().unwrap();
        assert!(store
            .write(|conn| delete_document(conn, 7))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_decrement_never_negative() {
        let store = Store::in_memory().unwrap();
        let doc = store.write(|conn| insert_document(conn, &new_doc("a"))).unwrap();
        store
            .write(|conn| decrement_response_counts(conn, &[doc.id, doc.id]))
            .unwrap();
        assert_eq!(
            store.read(|conn| get_document(conn, doc.id)).unwrap().response_count,
            0
        );
    }

    #[test]
    fn test_clear_documents() {
        let store = Store::in_memory().unwrap();
        let cited = store
            .write(|conn| {
                let cited = insert_document(conn, &new_doc("cited"))?;
                insert_document(conn, &new_doc("free"))?;
                increment_response_counts(conn, &[cited.id])?;
                Ok(cited)
            })
            .unwrap();

        let stats = store.write(clear_documents).unwrap();
        assert_eq!(stats, ClearStats { deleted: 1, deferred: 1 });

        let remaining = store.read(list_documents).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, cited.id);
        assert!(remaining[0].to_delete);
    }
}
