//! Relational store for Pigeon.
//!
//! SQLite holds the authoritative copy of documents, threads, emails and
//! responses. The vector index is rebuilt from here.
//!
//! Operations are free functions over a [`rusqlite::Connection`] so a
//! workflow can compose several of them inside one [`Store::write`]
//! transaction.

pub mod documents;
pub mod models;
pub mod responses;
pub mod schema;
pub mod threads;

pub use models::{
    Citation, ClearStats, DeleteOutcome, Document, Email, EmailDraft, NewDocument,
    QuestionDocuments, Response, ResponseDraft, ScoredDocument, Thread, ThreadWithEmails,
};
pub use rusqlite::Connection;

use pigeon_core::{AppError, AppResult};
use rusqlite::TransactionBehavior;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Handle to the SQLite database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create store directory: {}", e)))?;
        }

        let conn = Connection::open(db_path).store_err("open database")?;
        tracing::debug!("Opened store at {:?}", db_path);
        Self::init(conn)
    }

    /// In-memory database.
    pub fn in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory().store_err("open database")?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .store_err("enable foreign keys")?;
        conn.busy_timeout(Duration::from_secs(5))
            .store_err("set busy timeout")?;
        conn.execute_batch(schema::SCHEMA)
            .store_err("create tables")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("Store lock poisoned".to_string()))
    }

    /// Run read-only queries.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` in an immediate transaction; any error rolls everything back.
    pub fn write<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .store_err("begin transaction")?;
        let value = f(&tx)?;
        tx.commit().store_err("commit transaction")?;
        Ok(value)
    }
}

/// Attach context to SQLite errors.
pub(crate) trait StoreContext<T> {
    fn store_err(self, action: &str) -> AppResult<T>;
}

impl<T> StoreContext<T> for rusqlite::Result<T> {
    fn store_err(self, action: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Store(format!("Failed to {}: {}", action, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".pigeon").join("pigeon.sqlite");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());

        let count = store
            .read(|conn| {
                conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
                    .store_err("count")
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let store = Store::in_memory().unwrap();
        let result: AppResult<()> = store.write(|conn| {
            documents::insert_document(
                conn,
                &NewDocument {
                    question: "q".to_string(),
                    content: "c".to_string(),
                    ..Default::default()
                },
            )?;
            Err(AppError::Other("abort".to_string()))
        });
        assert!(result.is_err());

        let docs = store.read(documents::list_documents).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let store = Store::in_memory().unwrap();
        let result = store.write(|conn| {
            conn.execute(
                "INSERT INTO emails (thread_id, sender, subject, body, message_id, date)
                 VALUES (99, 'a', 's', 'b', 'm', '2024-01-01T00:00:00Z')",
                [],
            )
            .store_err("insert")
        });
        assert!(result.is_err());
    }
}
