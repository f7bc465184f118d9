//! SQLite-backed vector index with brute-force cosine search.
//!
//! Suitable for small FAQ corpora, local runs and tests.

use crate::vector_index::{check_dimension, cosine_distance, IndexHit, IndexedDocument, VectorIndex};
use pigeon_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteIndex {
    conn: Mutex<Connection>,
    embedding_dim: usize,
}

impl SqliteIndex {
    /// Open (or create) the index database.
    pub fn open(db_path: &Path, embedding_dim: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        Self::with_connection(conn, embedding_dim)
    }

    /// In-memory index.
    pub fn in_memory(embedding_dim: usize) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        Self::with_connection(conn, embedding_dim)
    }

    fn with_connection(conn: Connection, embedding_dim: usize) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                doc_ref INTEGER PRIMARY KEY,
                question TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized SQLite vector index ({} dims)", embedding_dim);

        Ok(Self {
            conn: Mutex::new(conn),
            embedding_dim,
        })
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Index("SQLite index lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteIndex {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn flush(&self) -> AppResult<()> {
        self.lock()?
            .execute("DELETE FROM vectors", [])
            .map_err(|e| AppError::Index(format!("Failed to flush index: {}", e)))?;
        tracing::info!("Flushed SQLite vector index");
        Ok(())
    }

    async fn upsert(&self, documents: &[IndexedDocument]) -> AppResult<()> {
        for doc in documents {
            check_dimension(self.embedding_dim, doc.embedding.len(), "Document embedding")?;
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        for doc in documents {
            tx.execute(
                "INSERT OR REPLACE INTO vectors (doc_ref, question, content, source, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    doc.doc_ref,
                    doc.question,
                    doc.content,
                    doc.source,
                    embedding_to_bytes(&doc.embedding),
                ],
            )
            .map_err(|e| AppError::Index(format!("Failed to insert document: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit documents: {}", e)))?;

        tracing::debug!("Inserted {} documents into SQLite index", documents.len());
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))
            .map_err(|e| AppError::Index(format!("Failed to count rows: {}", e)))?;
        Ok(count as usize)
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        check_dimension(self.embedding_dim, query_embedding.len(), "Query embedding")?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT doc_ref, question, content, source, embedding FROM vectors")
            .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let bytes: Vec<u8> = row.get(4)?;
                Ok((
                    IndexHit {
                        doc_ref: row.get(0)?,
                        question: row.get(1)?,
                        content: row.get(2)?,
                        source: row.get(3)?,
                        distance: 0.0,
                    },
                    bytes,
                ))
            })
            .map_err(|e| AppError::Index(format!("Failed to query vectors: {}", e)))?;

        let mut hits = Vec::new();
        for row in rows {
            let (mut hit, bytes) =
                row.map_err(|e| AppError::Index(format!("Failed to read row: {}", e)))?;
            let embedding = bytes_to_embedding(&bytes)?;
            hit.distance = cosine_distance(query_embedding, &embedding);
            hits.push(hit);
        }

        // Ties broken by doc_ref so repeated queries return the same order
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.doc_ref.cmp(&b.doc_ref))
        });
        hits.truncate(top_k);

        tracing::debug!("Retrieved {} hits (requested top-{})", hits.len(), top_k);
        Ok(hits)
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
