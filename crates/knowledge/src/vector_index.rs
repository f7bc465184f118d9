//! Vector index abstraction for corpus documents.
//!
//! The index is a derived cache of the relational store: every row mirrors a
//! document's question, content and source, keyed by the document id
//! (`doc_ref`). It is only ever rebuilt in full.

use pigeon_core::config::IndexBackend;
use pigeon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A document row as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Id of the relational document row
    pub doc_ref: i64,
    pub question: String,
    pub content: String,
    pub source: String,
    pub embedding: Vec<f32>,
}

/// A nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub doc_ref: i64,
    pub question: String,
    pub content: String,
    pub source: String,
    /// Cosine distance to the query, 0 for identical direction
    pub distance: f32,
}

/// Trait for vector index backends.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs.
    fn backend_name(&self) -> &str;

    /// Remove every row.
    async fn flush(&self) -> AppResult<()>;

    /// Bulk insert rows.
    async fn upsert(&self, documents: &[IndexedDocument]) -> AppResult<()>;

    /// Number of rows currently visible to queries.
    async fn count(&self) -> AppResult<usize>;

    /// Up to `top_k` rows ordered by ascending cosine distance.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>>;
}

/// Open the configured backend under `index_dir`.
pub async fn open_index(
    backend: IndexBackend,
    index_dir: &Path,
    embedding_dim: usize,
) -> AppResult<Arc<dyn VectorIndex>> {
    match backend {
        IndexBackend::Lancedb => Ok(Arc::new(
            crate::lancedb_index::LanceDbIndex::new(index_dir, "documents", embedding_dim).await?,
        )),
        IndexBackend::Sqlite => Ok(Arc::new(crate::sqlite_index::SqliteIndex::open(
            &index_dir.join("vectors.sqlite"),
            embedding_dim,
        )?)),
    }
}

/// Reject vectors whose length differs from the index dimension.
pub(crate) fn check_dimension(expected: usize, actual: usize, what: &str) -> AppResult<()> {
    if expected != actual {
        return Err(AppError::Index(format!(
            "{} dimension mismatch: expected {}, got {}",
            what, expected, actual
        )));
    }
    Ok(())
}

/// Cosine distance between two vectors; 1.0 when either is zero.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot_product / (norm_a * norm_b)
}
