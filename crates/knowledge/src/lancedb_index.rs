//! LanceDB-backed vector index.

use crate::vector_index::{check_dimension, IndexHit, IndexedDocument, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use pigeon_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Column LanceDB adds to vector query results.
const DISTANCE_COLUMN: &str = "_distance";

pub struct LanceDbIndex {
    table: Table,
    embedding_dim: usize,
}

impl LanceDbIndex {
    /// Create or open a LanceDB table.
    ///
    /// # Arguments
    /// * `db_path` - Directory path for the LanceDB database
    /// * `table_name` - Name of the table (typically "documents")
    /// * `embedding_dim` - Dimension of embedding vectors (e.g., 768)
    pub async fn new(db_path: &Path, table_name: &str, embedding_dim: usize) -> AppResult<Self> {
        std::fs::create_dir_all(db_path)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|name| name == table_name) {
            conn.open_table(table_name)
                .execute()
                .await
                .map_err(|e| AppError::Index(format!("Failed to open table: {}", e)))?
        } else {
            let schema = Self::create_schema(embedding_dim);
            let empty_batch = RecordBatch::new_empty(schema.clone());

            conn.create_table(
                table_name,
                RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Initialized LanceDB index at {:?}", db_path);

        Ok(Self {
            table,
            embedding_dim,
        })
    }

    fn create_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("doc_ref", DataType::Int64, false),
            Field::new("question", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
        ]))
    }

    /// Convert documents to a single Arrow RecordBatch.
    fn documents_to_batch(&self, documents: &[IndexedDocument]) -> AppResult<RecordBatch> {
        let schema = Self::create_schema(self.embedding_dim);

        let mut flat = Vec::with_capacity(documents.len() * self.embedding_dim);
        for doc in documents {
            check_dimension(self.embedding_dim, doc.embedding.len(), "Document embedding")?;
            flat.extend_from_slice(&doc.embedding);
        }

        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.embedding_dim as i32,
            Arc::new(Float32Array::from(flat)),
            None,
        )
        .map_err(|e| AppError::Index(format!("Failed to build embedding column: {}", e)))?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from_iter_values(documents.iter().map(|d| d.doc_ref))),
                Arc::new(StringArray::from_iter_values(documents.iter().map(|d| d.question.as_str()))),
                Arc::new(StringArray::from_iter_values(documents.iter().map(|d| d.content.as_str()))),
                Arc::new(StringArray::from_iter_values(documents.iter().map(|d| d.source.as_str()))),
                Arc::new(embedding_array),
            ],
        )
        .map_err(|e| AppError::Index(format!("Failed to create RecordBatch: {}", e)))
    }

    /// Read every row of a query result batch.
    fn batch_to_hits(batch: &RecordBatch) -> AppResult<Vec<IndexHit>> {
        fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a T> {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<T>())
                .ok_or_else(|| AppError::Index(format!("Invalid {} column", name)))
        }

        let doc_refs = column::<Int64Array>(batch, "doc_ref")?;
        let questions = column::<StringArray>(batch, "question")?;
        let contents = column::<StringArray>(batch, "content")?;
        let sources = column::<StringArray>(batch, "source")?;
        let distances = column::<Float32Array>(batch, DISTANCE_COLUMN)?;

        Ok((0..batch.num_rows())
            .map(|row| IndexHit {
                doc_ref: doc_refs.value(row),
                question: questions.value(row).to_string(),
                content: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                distance: if distances.is_null(row) {
                    1.0
                } else {
                    distances.value(row)
                },
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    async fn flush(&self) -> AppResult<()> {
        let count = self.count().await?;
        if count > 0 {
            self.table
                .delete("doc_ref IS NOT NULL")
                .await
                .map_err(|e| AppError::Index(format!("Failed to flush index: {}", e)))?;
        }
        tracing::info!("Flushed LanceDB index ({} rows removed)", count);
        Ok(())
    }

    async fn upsert(&self, documents: &[IndexedDocument]) -> AppResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let batch = self.documents_to_batch(documents)?;
        let schema = batch.schema();

        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to add documents: {}", e)))?;

        tracing::debug!("Batch inserted {} documents into LanceDB", documents.len());
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Index(format!("Failed to count rows: {}", e)))
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        check_dimension(self.embedding_dim, query_embedding.len(), "Query embedding")?;

        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(query_embedding.to_vec())
            .map_err(|e| AppError::Index(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Index(format!("Failed to collect results: {}", e)))?;

        let mut hits = match batches.first() {
            None => Vec::new(),
            Some(first) => {
                let merged = arrow_select::concat::concat_batches(&first.schema(), &batches)
                    .map_err(|e| AppError::Index(format!("Failed to concat batches: {}", e)))?;
                Self::batch_to_hits(&merged)?
            }
        };

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
