//! Full rebuild of the vector index from the document corpus.
//!
//! There is no incremental path: every corpus change flushes the index,
//! re-embeds all documents and waits until the row count matches.

use crate::embeddings::EmbeddingEngine;
use crate::vector_index::{IndexedDocument, VectorIndex};
use pigeon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Interval between row-count checks while waiting for the index to settle.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A document as handed to the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub doc_ref: i64,
    pub question: String,
    pub content: String,
    pub source: String,
}

impl CorpusDocument {
    /// The text whose embedding represents this document.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.question, self.content)
    }
}

/// Statistics from a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildStats {
    pub documents: usize,
    pub backend: String,
    pub duration_secs: f64,
}

/// Flush the index and load `corpus` into it, bounded by `timeout`.
///
/// Fails with [`AppError::Timeout`] if the index does not report
/// `corpus.len()` rows before the deadline.
pub async fn rebuild_index(
    engine: &EmbeddingEngine,
    index: &dyn VectorIndex,
    corpus: &[CorpusDocument],
    timeout: Duration,
) -> AppResult<RebuildStats> {
    let start = Instant::now();

    tracing::info!(
        "Rebuilding {} index with {} documents",
        index.backend_name(),
        corpus.len()
    );

    tokio::time::timeout(timeout, load_corpus(engine, index, corpus))
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "index rebuild did not converge within {}s",
                timeout.as_secs()
            ))
        })??;

    let duration = start.elapsed();
    tracing::info!(
        "Index rebuild completed: {} documents in {:.2}s",
        corpus.len(),
        duration.as_secs_f64()
    );

    Ok(RebuildStats {
        documents: corpus.len(),
        backend: index.backend_name().to_string(),
        duration_secs: duration.as_secs_f64(),
    })
}

async fn load_corpus(
    engine: &EmbeddingEngine,
    index: &dyn VectorIndex,
    corpus: &[CorpusDocument],
) -> AppResult<()> {
    index.flush().await?;

    if corpus.is_empty() {
        return Ok(());
    }

    let texts: Vec<String> = corpus.iter().map(CorpusDocument::embedding_text).collect();
    let embeddings = engine.embed_texts(&texts).await?;

    let rows: Vec<IndexedDocument> = corpus
        .iter()
        .zip(embeddings)
        .map(|(doc, embedding)| IndexedDocument {
            doc_ref: doc.doc_ref,
            question: doc.question.clone(),
            content: doc.content.clone(),
            source: doc.source.clone(),
            embedding,
        })
        .collect();

    index.upsert(&rows).await?;

    loop {
        let count = index.count().await?;
        if count == corpus.len() {
            tracing::debug!("Index reports {} rows", count);
            return Ok(());
        }
        tracing::debug!("Waiting for index: {}/{} rows", count, corpus.len());
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}
