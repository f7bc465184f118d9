//! Per-question nearest-neighbor retrieval.

use crate::embeddings::EmbeddingEngine;
use crate::vector_index::{IndexHit, VectorIndex};
use futures::future::try_join_all;
use pigeon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A corpus document returned for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub doc_ref: i64,
    pub question: String,
    pub content: String,
    pub source: String,
    /// Cosine similarity in [0, 1], two decimals
    pub score: f32,
}

/// Ranked documents for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question: String,
    pub documents: Vec<RetrievedDocument>,
}

impl QuestionResult {
    /// Best score among the retrieved documents, 0 when there are none.
    pub fn top_score(&self) -> f32 {
        self.documents.iter().map(|d| d.score).fold(0.0, f32::max)
    }
}

/// Convert a cosine distance into the reported similarity score.
pub fn similarity_score(distance: f32) -> f32 {
    let similarity = (1.0 - distance).clamp(0.0, 1.0);
    (similarity * 100.0).round() / 100.0
}

impl From<IndexHit> for RetrievedDocument {
    fn from(hit: IndexHit) -> Self {
        Self {
            score: similarity_score(hit.distance),
            doc_ref: hit.doc_ref,
            question: hit.question,
            content: hit.content,
            source: hit.source,
        }
    }
}

/// Embeds questions and searches the corpus index.
#[derive(Clone)]
pub struct Retriever {
    engine: EmbeddingEngine,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(engine: EmbeddingEngine, index: Arc<dyn VectorIndex>) -> Self {
        Self { engine, index }
    }

    pub fn engine(&self) -> &EmbeddingEngine {
        &self.engine
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Up to `top_k` documents per question, in question order.
    ///
    /// All questions are embedded in one batch; the searches run
    /// concurrently. Index failures propagate.
    pub async fn retrieve(&self, questions: &[String], top_k: usize) -> AppResult<Vec<QuestionResult>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.engine.embed_texts(questions).await?;
        if embeddings.len() != questions.len() {
            return Err(AppError::Knowledge(format!(
                "Got {} query embeddings for {} questions",
                embeddings.len(),
                questions.len()
            )));
        }

        let searches = questions.iter().zip(embeddings.iter()).map(|(question, embedding)| {
            let index = Arc::clone(&self.index);
            async move {
                let hits = index.search(embedding, top_k).await?;
                Ok::<_, AppError>(QuestionResult {
                    question: question.clone(),
                    documents: hits.into_iter().map(RetrievedDocument::from).collect(),
                })
            }
        });

        // try_join_all yields results in input order
        let results = try_join_all(searches).await?;

        for result in &results {
            tracing::debug!(
                "Question {:?}: {} documents, top score {:.2}",
                result.question,
                result.documents.len(),
                result.top_score()
            );
        }

        tracing::info!(
            "Retrieved documents for {} questions from {} index",
            results.len(),
            self.index.backend_name()
        );

        Ok(results)
    }
}
