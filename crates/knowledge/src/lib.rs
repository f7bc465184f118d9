//! Corpus retrieval and answering for Pigeon.
//!
//! Embeds FAQ documents into a vector index, retrieves them per question
//! and drafts grounded replies to support emails.

pub mod corpus;
pub mod embeddings;
pub mod lancedb_index;
pub mod rag;
pub mod retrieval;
pub mod sqlite_index;
pub mod vector_index;

// Re-export commonly used types
pub use corpus::{rebuild_index, CorpusDocument, RebuildStats};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingEngine, EmbeddingProvider};
pub use rag::{
    assemble_context, history_message, score_confidence, Answer, Answerer, CitedDocument,
    QuestionCitations, SplitOutcome, GENERATION_FAILED_REPLY,
};
pub use retrieval::{QuestionResult, RetrievedDocument, Retriever};
pub use vector_index::{open_index, IndexHit, IndexedDocument, VectorIndex};
