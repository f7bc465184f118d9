//! Corpus administration.

use crate::types::corpus_document;
use crate::Inbox;
use pigeon_core::AppResult;
use pigeon_knowledge::{rebuild_index, CorpusDocument, RebuildStats};
use pigeon_store::documents::{
    citable_documents, clear_documents, delete_document, insert_document, list_documents,
    update_document,
};
use pigeon_store::{ClearStats, DeleteOutcome, Document, NewDocument};

impl Inbox {
    pub fn add_document(&self, doc: &NewDocument) -> AppResult<Document> {
        let stored = self.store.write(|conn| insert_document(conn, doc))?;
        tracing::info!("Added document {}", stored.id);
        Ok(stored)
    }

    /// Add several documents in one transaction.
    pub fn import_documents(&self, docs: &[NewDocument]) -> AppResult<Vec<Document>> {
        let stored = self.store.write(|conn| {
            docs.iter()
                .map(|doc| insert_document(conn, doc))
                .collect::<AppResult<Vec<_>>>()
        })?;
        tracing::info!("Imported {} documents", stored.len());
        Ok(stored)
    }

    pub fn edit_document(&self, id: i64, doc: &NewDocument) -> AppResult<Document> {
        self.store.write(|conn| update_document(conn, id, doc))
    }

    /// Delete a document, or defer the deletion while responses cite it.
    pub fn delete_document(&self, id: i64) -> AppResult<DeleteOutcome> {
        self.store.write(|conn| delete_document(conn, id))
    }

    pub fn clear_documents(&self) -> AppResult<ClearStats> {
        self.store.write(clear_documents)
    }

    pub fn list_documents(&self) -> AppResult<Vec<Document>> {
        self.store.read(list_documents)
    }

    /// Rebuild the vector index from every document not pending deletion.
    pub async fn reindex(&self) -> AppResult<RebuildStats> {
        let corpus: Vec<CorpusDocument> = self
            .store
            .read(citable_documents)?
            .iter()
            .map(corpus_document)
            .collect();

        let retriever = self.answerer.retriever();
        let stats = rebuild_index(
            retriever.engine(),
            retriever.index().as_ref(),
            &corpus,
            self.index_timeout,
        )
        .await?;

        if let Some((index_dir, config)) = &self.manifest {
            config.save(index_dir)?;
        }

        Ok(stats)
    }
}
