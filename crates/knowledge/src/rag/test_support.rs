//! Fakes shared by the pipeline tests.

use crate::embeddings::EmbeddingProvider;
use crate::vector_index::{IndexHit, IndexedDocument, VectorIndex};
use pigeon_core::{AppError, AppResult};
use pigeon_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Completion client that replays canned outputs and records requests.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(message.to_string())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            }),
            Some(Err(message)) => Err(AppError::Llm(message)),
            None => Err(AppError::Llm("no scripted response left".to_string())),
        }
    }
}

/// Index that answers each query vector with fixed hits.
///
/// Queries are matched on the first component of the vector; anything
/// unknown gets no hits.
#[derive(Default)]
pub struct FixedIndex {
    hits: HashMap<u32, Vec<IndexHit>>,
}

impl FixedIndex {
    pub fn with_hits(mut self, key: f32, hits: Vec<IndexHit>) -> Self {
        self.hits.insert(key.to_bits(), hits);
        self
    }
}

#[async_trait::async_trait]
impl VectorIndex for FixedIndex {
    fn backend_name(&self) -> &str {
        "fixed"
    }

    async fn flush(&self) -> AppResult<()> {
        Ok(())
    }

    async fn upsert(&self, _documents: &[IndexedDocument]) -> AppResult<()> {
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.hits.values().map(Vec::len).sum())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        let key = query_embedding.first().copied().unwrap_or_default().to_bits();
        let mut hits = self.hits.get(&key).cloned().unwrap_or_default();
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Embeds each known question as a one-component vector `[key]`.
///
/// Unknown texts map to `[-1.0]`.
#[derive(Debug, Default)]
pub struct KeyedEmbedder {
    keys: HashMap<String, f32>,
}

impl KeyedEmbedder {
    pub fn with_key(mut self, text: &str, key: f32) -> Self {
        self.keys.insert(text.to_string(), key);
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeyedEmbedder {
    fn provider_name(&self) -> &str {
        "keyed"
    }

    fn model_name(&self) -> &str {
        "keyed"
    }

    fn dimensions(&self) -> usize {
        1
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| vec![self.keys.get(t).copied().unwrap_or(-1.0)])
            .collect())
    }
}

/// Index hit for a document at the given cosine distance.
pub fn hit(doc_ref: i64, question: &str, content: &str, distance: f32) -> IndexHit {
    IndexHit {
        doc_ref,
        question: question.to_string(),
        content: content.to_string(),
        source: String::new(),
        distance,
    }
}
