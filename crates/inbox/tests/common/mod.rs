//! Fakes for inbox workflow tests.

#![allow(dead_code)]

use pigeon_core::{AppError, AppResult, MailSettings};
use pigeon_inbox::{InboundEmail, Inbox};
use pigeon_knowledge::{
    Answerer, EmbeddingEngine, EmbeddingProvider, IndexHit, IndexedDocument, Retriever,
    VectorIndex,
};
use pigeon_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use pigeon_prompt::PromptLibrary;
use pigeon_store::Store;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const SUPPORT: &str = "help@example.org";

/// Replays canned completions and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn push(&self, split: &str, reply: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.push_back(split.to_string());
        responses.push_back(reply.to_string());
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
        let content = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Llm("no scripted response left".to_string()))?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

/// One-component embeddings looked up by exact text; unknown text is `[-1.0]`.
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

/// Index whose answers are set by the test, keyed on the query's first component.
#[derive(Default)]
pub struct ScriptedIndex {
    hits: Mutex<HashMap<u32, Vec<IndexHit>>>,
}

impl ScriptedIndex {
    pub fn set(&self, key: f32, doc_refs: &[(i64, f32)]) {
        let hits = doc_refs
            .iter()
            .map(|&(doc_ref, distance)| IndexHit {
                doc_ref,
                question: format!("question {}", doc_ref),
                content: format!("content {}", doc_ref),
                source: String::new(),
                distance,
            })
            .collect();
        self.hits.lock().unwrap().insert(key.to_bits(), hits);
    }
}

#[async_trait::async_trait]
impl VectorIndex for ScriptedIndex {
    fn backend_name(&self) -> &str {
        "scripted"
    }

    async fn flush(&self) -> AppResult<()> {
        Ok(())
    }

    async fn upsert(&self, _documents: &[IndexedDocument]) -> AppResult<()> {
        Ok(())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(0)
    }

    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<IndexHit>> {
        let key = query.first().copied().unwrap_or_default().to_bits();
        let mut hits = self
            .hits
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default();
        hits.truncate(top_k);
        Ok(hits)
    }
}

pub fn mail() -> MailSettings {
    MailSettings {
        support_address: SUPPORT.to_string(),
        ..MailSettings::default()
    }
}

pub fn inbox(
    llm: Arc<ScriptedLlm>,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    prompts_dir: &Path,
) -> Inbox {
    let retriever = Retriever::new(EmbeddingEngine::new(provider, 16), index);
    let answerer = Answerer::new(
        llm,
        "gpt-4o",
        retriever,
        PromptLibrary::new(prompts_dir),
        mail(),
    );
    Inbox::new(Arc::new(Store::in_memory().unwrap()), answerer, mail())
}

pub fn inbound(message_id: &str, body: &str) -> InboundEmail {
    InboundEmail {
        sender: "ada@mit.edu".to_string(),
        subject: "Question".to_string(),
        body: body.to_string(),
        message_id: message_id.to_string(),
        in_reply_to: None,
        date: chrono::Utc::now(),
    }
}
