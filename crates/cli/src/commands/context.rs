//! Client wiring shared by the commands.
//!
//! The process owns every client: the completion provider, the embedding
//! provider, the vector index and the store are built once here and handed
//! to the inbox.

use pigeon_core::{config::AppConfig, AppError, AppResult};
use pigeon_inbox::Inbox;
use pigeon_knowledge::{create_provider, open_index, Answerer, EmbeddingConfig, EmbeddingEngine, Retriever};
use pigeon_llm::create_client;
use pigeon_prompt::PromptLibrary;
use pigeon_store::Store;
use std::sync::Arc;
use std::time::Duration;

/// Build the inbox for `config`.
pub async fn open_inbox(config: &AppConfig) -> AppResult<Inbox> {
    config.validate()?;

    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.and_then(|pc| pc.endpoint());
    let timeout = provider_config
        .and_then(|pc| pc.timeout())
        .map(Duration::from_secs);
    let api_key = config.resolve_api_key(&config.provider);

    let llm = create_client(&config.provider, endpoint, api_key.as_deref(), timeout)
        .map_err(AppError::Config)?;

    let embedding = embedding_config(config);
    let embedding_key = config.resolve_embedding_api_key();
    let embedder = create_provider(&embedding, embedding_key.as_deref()).await?;

    let index = open_index(
        config.retrieval.index_backend,
        &config.index_dir(),
        embedding.dimensions,
    )
    .await?;

    let retriever = Retriever::new(EmbeddingEngine::new(embedder, embedding.batch_size), index);
    let answerer = Answerer::new(
        llm,
        config.model.clone(),
        retriever,
        PromptLibrary::new(config.prompts_dir()),
        config.mail.clone(),
    )
    .with_top_k(config.retrieval.top_k)
    .with_deadline(config.retrieval.answer_timeout_secs.map(Duration::from_secs));

    let store = Arc::new(Store::open(&config.store_path())?);

    tracing::debug!(
        "Opened inbox: llm={} model={} embeddings={}/{} index={:?}",
        config.provider,
        config.model,
        embedding.provider,
        embedding.model,
        config.retrieval.index_backend
    );

    Ok(Inbox::new(store, answerer, config.mail.clone())
        .with_index_timeout(Duration::from_secs(config.retrieval.index_timeout_secs))
        .with_manifest(config.index_dir(), embedding))
}

pub fn embedding_config(config: &AppConfig) -> EmbeddingConfig {
    EmbeddingConfig::from(&config.embedding)
}

/// Refuse to search an index built with different embeddings.
pub fn ensure_index_compatible(config: &AppConfig) -> AppResult<()> {
    match EmbeddingConfig::load(&config.index_dir())? {
        Some(built_with) => built_with.validate_consistency(&embedding_config(config)),
        None => Err(AppError::Index(
            "The document index has not been built. Run 'pigeon documents reindex' first."
                .to_string(),
        )),
    }
}
