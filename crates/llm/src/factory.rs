//! LLM provider factory.
//!
//! Resolves a provider name to a client implementation. Secrets are
//! resolved by the caller (see `AppConfig::resolve_api_key`).

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by OpenAI
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns an error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> Result<Arc<dyn LlmClient>, String> {
    let timeout = timeout.unwrap_or(Duration::from_secs(120));

    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_timeout(base_url, timeout)))
        }
        Some(ProviderType::OpenAI) => {
            let api_key = api_key.ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let base_url = endpoint.unwrap_or("https://api.openai.com/v1");
            Ok(Arc::new(OpenAiClient::with_timeout(base_url, api_key, timeout)))
        }
        None => Err(format!("Unknown provider: {}", provider)),
    }
}
