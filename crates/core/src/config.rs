//! Configuration management for Pigeon.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.pigeon/config.yaml`, or `PIGEON_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the store, the vector index and
//! prompt overrides all live under `.pigeon/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".pigeon";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .pigeon/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider ("ollama", "openai")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// API key for the completion provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Completion provider configurations
    pub llm: Option<LlmConfig>,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Retrieval and index settings
    pub retrieval: RetrievalSettings,

    /// Support mailbox identity and persona settings
    pub mail: MailSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    /// Request timeout in seconds.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::OpenAI { timeout, .. } | Self::Ollama { timeout, .. } => *timeout,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// "mock", "ollama" or "openai"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the provider API key
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            endpoint: None,
            api_key_env: None,
        }
    }
}

/// Which vector index backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Lancedb,
    Sqlite,
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Neighbors fetched per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub index_backend: IndexBackend,

    /// Upper bound on a full re-index, in seconds
    #[serde(default = "default_index_timeout_secs")]
    pub index_timeout_secs: u64,

    /// Upper bound on answering one email, in seconds (unbounded when absent)
    #[serde(default)]
    pub answer_timeout_secs: Option<u64>,
}

fn default_top_k() -> usize {
    3
}

fn default_index_timeout_secs() -> u64 {
    60
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            index_backend: IndexBackend::default(),
            index_timeout_secs: default_index_timeout_secs(),
            answer_timeout_secs: None,
        }
    }
}

/// Support mailbox settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSettings {
    /// The support account's own address; mail from it is the assistant's side of a thread
    #[serde(default = "default_support_address")]
    pub support_address: String,

    /// Organization name used by the reply persona
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Fixed sign-off appended by the reply persona
    #[serde(default = "default_signoff")]
    pub signoff: String,
}

fn default_support_address() -> String {
    "help@example.org".to_string()
}

fn default_organization() -> String {
    "HackMIT".to_string()
}

fn default_signoff() -> String {
    "Best regards,\nThe HackMIT Team".to_string()
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            support_address: default_support_address(),
            organization: default_organization(),
            signoff: default_signoff(),
        }
    }
}

impl MailSettings {
    /// True when `sender` is the support mailbox itself.
    pub fn is_support_address(&self, sender: &str) -> bool {
        bare_address(sender).eq_ignore_ascii_case(bare_address(&self.support_address))
    }
}

/// The address inside a `Name <addr>` header, or the trimmed input.
pub fn bare_address(header: &str) -> &str {
    let header = header.trim();
    match (header.rfind('<'), header.rfind('>')) {
        (Some(open), Some(close)) if open < close => header[open + 1..close].trim(),
        _ => header,
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    mail: Option<MailSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_format: LogFormat::default(),
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `PIGEON_WORKSPACE`: Override workspace path
    /// - `PIGEON_CONFIG`: Path to config file
    /// - `PIGEON_PROVIDER`: Completion provider
    /// - `PIGEON_MODEL`: Completion model
    /// - `PIGEON_API_KEY`: Completion API key
    /// - `PIGEON_SUPPORT_ADDRESS`: Support mailbox address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("PIGEON_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("PIGEON_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        config = config.reload_file()?;

        if let Ok(provider) = std::env::var("PIGEON_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("PIGEON_MODEL") {
            config.model = model;
        }

        if let Ok(address) = std::env::var("PIGEON_SUPPORT_ADDRESS") {
            config.mail.support_address = address;
        }

        config.api_key = std::env::var("PIGEON_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Re-read the config file for the current workspace and merge it in.
    ///
    /// Called again after CLI overrides change the workspace or config path.
    pub fn reload_file(self) -> AppResult<Self> {
        if !self.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                self.workspace
            )));
        }

        let config_path = self
            .config_file
            .clone()
            .unwrap_or_else(|| self.state_dir().join("config.yaml"));

        if config_path.exists() {
            self.merge_yaml(&config_path)
        } else {
            Ok(self)
        }
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(mail) = config_file.mail {
            result.mail = mail;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .pigeon directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .pigeon directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Path of the relational store.
    pub fn store_path(&self) -> PathBuf {
        self.state_dir().join("pigeon.sqlite")
    }

    /// Directory holding the vector index.
    pub fn index_dir(&self) -> PathBuf {
        self.state_dir().join("index")
    }

    /// Directory holding prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.state_dir().join("prompts")
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the completion API key.
    ///
    /// `PIGEON_API_KEY` wins over the provider's `apiKeyEnv`.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => std::env::var(api_key_env).ok(),
            _ => std::env::var("OPENAI_API_KEY").ok().filter(|_| provider == "openai"),
        }
    }

    /// Resolve the embedding provider API key.
    pub fn resolve_embedding_api_key(&self) -> Option<String> {
        let env_var = self
            .embedding
            .api_key_env
            .clone()
            .unwrap_or_else(|| "OPENAI_API_KEY".to_string());
        std::env::var(env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.provider == "openai" && self.resolve_api_key("openai").is_none() {
            return Err(AppError::Config(
                "OpenAI provider requires an API key (PIGEON_API_KEY or apiKeyEnv)".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }

        if self.mail.support_address.trim().is_empty() {
            return Err(AppError::Config("mail.supportAddress is empty".to_string()));
        }

        Ok(())
    }
}
