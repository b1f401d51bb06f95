use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Errors encountered while assembling the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command-line overrides. Anything left unset falls back to the
/// environment, then the config file, then the defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "bidscan", version, about = "Extract bid/RFP metadata from document folders")]
pub struct Cli {
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory containing the bid folders
    #[arg(long)]
    pub input_root: Option<PathBuf>,

    /// Directory receiving <folder>_extracted.json files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Chat model name
    #[arg(long)]
    pub model: Option<String>,

    /// Number of segments retrieved per folder
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Bid folders to process
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub root: PathBuf,
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub query: String,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            folders: vec!["Bid1".to_string(), "Bid2".to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: extract::GroqClient::DEFAULT_BASE_URL.to_string(),
            model: extract::GroqClient::DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            request_timeout_secs: 120,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            query: index::DEFAULT_QUERY.to_string(),
            top_k: index::DEFAULT_TOP_K,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        let defaults = ingest::ChunkerConfig::default();
        Self {
            max_tokens: defaults.target_tokens_max,
            overlap_tokens: defaults.overlap_tokens,
        }
    }
}

/// Credential for the hosted language model. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        lookup(API_KEY_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(|value| Self(value.trim().to_string()))
            .ok_or_else(|| ConfigError::MissingVariable(API_KEY_VAR.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl AppConfig {
    /// Defaults < config file < environment < command line.
    pub fn load(cli: &Cli) -> Result<(Self, ApiKey), ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();

        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.apply_cli(cli);
        config.validate()?;

        let api_key = ApiKey::from_lookup(lookup)?;

        tracing::debug!(
            input_root = %config.input.root.display(),
            folders = ?config.input.folders,
            output_dir = %config.output.dir.display(),
            model = %config.llm.model,
            embedding_model = %config.embedding.model,
            top_k = config.retrieval.top_k,
            "Loaded configuration"
        );

        Ok((config, api_key))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(root) = get("BIDSCAN_INPUT_ROOT") {
            self.input.root = PathBuf::from(root);
        }
        if let Some(folders) = get("BIDSCAN_FOLDERS") {
            self.input.folders = parse_folder_list(&folders);
        }
        if let Some(dir) = get("BIDSCAN_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(url) = get("GROQ_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("GROQ_MODEL") {
            self.llm.model = model;
        }
        if let Some(secs) = get("BIDSCAN_REQUEST_TIMEOUT_SECS") {
            self.llm.request_timeout_secs = parse_number("BIDSCAN_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(url) = get("OLLAMA_BASE_URL") {
            self.embedding.base_url = url;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(top_k) = get("BIDSCAN_TOP_K") {
            self.retrieval.top_k = parse_number("BIDSCAN_TOP_K", &top_k)?;
        }

        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.input_root {
            self.input.root = root.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output.dir = dir.clone();
        }
        if let Some(model) = &cli.model {
            self.llm.model = model.clone();
        }
        if let Some(top_k) = cli.top_k {
            self.retrieval.top_k = top_k;
        }
        if !cli.folders.is_empty() {
            self.input.folders = cli.folders.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.folders.is_empty() {
            return Err(ConfigError::Invalid("no input folders configured".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be at least 1".into()));
        }
        if self.retrieval.query.trim().is_empty() {
            return Err(ConfigError::Invalid("retrieval.query must not be empty".into()));
        }
        if self.chunking.max_tokens == 0 {
            return Err(ConfigError::Invalid("chunking.max_tokens must be at least 1".into()));
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err(ConfigError::Invalid(
                "chunking.overlap_tokens must be smaller than chunking.max_tokens".into(),
            ));
        }
        Ok(())
    }
}

fn parse_folder_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
