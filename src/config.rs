//! TOML configuration.
//!
//! Every section is optional; a missing file or missing key falls back to
//! the defaults of the reference deployment (PDFs under `./datafiles`,
//! `text-embedding-3-small`, `gpt-4o-mini` capped at 150 tokens, top-3
//! retrieval with a 0.7 cosine-distance threshold).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub db: DbConfig,
    pub collection: CollectionConfig,
    pub ingest: IngestConfig,
    pub provider: ProviderConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/coursebot.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionConfig {
    pub name: String,
    /// Similarity metric. Only `"cosine"` is supported.
    pub space: String,
    /// HNSW graph degree recorded with the collection metadata.
    pub hnsw_m: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "course_documents".to_string(),
            space: "cosine".to_string(),
            hnsw_m: 32,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub dir: PathBuf,
    /// Recognized file extensions, without the leading dot.
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./datafiles"),
            extensions: vec!["pdf".to_string()],
        }
    }
}

/// Connection settings shared by the embedding and chat clients.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Texts per embeddings request during setup. 1 = one request per document.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            batch_size: 1,
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with knowledge about the course materials. Use the provided context to answer questions.";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 150,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    /// Context is used only when the closest distance is strictly below this.
    pub distance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: crate::retrieve::DEFAULT_K,
            distance_threshold: crate::retrieve::DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

impl ProviderConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to the built-in defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be >= 1");
    }

    let threshold = config.retrieval.distance_threshold;
    if !(threshold > 0.0 && threshold <= 2.0) {
        anyhow::bail!("retrieval.distance_threshold must be in (0.0, 2.0]");
    }

    if config.chat.max_tokens == 0 {
        anyhow::bail!("chat.max_tokens must be > 0");
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be >= 1");
    }

    if config.ingest.extensions.is_empty() {
        anyhow::bail!("ingest.extensions must list at least one extension");
    }

    if config.collection.name.trim().is_empty() {
        anyhow::bail!("collection.name must not be empty");
    }

    match config.collection.space.as_str() {
        "cosine" => {}
        other => anyhow::bail!(
            "Unsupported collection.space: '{}'. Only cosine is supported.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn empty_file_uses_reference_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.retrieval.k, 3);
        assert!((config.retrieval.distance_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.chat.max_tokens, 150);
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.collection.space, "cosine");
        assert_eq!(config.collection.hnsw_m, 32);
        assert_eq!(config.ingest.extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = parse(
            r#"
            [retrieval]
            k = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.k, 5);
        assert!((config.retrieval.distance_threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_zero_k() {
        let err = parse("[retrieval]\nk = 0\n").unwrap_err();
        assert!(err.to_string().contains("retrieval.k"));
    }

    #[test]
    fn rejects_unknown_space() {
        let err = parse("[collection]\nspace = \"l2\"\n").unwrap_err();
        assert!(err.to_string().contains("cosine"));
    }

    #[test]
    fn rejects_empty_extension_list() {
        let err = parse("[ingest]\nextensions = []\n").unwrap_err();
        assert!(err.to_string().contains("ingest.extensions"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("/nonexistent/coursebot.toml")).unwrap();
        assert_eq!(config.collection.name, "course_documents");
    }

    #[test]
    fn example_config_is_valid() {
        let config = parse(include_str!("../config/coursebot.example.toml")).unwrap();
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }
}
