//! Configuration system for causegraph.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cluster::ClusteringConfig;
use crate::embedding::FetchConfig;
use crate::error::{CausegraphError, CgResult};
use crate::keys::KeyPolicy;
use crate::labels::LabelerConfig;
use crate::traits::{EmbedderConfig, EmbedderProvider, LlmConfig, LlmProvider, DEEPINFRA_BASE_URL};

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmProviderConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

/// Key derivation settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeysConfig {
    /// Normalization policy used for every key in a run.
    pub policy: KeyPolicy,
}

/// Main pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Density clustering parameters.
    pub clustering: ClusteringConfig,
    /// Key normalization.
    pub keys: KeysConfig,
    /// Embedding provider.
    pub embedder: EmbedderProviderConfig,
    /// Embedding fetch concurrency and retries.
    pub fetch: FetchConfig,
    /// LLM provider for cluster labeling.
    pub llm: LlmProviderConfig,
    /// Cluster labeling.
    pub labeler: LabelerConfig,
    /// Directory for output artifacts.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clustering: ClusteringConfig::default(),
            keys: KeysConfig::default(),
            embedder: EmbedderProviderConfig::default(),
            fetch: FetchConfig::default(),
            llm: LlmProviderConfig::default(),
            labeler: LabelerConfig::default(),
            output_dir: PathBuf::from("data/graph"),
        }
    }
}

impl PipelineConfig {
    /// Default location of the user config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("causegraph"))
            .unwrap_or_else(|| PathBuf::from(".causegraph"))
            .join("config.toml")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> CgResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CausegraphError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CausegraphError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| CausegraphError::Configuration(e.to_string())),
            _ => Err(CausegraphError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay environment variables onto this configuration.
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Clustering
        if let Some(eps) = parse_var(&var, "CAUSEGRAPH_EPS") {
            self.clustering.eps = eps;
        }
        if let Some(min_samples) = parse_var(&var, "CAUSEGRAPH_MIN_SAMPLES") {
            self.clustering.min_samples = min_samples;
        }
        if let Some(policy) = var("CAUSEGRAPH_KEY_POLICY") {
            match policy.to_lowercase().as_str() {
                "taxonomic" => self.keys.policy = KeyPolicy::Taxonomic,
                "flatten_noise_subtypes" => self.keys.policy = KeyPolicy::FlattenNoiseSubtypes,
                other => tracing::warn!("Ignoring unknown CAUSEGRAPH_KEY_POLICY '{}'", other),
            }
        }

        // Embedder configuration
        if let Some(model) = var("CAUSEGRAPH_EMBEDDING_MODEL") {
            self.embedder.config.model = model;
        }
        if let Some(url) = var("CAUSEGRAPH_EMBEDDING_BASE_URL") {
            self.embedder.config.base_url = Some(url);
        }
        if let Some(dims) = parse_var(&var, "CAUSEGRAPH_EMBEDDING_DIMS") {
            self.embedder.config.embedding_dims = dims;
        }
        if let Some(api_key) = var("DEEPINFRA_API_KEY") {
            self.embedder.provider = EmbedderProvider::DeepInfra;
            self.embedder.config.api_key = Some(api_key);
            if self.embedder.config.base_url.is_none() {
                self.embedder.config.base_url = Some(DEEPINFRA_BASE_URL.to_string());
            }
        } else if let Some(api_key) = var("OPENAI_API_KEY") {
            self.embedder.config.api_key = Some(api_key);
        }
        if let Some(concurrency) = parse_var(&var, "CAUSEGRAPH_MAX_CONCURRENCY") {
            self.fetch.max_concurrency = concurrency;
        }

        // LLM configuration
        if let Some(model) = var("CAUSEGRAPH_LLM_MODEL") {
            self.llm.config.model = model;
        }
        if let Some(api_key) = var("ANTHROPIC_API_KEY") {
            self.llm.config.api_key = Some(api_key);
        }

        // Output
        if let Some(dir) = var("CAUSEGRAPH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        self
    }

    /// Check values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> CgResult<()> {
        self.clustering.validate()?;
        if self.fetch.max_concurrency == 0 {
            return Err(CausegraphError::Configuration(
                "fetch.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}='{}'", name, raw);
            None
        }
    }
}
