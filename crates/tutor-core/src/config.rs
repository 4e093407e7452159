//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys split on `__`, e.g. `APP_RETRIEVAL__TOP_K`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against the directory the config was loaded from.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::routing::RoutingConfig;
use crate::traits::GenerationOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: String,
    pub index_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self { Self { data_dir: "data/chunks".into(), index_dir: "vector_stores".into() } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            embedding_model: "mxbai-embed-large".into(),
            llm_model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Ollama,
    Fake,
    Bge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    /// Character budget applied to every text before it reaches the provider.
    pub max_chars: usize,
    pub batch_size: usize,
    /// Local model directory for the `bge` backend.
    pub model_dir: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbeddingBackend::Ollama, max_chars: 500, batch_size: 64, model_dir: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Below this routing confidence a single-subject search is not trusted.
    pub low_confidence_threshold: f32,
    /// Character budget for the assembled context.
    pub context_budget: usize,
    /// Candidate multiplier applied when a metadata filter is present.
    pub filter_overfetch: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5, low_confidence_threshold: 0.3, context_budget: 4000, filter_overfetch: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub ollama: OllamaSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationOptions,
    pub routing: RoutingConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(Error::InvalidConfig(msg.to_string())) };
        if self.retrieval.top_k == 0 { return invalid("retrieval.top_k must be positive"); }
        if !(0.0..=1.0).contains(&self.retrieval.low_confidence_threshold) {
            return invalid("retrieval.low_confidence_threshold must be within [0, 1]");
        }
        if self.retrieval.context_budget == 0 { return invalid("retrieval.context_budget must be positive"); }
        if self.retrieval.filter_overfetch == 0 { return invalid("retrieval.filter_overfetch must be positive"); }
        if self.embedding.max_chars == 0 { return invalid("embedding.max_chars must be positive"); }
        if self.embedding.batch_size == 0 { return invalid("embedding.batch_size must be positive"); }
        if self.routing.subjects.is_empty() { return invalid("routing.subjects must not be empty"); }
        let known = |name: &str| self.routing.subjects.iter().any(|s| s.subject.eq_ignore_ascii_case(name));
        if !known(&self.routing.computation_subject) {
            return Err(Error::InvalidConfig(format!(
                "routing.computation_subject '{}' is not a configured subject",
                self.routing.computation_subject
            )));
        }
        if let Some(rule) = self.routing.heuristics.iter().find(|r| !known(&r.subject)) {
            return Err(Error::InvalidConfig(format!("heuristic subject '{}' is not a configured subject", rule.subject)));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current working directory.
    pub fn load() -> Result<Self> {
        let cwd = env::current_dir()?;
        Self::load_from(&cwd)
    }

    /// Load `config.toml` and its environment overlay from `base_dir`.
    pub fn load_from(base_dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to extract settings: {e}")))
    }

    pub fn base_dir(&self) -> &Path { &self.base_dir }

    pub fn index_dir(&self) -> Result<PathBuf> {
        let dir: String = self.get("paths.index_dir")?;
        Ok(resolve_with_base(&self.base_dir, dir))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir: String = self.get("paths.data_dir")?;
        Ok(resolve_with_base(&self.base_dir, dir))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
