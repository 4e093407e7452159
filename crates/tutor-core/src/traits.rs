use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text embedding provider.
///
/// Must be deterministic for identical input within a session. The vector
/// length is whatever the backing model produces; callers discover it from
/// the first successful call and hold it fixed afterwards.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:mxbai-embed-large`).
    fn embedder_id(&self) -> &str;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Sampling options forwarded to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self { Self { temperature: 0.3, top_p: 0.9, num_predict: 1000 } }
}

/// Text generation service. Output may be JSON or free text.
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}
