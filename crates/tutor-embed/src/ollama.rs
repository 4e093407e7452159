//! Ollama embedding provider.
//!
//! Blocking facade over the async `/api/embed` endpoint. The caller's timeout
//! policy is the client timeout from `ollama.timeout_secs`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tutor_core::config::OllamaSettings;
use tutor_core::traits::Embedder;
use tutor_core::{Error, Result};

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    id: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(settings: &OllamaSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Embedding(format!("http client: {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.embedding_model.clone(),
            id: format!("ollama:{}", settings.embedding_model),
            client,
            runtime,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest { model: &self.model, input: vec![text] };
        let response: EmbedResponse = self.runtime.block_on(async {
            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Embedding(format!("Ollama HTTP error: {e}")))?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Embedding(format!("Ollama returned {status}: {body}")));
            }
            response
                .json::<EmbedResponse>()
                .await
                .map_err(|e| Error::Embedding(format!("Ollama JSON parse error: {e}")))
        })?;
        debug!(model = %self.model, chars = text.chars().count(), "embedded text");
        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("empty Ollama response".into()))
    }
}
