//! Ollama text generation over `/api/generate`, non-streaming.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tutor_core::config::OllamaSettings;
use tutor_core::traits::{GenerationOptions, Generator};
use tutor_core::{Error, Result};

pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(settings: &OllamaSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Generation(format!("http client: {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.llm_model.clone(),
            client,
            runtime,
        })
    }
}

impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str { &self.model }

    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest { model: &self.model, prompt, stream: false, options };
        let reply: GenerateResponse = self.runtime.block_on(async {
            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Generation(format!("Ollama HTTP error: {e}")))?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Generation(format!("Ollama returned {status}: {body}")));
            }
            response
                .json::<GenerateResponse>()
                .await
                .map_err(|e| Error::Generation(format!("Ollama JSON parse error: {e}")))
        })?;
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), reply_chars = reply.response.chars().count(), "generated");
        Ok(reply.response)
    }
}

/// Error-shaped general answer used in place of model output when the
/// generation call fails. It still goes through the formatter.
pub fn generation_error_body(err: &Error) -> String {
    serde_json::json!({
        "summary": format!("Error generating response: {err}"),
        "caption": "Error",
        "bullet_points": [],
        "table": [],
    })
    .to_string()
}
