//! Embedding providers and the text budget applied before embedding.
//!
//! `get_default_embedder` picks a backend from settings. Setting
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing `FakeEmbedder`, which is fast
//! and deterministic for tests and development.

use std::hash::{Hash, Hasher};

use tracing::info;
use twox_hash::XxHash64;

use tutor_core::config::{EmbeddingBackend, Settings};
use tutor_core::traits::Embedder;
use tutor_core::Result;

#[cfg(feature = "bge")]
pub mod bge;
mod ollama;

pub use ollama::OllamaEmbedder;

/// A whitespace cut is used only when it keeps at least this share of the budget.
pub const WORD_BOUNDARY_FLOOR: f64 = 0.8;

/// Cut `text` to at most `max_chars` characters.
///
/// Prefers the last whitespace boundary inside the budget when that boundary
/// sits no earlier than 80% of the budget; otherwise hard-cuts at the budget.
pub fn truncate_for_embedding(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else { return text };
    let head = &text[..cut];
    if let Some((ws, _)) = head.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        let boundary = head[..ws].chars().count();
        if boundary as f64 >= max_chars as f64 * WORD_BOUNDARY_FLOOR {
            return &head[..ws];
        }
    }
    head
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() { *x /= norm; }
    }
}

/// Token-hashing embedder: every whitespace token bumps one bucket.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    /// A zero `dim` is raised to 1.
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("fake:xxhash:d{dim}") }
    }
}

impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        normalize_l2(&mut v);
        Ok(v)
    }
}

fn fake_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &Settings) -> Result<Box<dyn Embedder>> {
    if fake_forced() || settings.embedding.backend == EmbeddingBackend::Fake {
        info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(1024)));
    }
    match settings.embedding.backend {
        EmbeddingBackend::Ollama => Ok(Box::new(OllamaEmbedder::new(&settings.ollama)?)),
        #[cfg(feature = "bge")]
        EmbeddingBackend::Bge => Ok(Box::new(bge::BgeEmbedder::new(settings.embedding.model_dir.as_deref())?)),
        #[cfg(not(feature = "bge"))]
        EmbeddingBackend::Bge => Err(tutor_core::Error::InvalidConfig(
            "embedding.backend = \"bge\" requires the `bge` feature".into(),
        )),
        EmbeddingBackend::Fake => Ok(Box::new(FakeEmbedder::new(1024))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_embedding("plants make food", 500), "plants make food");
    }

    #[test]
    fn cuts_at_late_word_boundary() {
        // boundary at char 9 of a 10-char budget: 9 >= 8, so cut there
        assert_eq!(truncate_for_embedding("abcdefghi jklmnop", 10), "abcdefghi");
    }

    #[test]
    fn hard_cuts_when_boundary_is_early() {
        assert_eq!(truncate_for_embedding("ab cdefghijklmnop", 10), "ab cdefghi");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let tamil = "தமிழ்தமிழ்தமிழ்";
        let cut = truncate_for_embedding(tamil, 4);
        assert_eq!(cut.chars().count(), 4);
    }
}
