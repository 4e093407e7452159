//! Local BGE-M3 embedder on candle (feature `bge`).
//!
//! Loads `tokenizer.json`, `config.json` and `pytorch_model.bin` from the model
//! directory, runs XLM-RoBERTa and mean-pools the unmasked tokens.

mod pool;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::info;

use tutor_core::traits::Embedder;
use tutor_core::{Error, Result};

pub use pool::masked_mean_l2;

const MAX_TOKENS: usize = 256;
const PAD_TOKEN_ID: u32 = 1;

fn model_err(e: impl std::fmt::Display) -> Error { Error::Embedding(e.to_string()) }

pub struct BgeEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
}

impl BgeEmbedder {
    pub fn new(model_dir: Option<&str>) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir)?;
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display())))?;
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin")).map_err(model_err)?;
        let weights: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(model_err)?;
        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, id: "local:bge-m3:d1024".into() })
    }

    fn encode(&self, text: &str) -> Result<(Tensor, Tensor)> {
        let enc = self.tokenizer.encode(text, true).map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(MAX_TOKENS);
        mask.truncate(MAX_TOKENS);
        ids.resize(MAX_TOKENS, PAD_TOKEN_ID);
        mask.resize(MAX_TOKENS, 0);
        let input_ids = Tensor::from_iter(ids, &self.device).and_then(|t| t.reshape((1, MAX_TOKENS))).map_err(model_err)?;
        let attention_mask = Tensor::from_iter(mask, &self.device).and_then(|t| t.reshape((1, MAX_TOKENS))).map_err(model_err)?;
        Ok((input_ids, attention_mask))
    }
}

impl Embedder for BgeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = self.encode(text)?;
        let token_type_ids = Tensor::zeros((1, MAX_TOKENS), DType::I64, &self.device).map_err(model_err)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(model_err)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(model_err)
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("device: Metal (MPS)");
            return dev;
        }
    }
    info!("device: CPU");
    Device::Cpu
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(tutor_core::config::expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain([Path::new("models/bge-m3").to_path_buf()]);
    for dir in candidates {
        if dir.exists() { return Ok(dir); }
    }
    Err(Error::NotFound("BGE-M3 model directory".into()))
}
