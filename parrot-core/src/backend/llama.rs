//! LLaMA-family causal model on candle, run without a KV cache.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig};
use tracing::info;

use crate::backend::vocab::HfVocabulary;
use crate::model::{load_tokenizer, ModelConfig, ModelFiles};
use crate::service::{CausalLm, TokenId};

/// Loaded model ready for inference
pub struct LlamaLm {
    model: Llama,
    config: Config,
    dtype: DType,
    device: Device,
}

impl LlamaLm {
    fn new(model: Llama, config: Config, dtype: DType, device: Device) -> Self {
        Self {
            model,
            config,
            dtype,
            device,
        }
    }

    /// Load a model from HuggingFace Hub or a local directory
    pub fn load(config: &ModelConfig, device: &Device) -> Result<(Self, HfVocabulary)> {
        info!("Loading model: {}", config.model_id);
        let files = ModelFiles::open(&config.model_id, &config.revision)?;
        let tokenizer = load_tokenizer(config, &files)?;

        info!("Loading model config...");
        let llama_config: LlamaConfig = files.config()?;
        let model_config = llama_config.into_config(false);

        info!("Loading model weights...");
        let filenames = files.safetensors()?;
        info!("Loading {} safetensor file(s)", filenames.len());

        let dtype = config.dtype_for(device);
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&filenames, dtype, device)? };
        let model =
            Llama::load(vb, &model_config).map_err(|e| anyhow!("Failed to load model: {}", e))?;

        info!("Model loaded successfully!");
        info!("  - Vocab size: {}", model_config.vocab_size);
        info!("  - Hidden size: {}", model_config.hidden_size);
        info!("  - Layers: {}", model_config.num_hidden_layers);
        info!("  - Context window: {}", model_config.max_position_embeddings);

        Ok((
            Self::new(model, model_config, dtype, device.clone()),
            HfVocabulary::new(tokenizer),
        ))
    }
}

impl CausalLm for LlamaLm {
    fn context_window(&self) -> usize {
        self.config.max_position_embeddings
    }

    fn next_logits(&mut self, rows: &[Vec<TokenId>]) -> Result<Vec<Vec<f32>>> {
        let seq_len = rows.first().map_or(0, Vec::len);
        let flat: Vec<TokenId> = rows.concat();
        let input = Tensor::from_vec(flat, (rows.len(), seq_len), &self.device)?;
        // The cache memoizes one causal mask per sequence length; it lives for this call only.
        let mut cache = Cache::new(false, self.dtype, &self.config, &self.device)?;
        let logits = self.model.forward(&input, 0, &mut cache)?;
        Ok(logits.to_dtype(DType::F32)?.to_vec2()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> LlamaLm {
        let config: LlamaConfig = serde_json::from_value(serde_json::json!({
            "hidden_size": 16,
            "intermediate_size": 32,
            "vocab_size": 24,
            "num_hidden_layers": 2,
            "num_attention_heads": 2,
            "num_key_value_heads": 2,
            "rms_norm_eps": 1e-5,
            "rope_theta": 10000.0,
            "max_position_embeddings": 64
        }))
        .unwrap();
        let config = config.into_config(false);
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = Llama::load(vb, &config).unwrap();
        LlamaLm::new(model, config, DType::F32, Device::Cpu)
    }

    #[test]
    fn test_next_logits_over_growing_sequences() {
        let mut lm = tiny_model();
        assert_eq!(lm.context_window(), 64);

        let mut rows = vec![vec![1u32], vec![2u32]];
        for _ in 0..12 {
            let logits = lm.next_logits(&rows).unwrap();
            assert_eq!(logits.len(), 2);
            assert!(logits.iter().all(|row| row.len() == 24));
            for row in rows.iter_mut() {
                row.push(3);
            }
        }
    }
}
