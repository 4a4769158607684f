//! BERT masked-language model on candle.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertForMaskedLM, Config};
use tracing::info;

use crate::backend::vocab::HfVocabulary;
use crate::model::{load_tokenizer, ModelConfig, ModelFiles};
use crate::service::{MaskedLm, TokenId};

pub struct BertMaskedLm {
    model: BertForMaskedLM,
    device: Device,
}

impl BertMaskedLm {
    /// Load a BERT checkpoint with its MLM head, plus its tokenizer.
    pub fn load(config: &ModelConfig, device: &Device) -> Result<(Self, HfVocabulary)> {
        info!("Loading model: {}", config.model_id);
        let files = ModelFiles::open(&config.model_id, &config.revision)?;
        let tokenizer = load_tokenizer(config, &files)?;
        let bert_config: Config = files.config()?;

        info!("Loading model weights...");
        let filenames = files.safetensors()?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&filenames, config.dtype_for(device), device)?
        };
        let model = BertForMaskedLM::load(vb, &bert_config)
            .map_err(|e| anyhow!("Failed to load model: {}", e))?;

        info!("Model loaded successfully!");
        info!("  - Vocab size: {}", bert_config.vocab_size);
        info!("  - Hidden size: {}", bert_config.hidden_size);
        info!("  - Layers: {}", bert_config.num_hidden_layers);

        Ok((
            Self {
                model,
                device: device.clone(),
            },
            HfVocabulary::new(tokenizer),
        ))
    }
}

impl MaskedLm for BertMaskedLm {
    fn logits_at(&mut self, ids: &[TokenId], position: usize) -> Result<Vec<f32>> {
        let input = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        // Single sentence: every position belongs to segment A.
        let segments = input.zeros_like()?;
        let predictions = self.model.forward(&input, &segments, None)?;
        let scores = predictions.i((0, position))?.to_dtype(DType::F32)?;
        Ok(scores.to_vec1()?)
    }
}
