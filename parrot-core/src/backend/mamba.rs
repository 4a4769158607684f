//! Mamba selective state-space model on candle.
//!
//! The whole history is summarised in a fixed-size [`State`], so each step
//! costs the same regardless of how much text came before.

use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::mamba::{Config, Model, State};
use tracing::info;

use crate::backend::vocab::HfVocabulary;
use crate::model::{load_tokenizer, ModelConfig, ModelFiles};
use crate::service::{RecurrentLm, TokenId};

/// Carried state of one Mamba decoding run
pub struct MambaState(State);

pub struct MambaLm {
    model: Model,
    config: Config,
    dtype: DType,
    device: Device,
}

impl MambaLm {
    pub fn load(config: &ModelConfig, device: &Device) -> Result<(Self, HfVocabulary)> {
        info!("Loading model: {}", config.model_id);
        let files = ModelFiles::open(&config.model_id, &config.revision)?;
        let tokenizer = load_tokenizer(config, &files)?;
        let mamba_config: Config = files.config()?;

        info!("Loading model weights...");
        let filenames = files.safetensors()?;
        let dtype = config.dtype_for(device);
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&filenames, dtype, device)? };
        let model = Model::new(&mamba_config, vb.pp("backbone"))
            .map_err(|e| anyhow!("Failed to load model: {}", e))?;

        info!("Model loaded successfully!");
        info!("  - Vocab size: {}", mamba_config.vocab_size);
        info!("  - Hidden size: {}", mamba_config.d_model);
        info!("  - Layers: {}", mamba_config.n_layer);

        Ok((
            Self {
                model,
                config: mamba_config,
                dtype,
                device: device.clone(),
            },
            HfVocabulary::new(tokenizer),
        ))
    }

    fn forward(&self, token: TokenId, state: &mut State) -> Result<Vec<f32>> {
        let input = Tensor::new(&[token], &self.device)?;
        let logits = self.model.forward(&input, state)?;
        let mut logits: Vec<f32> = logits.squeeze(0)?.to_dtype(DType::F32)?.to_vec1()?;
        // The head is padded past the real vocabulary.
        logits.truncate(self.config.vocab_size);
        Ok(logits)
    }
}

impl RecurrentLm for MambaLm {
    type State = MambaState;

    fn prime(&mut self, context: &[TokenId]) -> Result<(Vec<f32>, MambaState)> {
        let Some((&last, head)) = context.split_last() else {
            bail!("cannot prime on an empty context");
        };
        let mut state = State::new(1, &self.config, self.dtype, &self.device)?;
        for &token in head {
            self.forward(token, &mut state)?;
        }
        let logits = self.forward(last, &mut state)?;
        Ok((logits, MambaState(state)))
    }

    fn step(&mut self, token: TokenId, state: MambaState) -> Result<(Vec<f32>, MambaState)> {
        let MambaState(mut state) = state;
        let logits = self.forward(token, &mut state)?;
        Ok((logits, MambaState(state)))
    }
}
