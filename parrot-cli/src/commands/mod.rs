pub mod fill_mask;
pub mod greedy;
pub mod recurrent;
pub mod sample;

use anyhow::Result;
use candle_core::Device;
use clap::{Args, ValueEnum};
use parrot_core::{select_device, DetokScheme, Detokenizer, ModelConfig, Vocabulary};
use tracing::info;

/// Model selection shared by every subcommand
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Pretrained model id on the HuggingFace Hub, or a local checkpoint directory
    #[arg(long = "model", env = "PARROT_MODEL")]
    pub model_name_or_path: Option<String>,

    /// Hub revision to download
    #[arg(long)]
    pub revision: Option<String>,

    /// Repo or directory holding tokenizer.json, when the model has none
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Run on CPU even if an accelerator is available
    #[arg(long)]
    pub cpu: bool,
}

impl ModelArgs {
    /// Overlay the flags on a preset and pick the device.
    pub fn resolve(&self, preset: ModelConfig) -> Result<(ModelConfig, Device)> {
        let device = select_device(self.cpu)?;
        let mut config = match &self.model_name_or_path {
            Some(id) => ModelConfig {
                model_id: id.clone(),
                ..preset
            },
            None => preset,
        };
        if let Some(revision) = &self.revision {
            config.revision = revision.clone();
        }
        if let Some(tokenizer) = &self.tokenizer {
            config.tokenizer_id = Some(tokenizer.clone());
        }
        info!(
            "Model: {} ({}) on {:?} as {:?}",
            config.model_id,
            config.revision,
            device,
            config.dtype_for(&device)
        );
        Ok((config, device))
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum DetokArg {
    /// Guess from the vocabulary
    #[default]
    Auto,
    ByteLevel,
    WordEnd,
    Wikitext,
}

impl DetokArg {
    pub fn detokenizer<V: Vocabulary + ?Sized>(self, vocab: &V) -> Detokenizer {
        let scheme = match self {
            DetokArg::Auto => DetokScheme::detect(vocab),
            DetokArg::ByteLevel => DetokScheme::ByteLevel,
            DetokArg::WordEnd => DetokScheme::WordEnd,
            DetokArg::Wikitext => DetokScheme::WikiText,
        };
        info!("Detokenizing as {:?}", scheme);
        Detokenizer::new(scheme)
    }
}
