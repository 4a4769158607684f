use anyhow::Result;
use clap::Args;
use parrot_core::backend::BertMaskedLm;
use parrot_core::{predict_masked, Candidate, FillMaskParams, ModelConfig};

use super::ModelArgs;

#[derive(Args, Debug)]
pub struct FillMaskArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// The sentence to use for word suggestion
    #[arg(long, default_value = "This is the story of a little dog named Boo.")]
    pub text: String,

    /// The word to mask for suggestion
    #[arg(long, default_value = "dog")]
    pub mask: String,

    /// Token the word is replaced with
    #[arg(long, default_value = "[MASK]")]
    pub mask_token: String,

    /// How many other options to list
    #[arg(long, default_value_t = 10)]
    pub alternatives: usize,
}

/// Token followed by its raw score.
fn scored(candidate: &Candidate) -> String {
    format!("{} ({:.4})", candidate.token, candidate.score)
}

pub fn run(args: FillMaskArgs) -> Result<()> {
    let (config, device) = args.model.resolve(ModelConfig::bert_base_uncased())?;
    let (mut model, vocab) = BertMaskedLm::load(&config, &device)?;

    let params = FillMaskParams {
        mask_token: args.mask_token,
        alternatives: args.alternatives,
    };
    let prediction = predict_masked(&mut model, &vocab, &args.text, &args.mask, &params)?;

    println!("Original: {}", prediction.original);
    println!("Masked: {}", prediction.masked.join(" "));
    println!("Predicted token: {}", scored(&prediction.predicted));
    println!("Other options:");
    for option in &prediction.alternatives {
        println!("{}", scored(option));
    }
    Ok(())
}
