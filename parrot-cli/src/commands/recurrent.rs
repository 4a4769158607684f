use anyhow::{anyhow, Result};
use clap::Args;
use parrot_core::backend::MambaLm;
use parrot_core::{
    end_marked_context, generate_recurrent, ModelConfig, RecurrentParams, Vocabulary,
};
use tracing::{info, warn};

use super::{DetokArg, ModelArgs};

/// Tried in order when no end marker is given.
const END_MARKERS: [&str; 3] = ["<eos>", "<|endoftext|>", "</s>"];

#[derive(Args, Debug)]
pub struct RecurrentArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// The sentences used to initiate generation, one per line
    #[arg(long, default_value = "Traditional Chinese literary")]
    pub text: String,

    /// Number of tokens to generate after the end of the sentence
    #[arg(long, default_value_t = 40)]
    pub tokens_to_generate: usize,

    /// From how many top tokens at each iteration, random selection will be made
    #[arg(long, default_value_t = 40)]
    pub select_from_k: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Token closing every prompt line, printed as a line break
    #[arg(long)]
    pub end_marker: Option<String>,

    /// Token that must never be generated
    #[arg(long, default_value = "<unk>")]
    pub unk_token: String,

    #[arg(long, value_enum, default_value_t = DetokArg::Auto)]
    pub detokenizer: DetokArg,
}

pub fn run(args: RecurrentArgs) -> Result<()> {
    let (config, device) = args.model.resolve(ModelConfig::mamba_130m())?;
    let (mut model, vocab) = MambaLm::load(&config, &device)?;

    let end_marker = match args.end_marker {
        Some(marker) => marker,
        None => END_MARKERS
            .iter()
            .find(|m| vocab.token_to_id(m).is_some())
            .map(|m| m.to_string())
            .ok_or_else(|| anyhow!("no end marker in the vocabulary; pass --end-marker"))?,
    };
    info!("Closing prompt lines with {}", end_marker);

    let unk = vocab.token_to_id(&args.unk_token);
    if unk.is_none() {
        warn!("{} is not in the vocabulary; nothing is suppressed", args.unk_token);
    }

    let context = end_marked_context(&vocab, &args.text, &end_marker)?;
    let params = RecurrentParams {
        tokens_to_generate: args.tokens_to_generate,
        select_from_k: args.select_from_k,
        seed: args.seed,
    };
    let result = generate_recurrent(&mut model, &context, unk, &params)?;

    let detok = args.detokenizer.detokenizer(&vocab).with_end_marker(end_marker);
    println!("{}", result.render(&vocab, &detok)?);
    Ok(())
}
