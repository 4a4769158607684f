use anyhow::Result;
use clap::Args;
use parrot_core::backend::LlamaLm;
use parrot_core::{generate_greedy, ModelConfig, Vocabulary};

use super::{DetokArg, ModelArgs};

#[derive(Args, Debug)]
pub struct GreedyArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// The sentence used to initiate generation
    #[arg(long, default_value = "This is the story of a little dog named Boo.")]
    pub text: String,

    /// Number of tokens to generate after the end of the sentence
    #[arg(long, default_value_t = 30)]
    pub tokens_to_generate: usize,

    #[arg(long, value_enum, default_value_t = DetokArg::Auto)]
    pub detokenizer: DetokArg,
}

pub fn run(args: GreedyArgs) -> Result<()> {
    let (config, device) = args.model.resolve(ModelConfig::smollm_135m())?;
    let (mut model, vocab) = LlamaLm::load(&config, &device)?;
    let detok = args.detokenizer.detokenizer(&vocab);

    let prompt = vocab.encode(&args.text)?;
    let result = generate_greedy(&mut model, &prompt, args.tokens_to_generate)?;

    println!("{}", result.render(&vocab, &detok)?);
    Ok(())
}
