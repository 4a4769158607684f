use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use parrot_core::backend::{HfVocabulary, LlamaLm};
use parrot_core::{
    sample_sequence_with_progress, CausalLm, ModelConfig, Sampler, SamplingParams, TokenId,
    Vocabulary,
};
use tracing::info;

use super::ModelArgs;

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Prompt to condition on; prompts are read from stdin when omitted
    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Total samples per prompt
    #[arg(long, default_value_t = 1)]
    pub nsamples: usize,

    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    /// New tokens per sample; half the context window when omitted
    #[arg(long)]
    pub length: Option<usize>,

    #[arg(long, default_value_t = 1.0)]
    pub temperature: f32,

    /// Sample among the k best tokens only; 0 keeps the whole vocabulary
    #[arg(long, default_value_t = 0)]
    pub top_k: usize,

    /// Start from a random vocabulary token instead of a prompt
    #[arg(long)]
    pub unconditional: bool,

    /// Take the arg-max instead of sampling
    #[arg(long)]
    pub greedy: bool,
}

struct Session {
    model: LlamaLm,
    vocab: HfVocabulary,
    params: SamplingParams,
    nsamples: usize,
    /// Batches run so far; each batch gets its own seed.
    batches: u64,
}

impl Session {
    fn run_round(&mut self, start_token: Option<TokenId>, context: Option<Vec<TokenId>>) -> Result<()> {
        let mut generated = 0;
        for _ in 0..self.nsamples / self.params.batch_size {
            let params = SamplingParams {
                seed: self.params.seed.map(|seed| seed.wrapping_add(self.batches)),
                ..self.params.clone()
            };
            self.batches += 1;

            let bar = ProgressBar::new(params.length as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")?,
            );
            let batch = sample_sequence_with_progress(
                &mut self.model,
                start_token,
                context.clone(),
                &params,
                |done, _| bar.set_position(done as u64),
            )?;
            bar.finish_and_clear();

            for continuation in batch.continuations() {
                generated += 1;
                let text = self.vocab.decode(continuation)?;
                println!("{} SAMPLE {} {}", "=".repeat(40), generated, "=".repeat(40));
                println!("{}", text);
            }
        }
        println!("{}", "=".repeat(80));
        Ok(())
    }
}

/// Next non-empty prompt from stdin, or `None` at end of input.
fn read_prompt(input: &mut impl BufRead) -> Result<Option<String>> {
    loop {
        print!("Model prompt >>> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let prompt = line.trim_end_matches(&['\r', '\n'][..]);
        if !prompt.is_empty() {
            return Ok(Some(prompt.to_string()));
        }
        println!("Prompt should not be empty!");
    }
}

/// Next prompt that encodes to at least one token, or `None` at end of input.
fn read_context<V: Vocabulary + ?Sized>(
    input: &mut impl BufRead,
    vocab: &V,
) -> Result<Option<Vec<TokenId>>> {
    while let Some(prompt) = read_prompt(input)? {
        let context = vocab.encode(&prompt)?;
        if !context.is_empty() {
            return Ok(Some(context));
        }
        println!("Prompt should not be empty!");
    }
    Ok(None)
}

pub fn run(args: SampleArgs) -> Result<()> {
    if args.batch_size == 0 || args.nsamples % args.batch_size != 0 {
        bail!(
            "nsamples ({}) must be a multiple of batch_size ({})",
            args.nsamples,
            args.batch_size
        );
    }

    let (config, device) = args.model.resolve(ModelConfig::smollm_135m())?;
    let (model, vocab) = LlamaLm::load(&config, &device)?;

    let window = model.context_window();
    let length = args.length.unwrap_or(window / 2);
    info!("Sampling {} tokens per sample (window {})", length, window);

    let mut session = Session {
        model,
        vocab,
        params: SamplingParams {
            length,
            batch_size: args.batch_size,
            temperature: args.temperature,
            top_k: args.top_k,
            sample: !args.greedy,
            seed: Some(args.seed),
        },
        nsamples: args.nsamples,
        batches: 0,
    };

    if args.unconditional {
        let start = Sampler::new(args.seed).pick(session.vocab.size()) as TokenId;
        let start_word = session.vocab.id_to_token(start).unwrap_or_default();
        println!("Using start word :{}", start_word);
        return session.run_round(Some(start), None);
    }

    if let Some(prompt) = &args.prompt {
        let context = session.vocab.encode(prompt)?;
        return session.run_round(None, Some(context));
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    while let Some(context) = read_context(&mut input, &session.vocab)? {
        session.run_round(None, Some(context))?;
    }
    Ok(())
}
