//! Parrot - command-line demos for pretrained language models
//!
//! Run with:
//!   parrot fill-mask --text "This is the story of a little dog named Boo." --mask dog
//!   parrot greedy --text "The best programming language is" --tokens-to-generate 30
//!   parrot sample --top-k 40 --temperature 0.8 --nsamples 4 --batch-size 2
//!   parrot recurrent --text "Traditional Chinese literary" --select-from-k 40

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{fill_mask, greedy, recurrent, sample};

#[derive(Parser)]
#[command(name = "parrot")]
#[command(about = "Masked-token prediction and text generation with pretrained language models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask one word of a sentence and predict it back with a BERT model
    FillMask(fill_mask::FillMaskArgs),

    /// Extend a prompt one arg-max token at a time
    Greedy(greedy::GreedyArgs),

    /// Sample batches of continuations with temperature and top-k filtering
    Sample(sample::SampleArgs),

    /// Generate with a recurrent model that carries its state between steps
    Recurrent(recurrent::RecurrentArgs),
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::FillMask(args) => fill_mask::run(args),
        Commands::Greedy(args) => greedy::run(args),
        Commands::Sample(args) => sample::run(args),
        Commands::Recurrent(args) => recurrent::run(args),
    }
}
