//! Parrot Core - single-shot inference loops over pretrained language models
//!
//! This crate implements:
//! - Masked-token prediction with ranked alternatives
//! - Greedy decoding that re-encodes the whole sequence each step
//! - Batched temperature / top-k sampling
//! - Incremental decoding with a carried recurrent state
//! - Detokenization rules for common vocabulary families
//!
//! Models and tokenizers sit behind the traits in [`service`]; [`backend`]
//! provides candle-transformers implementations loaded from the HuggingFace Hub.

pub mod error;
pub mod service;
pub mod request;
pub mod sampler;
pub mod detok;
pub mod masked;
pub mod greedy;
pub mod sampling;
pub mod recurrent;
pub mod model;
pub mod backend;

pub use error::{GenerationError, Result};
pub use service::{CausalLm, MaskedLm, RecurrentLm, TokenId, Vocabulary};
pub use request::{Conditioning, FillMaskParams, GenerationResult, RecurrentParams, SamplingParams};
pub use sampler::Sampler;
pub use detok::{DetokScheme, Detokenizer};
pub use masked::{predict_masked, Candidate, MaskPrediction};
pub use greedy::generate_greedy;
pub use sampling::{sample_sequence, sample_sequence_with_progress, SampledBatch};
pub use recurrent::{end_marked_context, generate_recurrent};
pub use model::{select_device, ModelConfig, ModelFiles};
