use serde::{Deserialize, Serialize};

use crate::detok::Detokenizer;
use crate::error::{GenerationError, Result};
use crate::service::{TokenId, Vocabulary};

/// What every row of a sampled batch starts from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conditioning {
    /// Unconditional generation from one seed token.
    StartToken(TokenId),
    /// Conditional generation from an encoded prompt.
    Context(Vec<TokenId>),
}

impl Conditioning {
    /// Exactly one of the two must be supplied.
    pub fn from_parts(start_token: Option<TokenId>, context: Option<Vec<TokenId>>) -> Result<Self> {
        match (start_token, context) {
            (Some(token), None) => Ok(Conditioning::StartToken(token)),
            (None, Some(context)) if !context.is_empty() => Ok(Conditioning::Context(context)),
            (None, Some(_)) => Err(GenerationError::input("context must not be empty")),
            _ => Err(GenerationError::input(
                "specify exactly one of start_token and context",
            )),
        }
    }

    pub fn prefix(&self) -> Vec<TokenId> {
        match self {
            Conditioning::StartToken(token) => vec![*token],
            Conditioning::Context(context) => context.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Conditioning::StartToken(_) => 1,
            Conditioning::Context(context) => context.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parameters for top-k filtered batch sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingParams {
    /// New tokens per row.
    pub length: usize,
    pub batch_size: usize,
    /// Divides the logits before softmax. Must be positive.
    pub temperature: f32,
    /// 0 disables filtering.
    pub top_k: usize,
    /// Draw from the distribution instead of taking the arg-max.
    pub sample: bool,
    pub seed: Option<u64>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            length: 20,
            batch_size: 1,
            temperature: 1.0,
            top_k: 0,
            sample: true,
            seed: Some(0),
        }
    }
}

impl SamplingParams {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(GenerationError::input("batch_size must be at least 1"));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(GenerationError::input(format!(
                "temperature must be a positive number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Parameters for the cached recurrent generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentParams {
    pub tokens_to_generate: usize,
    /// Size of the candidate pool each token is drawn from.
    pub select_from_k: usize,
    pub seed: Option<u64>,
}

impl Default for RecurrentParams {
    fn default() -> Self {
        Self {
            tokens_to_generate: 40,
            select_from_k: 40,
            seed: None,
        }
    }
}

/// Parameters for masked-token prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillMaskParams {
    pub mask_token: String,
    /// How many runner-up predictions to report.
    pub alternatives: usize,
}

impl Default for FillMaskParams {
    fn default() -> Self {
        Self {
            mask_token: "[MASK]".to_string(),
            alternatives: 10,
        }
    }
}

/// Result of a single generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// Prompt followed by the generated tokens
    pub tokens: Vec<TokenId>,
    /// Number of prompt tokens
    pub prompt_tokens: usize,
    /// Number of generated tokens
    pub generated_tokens: usize,
    /// Tokens per second
    pub tokens_per_second: f64,
}

impl GenerationResult {
    pub fn prompt(&self) -> &[TokenId] {
        &self.tokens[..self.prompt_tokens]
    }

    pub fn continuation(&self) -> &[TokenId] {
        &self.tokens[self.prompt_tokens..]
    }

    /// Full text through the vocabulary's display strings.
    pub fn render<V: Vocabulary + ?Sized>(&self, vocab: &V, detok: &Detokenizer) -> Result<String> {
        Ok(detok.render(&vocab.symbols(&self.tokens)?))
    }
}
