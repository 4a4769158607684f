//! Contract for the external model service.
//!
//! Tokenization, weights and the forward pass live behind these traits. The
//! generation loops only ever see token ids, logit vectors and an opaque
//! recurrent state.

use crate::error::{GenerationError, Result};

/// Index of an entry in a model vocabulary.
pub type TokenId = u32;

/// Bidirectional mapping between text, token strings and token ids.
pub trait Vocabulary {
    /// Split `text` into the vocabulary's token strings, without special tokens.
    fn tokenize(&self, text: &str) -> anyhow::Result<Vec<String>>;

    fn token_to_id(&self, token: &str) -> Option<TokenId>;

    fn id_to_token(&self, id: TokenId) -> Option<String>;

    /// Number of entries, special tokens included.
    fn size(&self) -> usize;

    /// Tokenizer-level decoding of a run of ids into text.
    fn decode(&self, ids: &[TokenId]) -> anyhow::Result<String>;

    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        self.tokenize(text)?
            .iter()
            .map(|token| self.require_id(token))
            .collect()
    }

    fn require_id(&self, token: &str) -> Result<TokenId> {
        self.token_to_id(token)
            .ok_or_else(|| GenerationError::UnknownToken(token.to_string()))
    }

    /// Display strings for `ids`, in order.
    fn symbols(&self, ids: &[TokenId]) -> Result<Vec<String>> {
        ids.iter()
            .map(|&id| {
                self.id_to_token(id)
                    .ok_or_else(|| GenerationError::UnknownToken(format!("#{id}")))
            })
            .collect()
    }
}

/// Bidirectional encoder scoring every position of a sequence in one pass.
pub trait MaskedLm {
    /// Vocabulary scores for `position` after a single forward pass over `ids`.
    fn logits_at(&mut self, ids: &[TokenId], position: usize) -> anyhow::Result<Vec<f32>>;
}

/// Autoregressive model that re-reads the whole sequence on every call.
pub trait CausalLm {
    /// Maximum number of positions the model can attend over.
    fn context_window(&self) -> usize;

    /// Logits for the position following each row. Rows share one length.
    fn next_logits(&mut self, rows: &[Vec<TokenId>]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Autoregressive model that summarises history in a carried state.
///
/// The state is produced by one call and consumed by the next; callers never
/// look inside it.
pub trait RecurrentLm {
    type State;

    /// Read the full context and return next-token logits with a fresh state.
    fn prime(&mut self, context: &[TokenId]) -> anyhow::Result<(Vec<f32>, Self::State)>;

    /// Advance by exactly one token.
    fn step(&mut self, token: TokenId, state: Self::State)
        -> anyhow::Result<(Vec<f32>, Self::State)>;
}
