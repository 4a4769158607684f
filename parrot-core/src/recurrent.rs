//! Incremental decoding with a carried recurrent state.
//!
//! The context is read once; afterwards each step hands the model only the
//! token it just produced, together with the state returned by the previous
//! step.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{GenerationError, Result};
use crate::request::{GenerationResult, RecurrentParams};
use crate::sampler::{softmax, top_k_indices, Sampler};
use crate::service::{RecurrentLm, TokenId, Vocabulary};

/// Tokenize every line of `text` on its own, close each with `end_marker`
/// and flatten the result.
pub fn end_marked_context<V: Vocabulary + ?Sized>(
    vocab: &V,
    text: &str,
    end_marker: &str,
) -> Result<Vec<TokenId>> {
    let end = vocab.require_id(end_marker)?;
    let mut context = Vec::new();
    for line in text.split('\n') {
        context.extend(vocab.encode(line.trim())?);
        context.push(end);
    }
    Ok(context)
}

/// Draw the next token: `unk` gets probability 0, then the `k` most likely
/// tokens are renormalized and sampled.
fn choose(
    sampler: &mut Sampler,
    logits: &[f32],
    unk: Option<TokenId>,
    k: usize,
) -> Result<TokenId> {
    let mut probs = softmax(logits);
    if let Some(slot) = unk.and_then(|id| probs.get_mut(id as usize)) {
        *slot = 0.0;
    }
    let candidates = top_k_indices(&probs, k);
    let weights: Vec<f32> = candidates.iter().map(|&i| probs[i]).collect();
    let pick = sampler.sample(&weights)? as usize;
    Ok(candidates[pick] as TokenId)
}

/// Generate `params.tokens_to_generate` tokens after `context`.
pub fn generate_recurrent<M: RecurrentLm + ?Sized>(
    model: &mut M,
    context: &[TokenId],
    unk: Option<TokenId>,
    params: &RecurrentParams,
) -> Result<GenerationResult> {
    if context.is_empty() {
        return Err(GenerationError::input("context must contain at least one token"));
    }
    if params.select_from_k == 0 {
        return Err(GenerationError::input("select_from_k must be at least 1"));
    }

    let mut tokens = context.to_vec();
    let total = params.tokens_to_generate;
    if total == 0 {
        return Ok(GenerationResult {
            tokens,
            prompt_tokens: context.len(),
            generated_tokens: 0,
            tokens_per_second: 0.0,
        });
    }

    let start_time = Instant::now();
    let mut sampler = Sampler::seeded(params.seed);
    let (mut logits, mut state) = model.prime(context)?;

    for i in 0..total {
        let token = choose(&mut sampler, &logits, unk, params.select_from_k)?;
        debug!("step {}: token {}", i, token);
        tokens.push(token);
        if i + 1 < total {
            let (next_logits, next_state) = model.step(token, state)?;
            logits = next_logits;
            state = next_state;
        }
    }

    let tokens_per_second = total as f64 / start_time.elapsed().as_secs_f64();
    info!("Generated {} tokens at {:.2} tok/s", total, tokens_per_second);

    Ok(GenerationResult {
        tokens,
        prompt_tokens: context.len(),
        generated_tokens: total,
        tokens_per_second,
    })
}
