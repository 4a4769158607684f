//! Greedy decoding that re-reads the whole sequence every step.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{GenerationError, Result};
use crate::request::GenerationResult;
use crate::sampler::argmax;
use crate::service::{CausalLm, TokenId};

/// Fail with `LengthExceeded` if `prefix + length` positions don't fit.
///
/// A sum that overflows `usize` is reported as `usize::MAX`.
pub fn check_window(prefix: usize, length: usize, window: usize) -> Result<()> {
    let requested = prefix.saturating_add(length);
    if requested > window {
        return Err(GenerationError::LengthExceeded { requested, window });
    }
    Ok(())
}

/// Extend `prompt` by `tokens_to_generate` arg-max tokens.
///
/// Each step feeds the full sequence and takes the highest-scoring entry of
/// the last position; ties go to the lowest id. Nothing stops generation
/// early.
pub fn generate_greedy<M: CausalLm + ?Sized>(
    model: &mut M,
    prompt: &[TokenId],
    tokens_to_generate: usize,
) -> Result<GenerationResult> {
    if prompt.is_empty() {
        return Err(GenerationError::input("prompt must contain at least one token"));
    }
    check_window(prompt.len(), tokens_to_generate, model.context_window())?;

    let start_time = Instant::now();
    let mut rows = vec![prompt.to_vec()];

    for step in 0..tokens_to_generate {
        let logits = model.next_logits(&rows)?;
        let last = logits
            .first()
            .ok_or_else(|| anyhow::anyhow!("model returned no logits"))?;
        let next = argmax(last).ok_or(GenerationError::DegenerateDistribution)? as TokenId;
        debug!("step {}: token {}", step, next);
        rows[0].push(next);
    }

    let tokens_per_second = if tokens_to_generate == 0 {
        0.0
    } else {
        tokens_to_generate as f64 / start_time.elapsed().as_secs_f64()
    };
    info!(
        "Generated {} tokens at {:.2} tok/s",
        tokens_to_generate, tokens_per_second
    );

    let tokens = rows.swap_remove(0);
    Ok(GenerationResult {
        tokens,
        prompt_tokens: prompt.len(),
        generated_tokens: tokens_to_generate,
        tokens_per_second,
    })
}
