//! Batched sampling with temperature and top-k filtering.

use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::error::{GenerationError, Result};
use crate::greedy::check_window;
use crate::request::{Conditioning, SamplingParams};
use crate::sampler::{apply_temperature, argmax, mask_top_k, softmax, Sampler};
use crate::service::{CausalLm, TokenId};

/// Rows produced by [`sample_sequence`], each prefix plus continuation
#[derive(Debug, Clone, Serialize)]
pub struct SampledBatch {
    pub rows: Vec<Vec<TokenId>>,
    /// Length of the shared conditioning prefix at the start of every row.
    pub prefix_len: usize,
}

impl SampledBatch {
    pub fn continuations(&self) -> impl Iterator<Item = &[TokenId]> + '_ {
        self.rows.iter().map(move |row| &row[self.prefix_len..])
    }
}

/// Generate `params.batch_size` independent rows of `params.length` new tokens.
///
/// Exactly one of `start_token` and `context` must be given.
pub fn sample_sequence<M: CausalLm + ?Sized>(
    model: &mut M,
    start_token: Option<TokenId>,
    context: Option<Vec<TokenId>>,
    params: &SamplingParams,
) -> Result<SampledBatch> {
    sample_sequence_with_progress(model, start_token, context, params, |_, _| {})
}

/// [`sample_sequence`] calling `progress(done, total)` after every step.
pub fn sample_sequence_with_progress<M, F>(
    model: &mut M,
    start_token: Option<TokenId>,
    context: Option<Vec<TokenId>>,
    params: &SamplingParams,
    mut progress: F,
) -> Result<SampledBatch>
where
    M: CausalLm + ?Sized,
    F: FnMut(usize, usize),
{
    let conditioning = Conditioning::from_parts(start_token, context)?;
    params.validate()?;
    check_window(conditioning.len(), params.length, model.context_window())?;

    let _span = info_span!(
        "sample_sequence",
        batch_size = params.batch_size,
        length = params.length,
        top_k = params.top_k
    )
    .entered();

    let prefix = conditioning.prefix();
    let prefix_len = prefix.len();
    let mut rows = vec![prefix; params.batch_size];
    let mut sampler = Sampler::seeded(params.seed);

    for step in 0..params.length {
        let logits = model.next_logits(&rows)?;
        if logits.len() != rows.len() {
            return Err(GenerationError::External(anyhow::anyhow!(
                "model returned {} logit rows for a batch of {}",
                logits.len(),
                rows.len()
            )));
        }

        for (row, mut scores) in rows.iter_mut().zip(logits) {
            apply_temperature(&mut scores, params.temperature);
            mask_top_k(&mut scores, params.top_k);
            let token = if params.sample {
                sampler.sample(&softmax(&scores))?
            } else {
                argmax(&scores).ok_or(GenerationError::DegenerateDistribution)? as TokenId
            };
            row.push(token);
        }
        debug!("step {} done", step);
        progress(step + 1, params.length);
    }

    info!(
        "Sampled {} rows of {} tokens",
        rows.len(),
        params.length
    );
    Ok(SampledBatch { rows, prefix_len })
}
