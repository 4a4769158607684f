//! Masked-token prediction with a bidirectional encoder.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{GenerationError, Result};
use crate::request::FillMaskParams;
use crate::sampler::{argmax, argmax_excluding};
use crate::service::{MaskedLm, TokenId, Vocabulary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: TokenId,
    pub token: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaskPrediction {
    pub original: String,
    /// Tokenized sentence with the target replaced by the mask token.
    pub masked: Vec<String>,
    pub position: usize,
    pub predicted: Candidate,
    /// Runner-up predictions, best first, all distinct from `predicted`.
    pub alternatives: Vec<Candidate>,
}

fn candidate<V: Vocabulary + ?Sized>(vocab: &V, logits: &[f32], index: usize) -> Result<Candidate> {
    let id = index as TokenId;
    let token = vocab
        .id_to_token(id)
        .ok_or_else(|| GenerationError::UnknownToken(format!("#{id}")))?;
    Ok(Candidate {
        id,
        token,
        score: logits[index],
    })
}

/// Mask the first occurrence of `word` in `text` and predict it back.
///
/// The model runs once. Alternatives come from repeatedly taking the arg-max
/// over the ids not reported yet.
pub fn predict_masked<M, V>(
    model: &mut M,
    vocab: &V,
    text: &str,
    word: &str,
    params: &FillMaskParams,
) -> Result<MaskPrediction>
where
    M: MaskedLm + ?Sized,
    V: Vocabulary + ?Sized,
{
    let mut tokens = vocab.tokenize(text)?;
    let position = tokens
        .iter()
        .position(|t| t == word)
        .ok_or_else(|| GenerationError::NotFound {
            word: word.to_string(),
        })?;
    tokens[position] = params.mask_token.clone();
    debug!("Masked '{}' at position {} of {}", word, position, tokens.len());

    let ids = tokens
        .iter()
        .map(|t| vocab.require_id(t))
        .collect::<Result<Vec<_>>>()?;

    let logits = model.logits_at(&ids, position)?;
    let best = argmax(&logits).ok_or(GenerationError::DegenerateDistribution)?;
    let predicted = candidate(vocab, &logits, best)?;

    let mut reported: HashSet<TokenId> = HashSet::new();
    reported.insert(predicted.id);
    let mut alternatives = Vec::with_capacity(params.alternatives);
    while alternatives.len() < params.alternatives {
        let Some(next) = argmax_excluding(&logits, &reported) else {
            break;
        };
        reported.insert(next as TokenId);
        alternatives.push(candidate(vocab, &logits, next)?);
    }

    info!(
        "Predicted '{}' for '{}' with {} alternatives",
        predicted.token,
        word,
        alternatives.len()
    );

    Ok(MaskPrediction {
        original: text.to_string(),
        masked: tokens,
        position,
        predicted,
        alternatives,
    })
}
