//! Sampler module - logit filtering and seeded token selection

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{GenerationError, Result};
use crate::service::TokenId;

/// Score given to entries removed by top-k filtering. Softmax maps it to 0.
pub const MASKED_LOGIT: f32 = -1e10;

/// Token sampler owning its random stream
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fixed seed when given, OS entropy otherwise.
    pub fn seeded(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(seed),
            None => Self {
                rng: StdRng::from_entropy(),
            },
        }
    }

    /// Draw an index with probability proportional to `weights`.
    ///
    /// Zero-weight entries are never returned.
    pub fn sample(&mut self, weights: &[f32]) -> Result<TokenId> {
        let dist = WeightedIndex::new(weights).map_err(|e| match e {
            WeightedError::NoItem | WeightedError::AllWeightsZero => {
                GenerationError::DegenerateDistribution
            }
            other => GenerationError::External(anyhow::anyhow!("invalid distribution: {other}")),
        })?;
        Ok(dist.sample(&mut self.rng) as TokenId)
    }

    /// Uniform index in `0..upper`.
    pub fn pick(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }
}

/// NaN never wins a comparison.
fn score(scores: &[f32], i: usize) -> f32 {
    let v = scores[i];
    if v.is_nan() {
        f32::NEG_INFINITY
    } else {
        v
    }
}

/// Higher score first, lower index first among equal scores.
fn rank(scores: &[f32], a: usize, b: usize) -> Ordering {
    score(scores, b)
        .total_cmp(&score(scores, a))
        .then(a.cmp(&b))
}

/// Index of the highest score. Ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    (0..scores.len()).min_by(|&a, &b| rank(scores, a, b))
}

/// Like [`argmax`], skipping every id in `excluded`.
pub fn argmax_excluding(scores: &[f32], excluded: &HashSet<TokenId>) -> Option<usize> {
    (0..scores.len())
        .filter(|&i| !excluded.contains(&(i as TokenId)))
        .min_by(|&a, &b| rank(scores, a, b))
}

/// The `k` best indices, best first.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.select_nth_unstable_by(k - 1, |&a, &b| rank(scores, a, b));
    indices.truncate(k);
    indices.sort_by(|&a, &b| rank(scores, a, b));
    indices
}

/// Keep the `k` best logits and push the rest to [`MASKED_LOGIT`].
///
/// `k == 0` or `k >= logits.len()` leaves the row untouched.
pub fn mask_top_k(logits: &mut [f32], k: usize) {
    if k == 0 || k >= logits.len() {
        return;
    }
    let mut keep = vec![false; logits.len()];
    for i in top_k_indices(logits, k) {
        keep[i] = true;
    }
    for (logit, keep) in logits.iter_mut().zip(keep) {
        if !keep {
            *logit = MASKED_LOGIT;
        }
    }
}

pub fn apply_temperature(logits: &mut [f32], temperature: f32) {
    if temperature != 1.0 {
        for logit in logits.iter_mut() {
            *logit /= temperature;
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exp.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_excluding() {
        let scores = [4.0, 9.0, 7.0, 9.0];
        let mut excluded = HashSet::new();
        excluded.insert(1);
        assert_eq!(argmax_excluding(&scores, &excluded), Some(3));
        excluded.insert(3);
        assert_eq!(argmax_excluding(&scores, &excluded), Some(2));
        excluded.extend([0, 2]);
        assert_eq!(argmax_excluding(&scores, &excluded), None);
    }

    #[test]
    fn test_top_k_indices_order() {
        let scores = [0.1, 0.9, 0.5, 0.9, 0.3];
        assert_eq!(top_k_indices(&scores, 3), vec![1, 3, 2]);
        assert_eq!(top_k_indices(&scores, 0), Vec::<usize>::new());
        assert_eq!(top_k_indices(&scores, 10).len(), 5);
    }

    #[test]
    fn test_mask_top_k() {
        let mut logits = vec![1.0, 5.0, 3.0, 4.0];
        mask_top_k(&mut logits, 2);
        assert_eq!(logits, vec![MASKED_LOGIT, 5.0, MASKED_LOGIT, 4.0]);

        let mut untouched = vec![1.0, 2.0];
        mask_top_k(&mut untouched, 0);
        assert_eq!(untouched, vec![1.0, 2.0]);
    }

    #[test]
    fn test_softmax_sums_to_one_and_drops_masked() {
        let probs = softmax(&[2.0, MASKED_LOGIT, 2.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(probs[1], 0.0);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_temperature_scales() {
        let mut logits = vec![2.0, -4.0];
        apply_temperature(&mut logits, 2.0);
        assert_eq!(logits, vec![1.0, -2.0]);
    }

    #[test]
    fn test_sampler_never_picks_zero_weight() {
        let mut sampler = Sampler::new(7);
        for _ in 0..200 {
            let token = sampler.sample(&[0.0, 0.3, 0.0, 0.7]).unwrap();
            assert!(token == 1 || token == 3);
        }
    }

    #[test]
    fn test_sampler_rejects_all_zero() {
        let mut sampler = Sampler::new(0);
        assert!(matches!(
            sampler.sample(&[0.0, 0.0]),
            Err(GenerationError::DegenerateDistribution)
        ));
    }

    #[test]
    fn test_same_seed_same_draws() {
        let weights = [0.2, 0.2, 0.2, 0.2, 0.2];
        let mut a = Sampler::new(42);
        let mut b = Sampler::new(42);
        for _ in 0..50 {
            assert_eq!(a.sample(&weights).unwrap(), b.sample(&weights).unwrap());
        }
    }
}
