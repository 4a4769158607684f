//! Property-based tests for logit filtering and detokenization.
//!
//! # Key invariants
//! - a top-k sampled token is always one of the k best pre-mask scores
//! - arg-max ties resolve to the lowest index
//! - the WikiText rewrite pass is idempotent

mod common;

use common::ScriptedCausalLm;
use parrot_core::detok::rewrite_wikitext;
use parrot_core::sampler::{argmax, mask_top_k, softmax, top_k_indices, MASKED_LOGIT};
use parrot_core::{sample_sequence, SamplingParams};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Small integer-valued scores so that ties are frequent.
fn tied_scores() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec((-4i32..4).prop_map(|v| v as f32), 1..40)
}

fn scores() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-20.0f32..20.0, 2..60)
}

/// Text assembled from the pieces the rewrite table works on.
fn wikitext() -> impl Strategy<Value = String> {
    let piece = prop::sample::select(vec![
        " ", "@-@", "@,@", "@.@", ".", ",", ":", ";", "'s", "(", ")", "low", "cost", "\n",
    ]);
    prop::collection::vec(piece, 0..30).prop_map(|pieces| pieces.join(" "))
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_argmax_picks_first_maximum(values in tied_scores()) {
        let best = argmax(&values).unwrap();
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        prop_assert_eq!(values[best], max);
        prop_assert!(values[..best].iter().all(|&v| v < max));
    }

    #[test]
    fn prop_top_k_indices_are_the_best(values in tied_scores(), k in 1usize..10) {
        let top = top_k_indices(&values, k);
        prop_assert_eq!(top.len(), k.min(values.len()));
        let worst_kept = top.iter().map(|&i| values[i]).fold(f32::INFINITY, f32::min);
        for (i, &v) in values.iter().enumerate() {
            if !top.contains(&i) {
                prop_assert!(v <= worst_kept);
            }
        }
    }

    #[test]
    fn prop_mask_top_k_zeroes_everything_else(values in scores(), k in 1usize..8) {
        let mut masked = values.clone();
        mask_top_k(&mut masked, k);
        let probs = softmax(&masked);
        let kept = top_k_indices(&values, k);
        for (i, p) in probs.iter().enumerate() {
            if kept.contains(&i) || k >= values.len() {
                prop_assert_ne!(masked[i], MASKED_LOGIT);
            } else {
                prop_assert_eq!(*p, 0.0);
            }
        }
    }

    #[test]
    fn prop_sampled_tokens_come_from_top_k(
        step_scores in prop::collection::vec(scores(), 1..5),
        k in 1usize..5,
        seed in any::<u64>(),
    ) {
        let vocab = step_scores.iter().map(Vec::len).min().unwrap();
        let steps: Vec<Vec<f32>> = step_scores.iter().map(|s| s[..vocab].to_vec()).collect();
        let params = SamplingParams {
            length: steps.len(),
            batch_size: 2,
            top_k: k,
            seed: Some(seed),
            ..Default::default()
        };

        let batch = sample_sequence(&mut ScriptedCausalLm::new(steps.clone()), Some(0), None, &params)
            .unwrap();

        for row in batch.continuations() {
            for (step, &token) in row.iter().enumerate() {
                let allowed = top_k_indices(&steps[step], k);
                prop_assert!(allowed.contains(&(token as usize)));
            }
        }
    }

    #[test]
    fn prop_wikitext_rewrite_is_idempotent(text in wikitext()) {
        let once = rewrite_wikitext(&text);
        prop_assert_eq!(rewrite_wikitext(&once), once);
    }
}
