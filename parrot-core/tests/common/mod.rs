//! Deterministic stand-ins for the model service.

#![allow(dead_code)]

use std::collections::HashMap;

use parrot_core::{CausalLm, MaskedLm, RecurrentLm, TokenId, Vocabulary};

/// Whitespace tokenizer over a fixed word list
pub struct MockVocab {
    words: Vec<String>,
    ids: HashMap<String, TokenId>,
}

impl MockVocab {
    pub fn new(words: &[&str]) -> Self {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        let ids = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as TokenId))
            .collect();
        Self { words, ids }
    }

    /// `tok0 .. tok{n-1}`
    pub fn numbered(n: usize) -> Self {
        let words: Vec<String> = (0..n).map(|i| format!("tok{i}")).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        Self::new(&refs)
    }
}

impl Vocabulary for MockVocab {
    fn tokenize(&self, text: &str) -> anyhow::Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.ids.get(token).copied()
    }

    fn id_to_token(&self, id: TokenId) -> Option<String> {
        self.words.get(id as usize).cloned()
    }

    fn size(&self) -> usize {
        self.words.len()
    }

    fn decode(&self, ids: &[TokenId]) -> anyhow::Result<String> {
        Ok(self.symbols(ids)?.join(" "))
    }
}

/// Returns the same scores for every position and records each call
pub struct FixedMaskedLm {
    pub scores: Vec<f32>,
    pub calls: Vec<(Vec<TokenId>, usize)>,
}

impl FixedMaskedLm {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            calls: Vec::new(),
        }
    }
}

impl MaskedLm for FixedMaskedLm {
    fn logits_at(&mut self, ids: &[TokenId], position: usize) -> anyhow::Result<Vec<f32>> {
        self.calls.push((ids.to_vec(), position));
        Ok(self.scores.clone())
    }
}

/// Scores depend only on the row contents: the favourite next token is a
/// hash of the row, and scores fall off with distance from it.
pub struct HashCausalLm {
    pub vocab_size: usize,
    pub window: usize,
    pub calls: usize,
    pub seen_lengths: Vec<usize>,
}

impl HashCausalLm {
    pub fn new(vocab_size: usize, window: usize) -> Self {
        Self {
            vocab_size,
            window,
            calls: 0,
            seen_lengths: Vec::new(),
        }
    }

    pub fn favourite(&self, row: &[TokenId]) -> usize {
        let sum: u64 = row.iter().map(|&t| t as u64).sum();
        ((sum * 7 + row.len() as u64) % self.vocab_size as u64) as usize
    }

    pub fn scores(&self, row: &[TokenId]) -> Vec<f32> {
        let fav = self.favourite(row) as f32;
        (0..self.vocab_size)
            .map(|i| -((i as f32 - fav).abs()))
            .collect()
    }
}

impl CausalLm for HashCausalLm {
    fn context_window(&self) -> usize {
        self.window
    }

    fn next_logits(&mut self, rows: &[Vec<TokenId>]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls += 1;
        self.seen_lengths.push(rows[0].len());
        Ok(rows.iter().map(|row| self.scores(row)).collect())
    }
}

/// Plays back one score vector per step, shared by every row
pub struct ScriptedCausalLm {
    pub steps: Vec<Vec<f32>>,
    pub window: usize,
    pub calls: usize,
}

impl ScriptedCausalLm {
    pub fn new(steps: Vec<Vec<f32>>) -> Self {
        Self {
            steps,
            window: 1024,
            calls: 0,
        }
    }
}

impl CausalLm for ScriptedCausalLm {
    fn context_window(&self) -> usize {
        self.window
    }

    fn next_logits(&mut self, rows: &[Vec<TokenId>]) -> anyhow::Result<Vec<Vec<f32>>> {
        let scores = self.steps[self.calls % self.steps.len()].clone();
        self.calls += 1;
        Ok(vec![scores; rows.len()])
    }
}

/// Counts the tokens it has absorbed; deliberately not `Clone`.
pub struct TokenCount(pub usize);

/// Recurrent model whose favourite token is always `unk`
pub struct UnkLovingLm {
    pub vocab_size: usize,
    pub unk: TokenId,
    pub primed_with: Vec<Vec<TokenId>>,
    pub stepped_with: Vec<(TokenId, usize)>,
}

impl UnkLovingLm {
    pub fn new(vocab_size: usize, unk: TokenId) -> Self {
        Self {
            vocab_size,
            unk,
            primed_with: Vec::new(),
            stepped_with: Vec::new(),
        }
    }

    pub fn scores(&self, absorbed: usize) -> Vec<f32> {
        (0..self.vocab_size)
            .map(|i| {
                if i as TokenId == self.unk {
                    10.0
                } else {
                    ((i + absorbed) % 5) as f32 * 0.1
                }
            })
            .collect()
    }
}

impl RecurrentLm for UnkLovingLm {
    type State = TokenCount;

    fn prime(&mut self, context: &[TokenId]) -> anyhow::Result<(Vec<f32>, TokenCount)> {
        self.primed_with.push(context.to_vec());
        Ok((self.scores(context.len()), TokenCount(context.len())))
    }

    fn step(&mut self, token: TokenId, state: TokenCount) -> anyhow::Result<(Vec<f32>, TokenCount)> {
        self.stepped_with.push((token, state.0));
        let absorbed = state.0 + 1;
        Ok((self.scores(absorbed), TokenCount(absorbed)))
    }
}
