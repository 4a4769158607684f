use anyhow::anyhow;
use tokenizers::Tokenizer;

use crate::error::Result;
use crate::service::{TokenId, Vocabulary};

/// [`Vocabulary`] backed by a HuggingFace `tokenizers` tokenizer
#[derive(Clone)]
pub struct HfVocabulary {
    tokenizer: Tokenizer,
}

impl HfVocabulary {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }
}

impl Vocabulary for HfVocabulary {
    fn tokenize(&self, text: &str) -> anyhow::Result<Vec<String>> {
        self.tokenizer
            .encode(text, false)
            .map(|enc| enc.get_tokens().to_vec())
            .map_err(|e| anyhow!("Tokenization error: {}", e))
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.tokenizer.token_to_id(token)
    }

    fn id_to_token(&self, id: TokenId) -> Option<String> {
        self.tokenizer.id_to_token(id)
    }

    fn size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    fn decode(&self, ids: &[TokenId]) -> anyhow::Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow!("Decode error: {}", e))
    }

    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenization error: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }
}
