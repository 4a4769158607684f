//! Error types for the generation loops.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// Parameters that can never describe a valid run.
    #[error("invalid input: {0}")]
    InputContract(String),

    #[error("masked word '{word}' doesn't appear in sentence")]
    NotFound { word: String },

    #[error("can't generate {requested} positions with a context window of {window}")]
    LengthExceeded { requested: usize, window: usize },

    #[error("token '{0}' is not in the vocabulary")]
    UnknownToken(String),

    #[error("no token has a positive probability")]
    DegenerateDistribution,

    /// Failure inside the model or tokenizer service, passed through untouched.
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl GenerationError {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        GenerationError::InputContract(msg.into())
    }
}
