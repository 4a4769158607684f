//! candle-backed implementations of the model service traits.

pub mod bert;
pub mod llama;
pub mod mamba;
pub mod vocab;

pub use bert::BertMaskedLm;
pub use llama::LlamaLm;
pub use mamba::{MambaLm, MambaState};
pub use vocab::HfVocabulary;
