use crate::{DocumentChunk, IngestError};
use tiktoken_rs::CoreBPE;

pub const EMBEDDING_USD_PER_1K_TOKENS: f64 = 0.0004;

pub trait TokenCounter {
    fn count_tokens(&self, text: &str) -> usize;
}

impl TokenCounter for CoreBPE {
    fn count_tokens(&self, text: &str) -> usize {
        self.encode_ordinary(text).len()
    }
}

pub fn default_tokenizer() -> Result<CoreBPE, IngestError> {
    tiktoken_rs::o200k_base().map_err(|error| IngestError::Tokenizer(error.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingCost {
    pub total_tokens: usize,
    pub usd: f64,
}

pub fn cost_for_tokens(total_tokens: usize) -> f64 {
    total_tokens as f64 / 1000.0 * EMBEDDING_USD_PER_1K_TOKENS
}

pub fn estimate_embedding_cost<T: TokenCounter + ?Sized>(
    counter: &T,
    chunks: &[DocumentChunk],
) -> EmbeddingCost {
    let total_tokens = chunks
        .iter()
        .map(|chunk| counter.count_tokens(&chunk.text))
        .sum();

    EmbeddingCost {
        total_tokens,
        usd: cost_for_tokens(total_tokens),
    }
}
