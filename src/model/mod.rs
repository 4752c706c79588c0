pub mod array;
pub mod builder;
pub mod cache;
pub mod loader;
pub mod tree;

pub use array::{ArrayModel, ArrayModelBuilder};
pub use builder::ModelBuildParams;
pub use tree::{TreeModel, TreeNode};

use crate::consts::{ALPHABET_SIZE, ASCII_OFFSET};
use serde::{Deserialize, Serialize};

/// One trained n-gram with its counts and probabilities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NGramNode {
    pub ngram: String,
    pub count: u64,
    pub probability: f64,
    pub log_probability: f64,
    pub conditional_probability: f64,
    pub log_conditional_probability: f64,
}

impl NGramNode {
    pub fn new(ngram: impl Into<String>, count: u64, log_probability: f64) -> Self {
        Self {
            ngram: ngram.into(),
            count,
            probability: log_probability.exp(),
            log_probability,
            ..Default::default()
        }
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.ngram.len()
    }

    /// First letter of the n-gram; the whole n-gram for unigrams.
    pub fn letter(&self) -> Option<u8> {
        self.ngram.as_bytes().first().copied()
    }
}

/// Read-only view of a trained character model.
///
/// Implementations must be immutable once built so a single instance can be
/// shared between epochs running on different threads.
pub trait LanguageModel: Send + Sync {
    fn order(&self) -> usize;

    /// Log-probability of `kgram`, or the unknown fallback if it was never trained
    /// or is not a valid k-letter lowercase string.
    fn lookup(&self, kgram: &[u8]) -> f32;

    fn first_order_nodes(&self) -> Vec<&NGramNode>;

    fn unknown_log_probability(&self) -> f32;

    fn total_ngram_count(&self) -> u64 {
        self.first_order_nodes().iter().map(|n| n.count).sum()
    }
}

/// Position of a lowercase letter in the alphabet.
#[inline(always)]
pub fn letter_index(b: u8) -> Option<usize> {
    let idx = b.wrapping_sub(ASCII_OFFSET) as usize;
    if idx < ALPHABET_SIZE {
        Some(idx)
    } else {
        None
    }
}
