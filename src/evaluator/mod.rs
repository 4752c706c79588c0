pub mod entropy;
pub mod ioc;
pub mod ngram;

pub use entropy::Entropy;
pub use ioc::IndexOfCoincidence;
pub use ngram::{
    evaluate_letter_ngrams, window_count, NGramAndEntropyEvaluator,
    NGramAndIndexOfCoincidenceEvaluator, NGramEvaluator,
};

use crate::cipher::Cipher;
use crate::error::{CfResult, CipherForgeError};
use crate::model::LanguageModel;
use crate::solution::CipherSolution;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Result of one evaluation: the new score, plus the previous value of every
/// window the evaluator overwrote so the caller can undo it.
#[derive(Debug, Clone, Default)]
pub struct SolutionScore {
    pub score: f32,
    pub rollback: Vec<(usize, f32)>,
    previous_log_probability: f32,
    previous_index_of_coincidence: f32,
}

impl SolutionScore {
    /// `before` must be the solution as it was prior to the evaluation.
    pub fn new(score: f32, rollback: Vec<(usize, f32)>, before: Snapshot) -> Self {
        Self {
            score,
            rollback,
            previous_log_probability: before.log_probability,
            previous_index_of_coincidence: before.index_of_coincidence,
        }
    }

    /// Restores every window recorded in this score, and the aggregate and
    /// IoC exactly as they were before the evaluation.
    pub fn roll_back(&self, solution: &mut CipherSolution) {
        for &(index, old) in self.rollback.iter().rev() {
            solution.replace_log_probability(index, old);
        }
        solution.restore_aggregates(
            self.previous_log_probability,
            self.previous_index_of_coincidence,
        );
    }
}

/// Aggregates of a solution captured before it is re-evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    log_probability: f32,
    index_of_coincidence: f32,
}

impl Snapshot {
    pub fn of(solution: &CipherSolution) -> Self {
        Self {
            log_probability: solution.log_probability(),
            index_of_coincidence: solution.index_of_coincidence(),
        }
    }
}

/// Per-cipher data computed once and shared by every epoch.
#[derive(Debug, Clone)]
pub struct PrecomputedData {
    pub ioc: IndexOfCoincidence,
    pub entropy: Entropy,
}

/// Scores a candidate solution against a language model.
///
/// `changed_symbol` names the single symbol whose mapping was just changed;
/// `None` requests a full re-evaluation.
pub trait PlaintextEvaluator: Send + Sync {
    fn model(&self) -> &Arc<dyn LanguageModel>;

    fn precompute(&self, cipher: &Cipher) -> PrecomputedData {
        PrecomputedData {
            ioc: IndexOfCoincidence::new(cipher.len()),
            entropy: Entropy::new(cipher.len()),
        }
    }

    fn evaluate(
        &self,
        precomputed: &PrecomputedData,
        solution: &mut CipherSolution,
        changed_symbol: Option<usize>,
    ) -> CfResult<SolutionScore>;
}

/// Evaluators selectable by name.
#[derive(
    Debug, Clone, Copy, EnumIter, EnumString, Display, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum EvaluatorKind {
    NGram,
    NGramAndIndexOfCoincidence,
    NGramAndEntropy,
}

impl EvaluatorKind {
    /// Parses an evaluator name; unknown names list the valid choices.
    pub fn from_name(name: &str) -> CfResult<Self> {
        name.parse().map_err(|_| {
            CipherForgeError::Config(format!(
                "Unknown plaintext evaluator '{}'. Valid evaluators: {}",
                name,
                Self::iter().join(", ")
            ))
        })
    }

    pub fn build(self, model: Arc<dyn LanguageModel>) -> Arc<dyn PlaintextEvaluator> {
        match self {
            Self::NGram => Arc::new(NGramEvaluator::new(model)),
            Self::NGramAndIndexOfCoincidence => {
                Arc::new(NGramAndIndexOfCoincidenceEvaluator::new(model))
            }
            Self::NGramAndEntropy => Arc::new(NGramAndEntropyEvaluator::new(model)),
        }
    }
}
