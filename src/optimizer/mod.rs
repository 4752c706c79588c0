pub mod anneal;
pub mod runner;
pub mod sampling;

pub use anneal::{AnnealingEpoch, EpochOutcome};
pub use runner::{AnnealingOptions, EpochReport, SimulatedAnnealingOptimizer};

use crate::cipher::Cipher;
use crate::error::{CfResult, CipherForgeError};
use crate::evaluator::PlaintextEvaluator;
use crate::solution::CipherSolution;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Receives a report after every finished epoch.
/// Boolean return value indicates if the search should continue (true) or abort (false).
pub trait EpochCallback: Send + Sync {
    fn on_epoch_complete(&self, report: &EpochReport) -> bool;
}

/// Callback that ignores every report.
pub struct NoCallback;

impl EpochCallback for NoCallback {
    fn on_epoch_complete(&self, _report: &EpochReport) -> bool {
        true
    }
}

/// Common contract of every search strategy. Scores must come exclusively
/// from the supplied evaluator so strategies stay comparable.
pub trait SolutionOptimizer {
    fn optimize(
        &self,
        cipher: Arc<Cipher>,
        epochs: usize,
        evaluator: Arc<dyn PlaintextEvaluator>,
        callback: &dyn EpochCallback,
    ) -> CfResult<CipherSolution>;
}

/// How the first letter of every symbol is drawn at the start of an epoch.
#[derive(
    Debug, Clone, Copy, EnumIter, EnumString, Display, PartialEq, Eq, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum InitialSampler {
    /// Proportional to unigram counts.
    Roulette,
    /// Unigram counts flattened towards uniform.
    BiasedBucket,
}

impl InitialSampler {
    pub fn from_name(name: &str) -> CfResult<Self> {
        name.parse().map_err(|_| {
            CipherForgeError::Config(format!(
                "Unknown initial sampler '{}'. Valid samplers: {}",
                name,
                Self::iter().join(", ")
            ))
        })
    }
}

/// Linear cooling from `max` at iteration 0 towards `min` at the last iteration.
#[inline]
pub fn temperature_at(iteration: usize, iterations: usize, min: f32, max: f32) -> f32 {
    let remaining = (iterations - iteration.min(iterations)) as f32 / iterations as f32;
    (max - min) * remaining + min
}

/// Metropolis acceptance probability of moving from `current` to `proposal`
/// (higher scores are better).
#[inline]
pub fn acceptance_probability(current: f32, proposal: f32, temperature: f32) -> f32 {
    if proposal >= current {
        return 1.0;
    }
    (-(current - proposal) / temperature).exp()
}

/// Decides whether to keep a proposal. Non-finite scores and negative
/// probabilities mean the scoring math is broken and abort the run.
pub fn accept_proposal(
    current: f32,
    proposal: f32,
    temperature: f32,
    rng: &mut fastrand::Rng,
) -> CfResult<bool> {
    if !current.is_finite() || !proposal.is_finite() {
        return Err(CipherForgeError::Invariant(format!(
            "Non-finite score encountered (current {}, proposal {})",
            current, proposal
        )));
    }
    if proposal >= current {
        return Ok(true);
    }

    let probability = acceptance_probability(current, proposal, temperature);
    if probability < 0.0 || probability.is_nan() {
        return Err(CipherForgeError::Invariant(format!(
            "Acceptance probability {} is below zero",
            probability
        )));
    }
    Ok(probability > 1.0 || rng.f32() < probability)
}
