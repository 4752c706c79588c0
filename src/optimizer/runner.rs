use super::anneal::{AnnealingEpoch, EpochOutcome};
use super::sampling::{BiasedLetterBucket, UnigramSampler};
use super::{EpochCallback, InitialSampler, SolutionOptimizer};
use crate::cipher::Cipher;
use crate::config::{SearchParams, SolverConfig};
use crate::error::{CfResult, CipherForgeError};
use crate::evaluator::PlaintextEvaluator;
use crate::model::LanguageModel;
use crate::solution::CipherSolution;
use fastrand::Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AnnealingOptions {
    pub sampler_iterations: usize,
    pub temp_min: f32,
    pub temp_max: f32,
    pub iterate_randomly: bool,
    pub clone_per_proposal: bool,
    pub known_solution_correctness_threshold: f32,
    pub initial_sampler: InitialSampler,
    pub seed: Option<u64>,
}

impl AnnealingOptions {
    fn from_search(search: &SearchParams, initial_sampler: InitialSampler) -> Self {
        Self {
            sampler_iterations: search.sampler_iterations,
            temp_min: search.temp_min,
            temp_max: search.temp_max,
            iterate_randomly: search.iterate_randomly,
            clone_per_proposal: search.clone_per_proposal,
            known_solution_correctness_threshold: search.known_solution_correctness_threshold,
            initial_sampler,
            seed: None, // Set manually if needed
        }
    }
}

impl Default for AnnealingOptions {
    fn default() -> Self {
        Self::from_search(&SearchParams::default(), InitialSampler::Roulette)
    }
}

impl TryFrom<&SolverConfig> for AnnealingOptions {
    type Error = CipherForgeError;

    /// Fails with a configuration error on an unknown initial sampler name.
    fn try_from(cfg: &SolverConfig) -> CfResult<Self> {
        let sampler = InitialSampler::from_name(&cfg.search.initial_sampler)?;
        Ok(Self::from_search(&cfg.search, sampler))
    }
}

/// Summary handed to the [`EpochCallback`] after each epoch.
#[derive(Debug, Clone)]
pub struct EpochReport {
    pub epoch: usize,
    pub epochs: usize,
    pub score: f32,
    pub plaintext: String,
    pub accepted: usize,
    pub proposals: usize,
    pub elapsed_ms: u128,
    pub known_solution_proximity: Option<f32>,
}

/// Simulated annealing over symbol-to-letter mappings. Epochs are
/// independent and run in parallel against one shared model.
pub struct SimulatedAnnealingOptimizer {
    options: AnnealingOptions,
    order: usize,
    unigram_sampler: UnigramSampler,
    letter_bucket: BiasedLetterBucket,
}

impl SimulatedAnnealingOptimizer {
    /// Builds the letter samplers from the model's unigram counts.
    pub fn new(model: &dyn LanguageModel, options: AnnealingOptions) -> CfResult<Self> {
        if options.sampler_iterations == 0 {
            return Err(CipherForgeError::Config(
                "sampler_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            order: model.order(),
            unigram_sampler: UnigramSampler::from_model(model)?,
            letter_bucket: BiasedLetterBucket::from_model(model)?,
            options,
        })
    }

    pub fn options(&self) -> &AnnealingOptions {
        &self.options
    }

    /// Maps every distinct symbol to a freshly sampled letter.
    pub fn initial_solution(&self, cipher: Arc<Cipher>, rng: &mut Rng) -> CipherSolution {
        let symbol_count = cipher.symbol_count();
        let mut solution = CipherSolution::new(cipher);
        for id in 0..symbol_count {
            let letter = match self.options.initial_sampler {
                InitialSampler::Roulette => self.unigram_sampler.sample(rng),
                InitialSampler::BiasedBucket => self.letter_bucket.sample(rng),
            };
            solution.replace_letter(id, letter);
        }
        solution
    }

    fn epoch_rng(&self, epoch: usize) -> Rng {
        match self.options.seed {
            Some(s) => Rng::with_seed(s.wrapping_add(epoch as u64)),
            None => Rng::new(),
        }
    }

    fn run_epoch(
        &self,
        cipher: &Arc<Cipher>,
        evaluator: &dyn PlaintextEvaluator,
        precomputed: &crate::evaluator::PrecomputedData,
        epoch: usize,
    ) -> CfResult<EpochOutcome> {
        let mut rng = self.epoch_rng(epoch);
        let initial = self.initial_solution(Arc::clone(cipher), &mut rng);
        AnnealingEpoch::new(evaluator, precomputed, &self.options, initial, rng)?.run()
    }
}

impl SolutionOptimizer for SimulatedAnnealingOptimizer {
    fn optimize(
        &self,
        cipher: Arc<Cipher>,
        epochs: usize,
        evaluator: Arc<dyn PlaintextEvaluator>,
        callback: &dyn EpochCallback,
    ) -> CfResult<CipherSolution> {
        if epochs == 0 {
            return Err(CipherForgeError::Config("epochs must be at least 1".to_string()));
        }
        if cipher.symbol_count() == 0 {
            return Err(CipherForgeError::Config(format!(
                "Cipher '{}' has zero distinct symbols",
                cipher.name()
            )));
        }
        if cipher.len() < self.order {
            return Err(CipherForgeError::Config(format!(
                "Cipher '{}' has {} symbols, fewer than the model order {}",
                cipher.name(),
                cipher.len(),
                self.order
            )));
        }
        if evaluator.model().order() != self.order {
            return Err(CipherForgeError::Config(format!(
                "Evaluator model order {} differs from optimizer order {}",
                evaluator.model().order(),
                self.order
            )));
        }

        debug!(
            "unknown n-gram log-probability: {}",
            evaluator.model().unknown_log_probability()
        );

        let precomputed = evaluator.precompute(&cipher);
        let stop = AtomicBool::new(false);
        let start = Instant::now();

        let outcomes: Vec<CfResult<Option<(CipherSolution, EpochReport)>>> = (0..epochs)
            .into_par_iter()
            .map(|epoch| {
                if stop.load(Ordering::Relaxed) {
                    return Ok(None);
                }

                info!(
                    "Epoch {} of {}. Running sampler for {} iterations.",
                    epoch + 1,
                    epochs,
                    self.options.sampler_iterations
                );
                let outcome = self.run_epoch(&cipher, evaluator.as_ref(), &precomputed, epoch)?;

                let proximity = if cipher.has_known_solution() {
                    Some(outcome.best.evaluate_known_solution()?)
                } else {
                    None
                };

                let report = EpochReport {
                    epoch: epoch + 1,
                    epochs,
                    score: outcome.best.score(),
                    plaintext: outcome.best.as_single_line_string(),
                    accepted: outcome.accepted,
                    proposals: outcome.proposals,
                    elapsed_ms: outcome.elapsed.as_millis(),
                    known_solution_proximity: proximity,
                };
                info!(
                    "Epoch {} completed in {}ms (score={:.4}).",
                    report.epoch, report.elapsed_ms, report.score
                );

                if !callback.on_epoch_complete(&report) {
                    stop.store(true, Ordering::Relaxed);
                }
                Ok(Some((outcome.best, report)))
            })
            .collect();

        let mut overall_best: Option<CipherSolution> = None;
        let mut completed = 0usize;
        let mut correct = 0usize;
        let mut total_ms = 0u128;

        for outcome in outcomes {
            let Some((best, report)) = outcome? else {
                continue;
            };
            completed += 1;
            total_ms += report.elapsed_ms;
            if report
                .known_solution_proximity
                .is_some_and(|p| p >= self.options.known_solution_correctness_threshold)
            {
                correct += 1;
            }

            overall_best = match overall_best {
                Some(current) if current.cmp_score(&best).is_ge() => Some(current),
                _ => Some(best),
            };
        }

        if completed < epochs {
            warn!("Search stopped after {} of {} epochs", completed, epochs);
        }
        if cipher.has_known_solution() && completed > 0 {
            info!(
                "{} out of {} epochs ({:.2}%) produced the correct solution.",
                correct,
                completed,
                correct as f64 / completed as f64 * 100.0
            );
        }
        if completed > 0 {
            info!(
                "Average epoch time={:.1}ms (wall {}ms)",
                total_ms as f64 / completed as f64,
                start.elapsed().as_millis()
            );
        }

        overall_best.ok_or_else(|| {
            CipherForgeError::Invariant("No epoch produced a solution".to_string())
        })
    }
}
