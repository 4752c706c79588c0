use super::runner::AnnealingOptions;
use super::sampling::uniform_letter;
use super::{accept_proposal, temperature_at};
use crate::error::{CfResult, CipherForgeError};
use crate::evaluator::{PlaintextEvaluator, PrecomputedData};
use crate::solution::CipherSolution;
use fastrand::Rng;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of one finished epoch.
#[derive(Debug, Clone)]
pub struct EpochOutcome {
    pub best: CipherSolution,
    pub accepted: usize,
    pub proposals: usize,
    pub elapsed: Duration,
}

/// One independent annealing run: a single candidate solution that is
/// mutated one symbol at a time and rolled back on rejection.
pub struct AnnealingEpoch<'a> {
    evaluator: &'a dyn PlaintextEvaluator,
    precomputed: &'a PrecomputedData,
    options: &'a AnnealingOptions,
    solution: CipherSolution,
    best: CipherSolution,
    symbol_order: Vec<usize>,
    rng: Rng,
    accepted: usize,
    proposals: usize,
}

impl<'a> AnnealingEpoch<'a> {
    /// Runs a full evaluation of `initial` and prepares the sweep state.
    pub fn new(
        evaluator: &'a dyn PlaintextEvaluator,
        precomputed: &'a PrecomputedData,
        options: &'a AnnealingOptions,
        mut initial: CipherSolution,
        rng: Rng,
    ) -> CfResult<Self> {
        if !initial.is_complete() {
            return Err(CipherForgeError::Validation(
                "Initial solution must map every symbol".to_string(),
            ));
        }

        let score = evaluator.evaluate(precomputed, &mut initial, None)?;
        if !score.score.is_finite() {
            return Err(CipherForgeError::Invariant(format!(
                "Initial solution scored {}",
                score.score
            )));
        }
        initial.set_score(score.score);

        let symbol_order = (0..initial.cipher().symbol_count()).collect();
        Ok(Self {
            evaluator,
            precomputed,
            options,
            best: initial.clone(),
            solution: initial,
            symbol_order,
            rng,
            accepted: 0,
            proposals: 0,
        })
    }

    pub fn solution(&self) -> &CipherSolution {
        &self.solution
    }

    pub fn best(&self) -> &CipherSolution {
        &self.best
    }

    /// Visits every symbol once at the given temperature. Returns the number
    /// of accepted proposals.
    pub fn sweep(&mut self, temperature: f32) -> CfResult<usize> {
        if self.options.iterate_randomly {
            self.rng.shuffle(&mut self.symbol_order);
        }

        let mut accepted = 0;
        for i in 0..self.symbol_order.len() {
            let symbol = self.symbol_order[i];
            let letter = uniform_letter(&mut self.rng);
            let current = self.solution.letter(symbol);
            if current == Some(letter) {
                continue;
            }

            self.proposals += 1;
            let kept = if self.options.clone_per_proposal {
                self.propose_cloned(symbol, letter, temperature)?
            } else {
                self.propose_in_place(symbol, letter, temperature)?
            };

            if kept {
                accepted += 1;
                if self.solution.score() > self.best.score() {
                    self.best = self.solution.clone();
                }
            }
        }

        self.accepted += accepted;
        self.solution.resync_log_probability()?;
        Ok(accepted)
    }

    fn propose_in_place(&mut self, symbol: usize, letter: u8, temperature: f32) -> CfResult<bool> {
        let previous_letter = self.solution.replace_letter(symbol, letter);
        let current = self.solution.score();

        let score = self
            .evaluator
            .evaluate(self.precomputed, &mut self.solution, Some(symbol))?;

        if accept_proposal(current, score.score, temperature, &mut self.rng)? {
            self.solution.set_score(score.score);
            return Ok(true);
        }

        score.roll_back(&mut self.solution);
        self.solution.replace_letter(symbol, previous_letter);
        Ok(false)
    }

    fn propose_cloned(&mut self, symbol: usize, letter: u8, temperature: f32) -> CfResult<bool> {
        let mut proposal = self.solution.clone();
        proposal.replace_letter(symbol, letter);

        let score = self
            .evaluator
            .evaluate(self.precomputed, &mut proposal, Some(symbol))?;

        if accept_proposal(self.solution.score(), score.score, temperature, &mut self.rng)? {
            proposal.set_score(score.score);
            self.solution = proposal;
            return Ok(true);
        }
        Ok(false)
    }

    /// Sweeps through the whole cooling schedule and returns the best
    /// solution seen at any point.
    pub fn run(mut self) -> CfResult<EpochOutcome> {
        let start = Instant::now();
        let iterations = self.options.sampler_iterations;

        for i in 0..iterations {
            let temperature =
                temperature_at(i, iterations, self.options.temp_min, self.options.temp_max);
            let accepted = self.sweep(temperature)?;

            if i % 1000 == 0 {
                debug!(
                    "Iteration {} of {} (temp={:.4}, accepted={}, score={:.4})",
                    i + 1,
                    iterations,
                    temperature,
                    accepted,
                    self.solution.score()
                );
            }
        }

        Ok(EpochOutcome {
            best: self.best,
            accepted: self.accepted,
            proposals: self.proposals,
            elapsed: start.elapsed(),
        })
    }
}
