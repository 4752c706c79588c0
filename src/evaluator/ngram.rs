use super::{PlaintextEvaluator, PrecomputedData, SolutionScore, Snapshot};
use crate::consts::{ENTROPY_SCORE_WEIGHT, IOC_SCORE_EXPONENT, MIN_ENTROPY};
use crate::error::CfResult;
use crate::model::LanguageModel;
use crate::solution::CipherSolution;
use std::sync::Arc;

/// Number of sliding k-gram windows over a text of `len` letters.
#[inline]
pub fn window_count(len: usize, order: usize) -> usize {
    if order == 0 || len < order {
        0
    } else {
        len - order + 1
    }
}

/// Brings the window vector of `solution` up to date with its plaintext and
/// returns the `(index, old value)` of every entry it overwrote.
///
/// With `changed_symbol` set only the windows overlapping an occurrence of
/// that symbol are recomputed; otherwise, or when the vector has not been
/// filled yet, the whole vector is rebuilt.
pub fn evaluate_letter_ngrams(
    model: &dyn LanguageModel,
    solution: &mut CipherSolution,
    changed_symbol: Option<usize>,
) -> Vec<(usize, f32)> {
    let order = model.order();
    let windows = window_count(solution.plaintext().len(), order);

    // A vector that was never filled cannot be patched in place.
    let incremental = changed_symbol.filter(|_| solution.log_probabilities().len() == windows);
    let Some(symbol) = incremental else {
        let rollback: Vec<(usize, f32)> = solution
            .log_probabilities()
            .iter()
            .copied()
            .enumerate()
            .collect();
        solution.clear_log_probabilities();
        for start in 0..windows {
            let value = model.lookup(&solution.plaintext()[start..start + order]);
            solution.push_log_probability(value);
        }
        return rollback;
    };

    let cipher = Arc::clone(solution.cipher());
    let occurrences = cipher.indices_of(symbol);
    let mut rollback = Vec::with_capacity(occurrences.len() * order);
    let mut covered_until = 0;

    // Occurrences are ascending, so anything below `covered_until` was
    // already rescored for an earlier occurrence.
    for &pos in occurrences {
        let start = (pos + 1).saturating_sub(order).max(covered_until);
        let end = windows.min(pos + 1);
        for window in start..end {
            let value = model.lookup(&solution.plaintext()[window..window + order]);
            let old = solution.replace_log_probability(window, value);
            rollback.push((window, old));
        }
        covered_until = covered_until.max(end);
    }
    rollback
}

/// Scores by mean window log-probability alone.
pub struct NGramEvaluator {
    model: Arc<dyn LanguageModel>,
}

impl NGramEvaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

impl PlaintextEvaluator for NGramEvaluator {
    fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    fn evaluate(
        &self,
        precomputed: &PrecomputedData,
        solution: &mut CipherSolution,
        changed_symbol: Option<usize>,
    ) -> CfResult<SolutionScore> {
        let before = Snapshot::of(solution);
        let rollback = evaluate_letter_ngrams(self.model.as_ref(), solution, changed_symbol);
        if changed_symbol.is_none() {
            let ioc = precomputed.ioc.evaluate(solution.plaintext());
            solution.set_index_of_coincidence(ioc);
        }
        Ok(SolutionScore::new(
            solution.mean_log_probability(),
            rollback,
            before,
        ))
    }
}

/// Mean window log-probability scaled by the sixth root of the index of
/// coincidence, which penalises decryptions with implausible letter repetition.
pub struct NGramAndIndexOfCoincidenceEvaluator {
    model: Arc<dyn LanguageModel>,
}

impl NGramAndIndexOfCoincidenceEvaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

impl PlaintextEvaluator for NGramAndIndexOfCoincidenceEvaluator {
    fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    fn evaluate(
        &self,
        precomputed: &PrecomputedData,
        solution: &mut CipherSolution,
        changed_symbol: Option<usize>,
    ) -> CfResult<SolutionScore> {
        let before = Snapshot::of(solution);
        let rollback = evaluate_letter_ngrams(self.model.as_ref(), solution, changed_symbol);
        let ioc = precomputed.ioc.evaluate(solution.plaintext());
        solution.set_index_of_coincidence(ioc);

        let score = solution.mean_log_probability() * ioc.powf(IOC_SCORE_EXPONENT);
        Ok(SolutionScore::new(score, rollback, before))
    }
}

/// Mean window log-probability divided by a quarter of the plaintext letter
/// entropy. A single-letter plaintext has zero entropy; it is floored so the
/// score stays finite and ranks as the worst possible.
pub struct NGramAndEntropyEvaluator {
    model: Arc<dyn LanguageModel>,
}

impl NGramAndEntropyEvaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

impl PlaintextEvaluator for NGramAndEntropyEvaluator {
    fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    fn evaluate(
        &self,
        precomputed: &PrecomputedData,
        solution: &mut CipherSolution,
        changed_symbol: Option<usize>,
    ) -> CfResult<SolutionScore> {
        let before = Snapshot::of(solution);
        let rollback = evaluate_letter_ngrams(self.model.as_ref(), solution, changed_symbol);
        if changed_symbol.is_none() {
            let ioc = precomputed.ioc.evaluate(solution.plaintext());
            solution.set_index_of_coincidence(ioc);
        }

        let entropy = precomputed.entropy.evaluate(solution.plaintext()).max(MIN_ENTROPY);
        let score = solution.mean_log_probability() / (entropy * ENTROPY_SCORE_WEIGHT);
        Ok(SolutionScore::new(score, rollback, before))
    }
}
