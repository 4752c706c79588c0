use cipherforge::cipher::Cipher;
use cipherforge::evaluator::{
    window_count, Entropy, EvaluatorKind, IndexOfCoincidence, NGramAndEntropyEvaluator,
    NGramAndIndexOfCoincidenceEvaluator, NGramEvaluator, PlaintextEvaluator,
};
use cipherforge::model::{ArrayModelBuilder, LanguageModel, NGramNode};
use cipherforge::solution::CipherSolution;
use proptest::prelude::*;
use std::sync::Arc;

const UNKNOWN: f32 = -10.0;

fn bigram_model() -> Arc<dyn LanguageModel> {
    let mut builder = ArrayModelBuilder::new(2)
        .unwrap()
        .unknown_log_probability(UNKNOWN);
    let mut nodes: Vec<NGramNode> = (b'a'..=b'z')
        .map(|b| NGramNode::new((b as char).to_string(), 10 + b as u64, -3.0))
        .collect();
    for (i, kgram) in ["th", "he", "tt", "hh", "er", "re", "in", "an"]
        .iter()
        .enumerate()
    {
        nodes.push(NGramNode::new(*kgram, 100, -1.0 - i as f64 * 0.5));
    }
    builder.import(nodes).unwrap();
    Arc::new(builder.finish().unwrap())
}

fn solved(cipher: Arc<Cipher>, letters: &[(&str, char)]) -> CipherSolution {
    CipherSolution::with_mappings(cipher, letters.iter().copied()).unwrap()
}

// --- WINDOWS & IOC ---

#[test]
fn test_window_count() {
    assert_eq!(window_count(4, 2), 3);
    assert_eq!(window_count(5, 5), 1);
    assert_eq!(window_count(1, 2), 0);
    assert_eq!(window_count(10, 0), 0);
}

#[test]
fn test_index_of_coincidence() {
    let ioc = IndexOfCoincidence::new(4);
    // t:2 h:2 -> (2 + 2) / 12
    assert!((ioc.evaluate(b"tthh") - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(ioc.evaluate(b"abcd"), 0.0);
    assert_eq!(ioc.evaluate(b"aaaa"), 1.0);

    let degenerate = IndexOfCoincidence::new(1);
    assert_eq!(degenerate.evaluate(b"a"), 0.0);
}

#[test]
fn test_entropy_in_bits() {
    let entropy = Entropy::new(4);
    assert!((entropy.evaluate(b"tthh") - 1.0).abs() < 1e-6);
    assert!((entropy.evaluate(b"abcd") - 2.0).abs() < 1e-6);
    assert_eq!(entropy.evaluate(b"aaaa"), 0.0);
}

// --- FULL EVALUATION ---

#[test]
fn test_aabb_scores_three_windows() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("aabb", "AABB").unwrap());
    let mut solution = solved(Arc::clone(&cipher), &[("A", 't'), ("B", 'h')]);

    let evaluator = NGramEvaluator::new(Arc::clone(&model));
    let precomputed = evaluator.precompute(&cipher);
    let score = evaluator.evaluate(&precomputed, &mut solution, None).unwrap();

    // tt, th, hh
    assert_eq!(solution.log_probabilities(), &[-2.0, -1.0, -2.5]);
    assert!((solution.log_probability() + 5.5).abs() < 1e-6);
    assert!((score.score - (-5.5 / 3.0)).abs() < 1e-6);
    assert!((solution.index_of_coincidence() - 1.0 / 3.0).abs() < 1e-6);

    let combined = NGramAndIndexOfCoincidenceEvaluator::new(model);
    let score = combined.evaluate(&precomputed, &mut solution, None).unwrap();
    let expected = (-5.5f32 / 3.0) * (1.0f32 / 3.0).powf(1.0 / 6.0);
    assert!((score.score - expected).abs() < 1e-5);
}

#[test]
fn test_entropy_evaluator_divides_mean_by_quarter_entropy() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("aabb", "AABB").unwrap());
    let mut solution = solved(Arc::clone(&cipher), &[("A", 't'), ("B", 'h')]);

    let evaluator = NGramAndEntropyEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);
    let score = evaluator.evaluate(&precomputed, &mut solution, None).unwrap();

    // tthh carries exactly one bit of entropy
    let expected = (-5.5f32 / 3.0) / 0.25;
    assert!((score.score - expected).abs() < 1e-5);
}

#[test]
fn test_entropy_evaluator_stays_finite_on_single_letter_text() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("same", "AAAA").unwrap());
    let mut solution = solved(Arc::clone(&cipher), &[("A", 't')]);

    let evaluator = NGramAndEntropyEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);
    let score = evaluator.evaluate(&precomputed, &mut solution, None).unwrap();
    assert!(score.score.is_finite());
    assert!(score.score < -5.5 / 3.0 / 0.25);
}

#[test]
fn test_unknown_windows_use_fallback() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("zq", "ZQ").unwrap());
    let mut solution = solved(Arc::clone(&cipher), &[("Z", 'z'), ("Q", 'q')]);
    let evaluator = NGramEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);
    let score = evaluator.evaluate(&precomputed, &mut solution, None).unwrap();
    assert_eq!(score.score, UNKNOWN);
}

// --- INCREMENTAL EVALUATION & ROLLBACK ---

#[test]
fn test_incremental_touches_only_overlapping_windows() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("t", "ABCDAE").unwrap());
    let mut solution = solved(
        Arc::clone(&cipher),
        &[("A", 't'), ("B", 'h'), ("C", 'e'), ("D", 'r'), ("E", 'e')],
    );
    let evaluator = NGramEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);
    evaluator.evaluate(&precomputed, &mut solution, None).unwrap();

    solution.replace_letter(0, b'a');
    let score = evaluator
        .evaluate(&precomputed, &mut solution, Some(0))
        .unwrap();

    // A sits at 0 and 4: windows 0, 3 and 4
    let touched: Vec<usize> = score.rollback.iter().map(|&(i, _)| i).collect();
    assert_eq!(touched, vec![0, 3, 4]);
}

#[test]
fn test_adjacent_occurrences_are_rescored_once() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("t", "AAB").unwrap());
    let mut solution = solved(Arc::clone(&cipher), &[("A", 't'), ("B", 'h')]);
    let evaluator = NGramEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);
    evaluator.evaluate(&precomputed, &mut solution, None).unwrap();

    solution.replace_letter(0, b'h');
    let score = evaluator
        .evaluate(&precomputed, &mut solution, Some(0))
        .unwrap();
    let touched: Vec<usize> = score.rollback.iter().map(|&(i, _)| i).collect();
    assert_eq!(touched, vec![0, 1]);
    // hh, hh
    assert_eq!(solution.log_probabilities(), &[-2.5, -2.5]);
}

#[test]
fn test_incremental_without_prior_full_evaluation_falls_back() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("t", "ABA").unwrap());
    let mut solution = solved(Arc::clone(&cipher), &[("A", 't'), ("B", 'h')]);
    let evaluator = NGramEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);

    evaluator
        .evaluate(&precomputed, &mut solution, Some(1))
        .unwrap();
    assert_eq!(solution.log_probabilities().len(), 2);
}

#[test]
fn test_roll_back_restores_state_exactly() {
    let model = bigram_model();
    let cipher = Arc::new(Cipher::from_text("t", "ABCABDCA").unwrap());
    let mut solution = solved(
        Arc::clone(&cipher),
        &[("A", 't'), ("B", 'h'), ("C", 'e'), ("D", 'r')],
    );
    let evaluator = NGramAndIndexOfCoincidenceEvaluator::new(model);
    let precomputed = evaluator.precompute(&cipher);
    evaluator.evaluate(&precomputed, &mut solution, None).unwrap();

    let windows = solution.log_probabilities().to_vec();
    let aggregate = solution.log_probability();
    let ioc = solution.index_of_coincidence();

    let previous = solution.replace_letter(2, b'n');
    let score = evaluator
        .evaluate(&precomputed, &mut solution, Some(2))
        .unwrap();
    assert_ne!(solution.log_probabilities(), windows.as_slice());

    score.roll_back(&mut solution);
    solution.replace_letter(2, previous);

    assert_eq!(solution.log_probabilities(), windows.as_slice());
    assert_eq!(solution.log_probability().to_bits(), aggregate.to_bits());
    assert_eq!(solution.index_of_coincidence().to_bits(), ioc.to_bits());
}

prop_compose! {
    fn arb_cipher_text()(text in proptest::collection::vec(0u8..6, 3..40)) -> String {
        text.into_iter().map(|s| (b'A' + s) as char).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_incremental_matches_full(
        text in arb_cipher_text(),
        initial in proptest::collection::vec(b'a'..=b'z', 6),
        changes in proptest::collection::vec((0usize..6, b'a'..=b'z'), 1..20),
        kind in prop_oneof![
            Just(EvaluatorKind::NGram),
            Just(EvaluatorKind::NGramAndIndexOfCoincidence),
            Just(EvaluatorKind::NGramAndEntropy),
        ],
    ) {
        let model = bigram_model();
        let cipher = Arc::new(Cipher::from_text("prop", &text).unwrap());
        let mut solution = CipherSolution::new(Arc::clone(&cipher));
        for id in 0..cipher.symbol_count() {
            solution.replace_letter(id, initial[id]);
        }

        let evaluator = kind.build(model);
        let precomputed = evaluator.precompute(&cipher);
        evaluator.evaluate(&precomputed, &mut solution, None).unwrap();

        for (symbol, letter) in changes {
            let id = symbol % cipher.symbol_count();
            solution.replace_letter(id, letter);
            let incremental = evaluator
                .evaluate(&precomputed, &mut solution, Some(id))
                .unwrap();

            let mut fresh = solution.clone();
            let full = evaluator.evaluate(&precomputed, &mut fresh, None).unwrap();

            prop_assert_eq!(solution.log_probabilities(), fresh.log_probabilities());
            prop_assert!((incremental.score - full.score).abs() < 1e-3);
        }
    }
}

// --- REGISTRY ---

#[test]
fn test_evaluator_registry() {
    assert_eq!(
        EvaluatorKind::from_name("NGram").unwrap(),
        EvaluatorKind::NGram
    );
    assert_eq!(
        EvaluatorKind::NGramAndIndexOfCoincidence.to_string(),
        "NGramAndIndexOfCoincidence"
    );

    assert_eq!(
        EvaluatorKind::from_name("NGramAndEntropy").unwrap(),
        EvaluatorKind::NGramAndEntropy
    );

    let err = EvaluatorKind::from_name("Neural").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Neural"));
    assert!(message.contains("NGramAndIndexOfCoincidence"));

    let evaluator = EvaluatorKind::NGram.build(bigram_model());
    assert_eq!(evaluator.model().order(), 2);
}
