use cipherforge::cipher::Cipher;
use cipherforge::error::CipherForgeError;
use cipherforge::solution::CipherSolution;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn abcab() -> Arc<Cipher> {
    Arc::new(Cipher::from_text("abcab", "ABCAB").unwrap())
}

// --- CIPHER ---

#[test]
fn test_cipher_assigns_ids_in_first_appearance_order() {
    let cipher = abcab();
    assert_eq!(cipher.len(), 5);
    assert_eq!(cipher.rows(), 1);
    assert_eq!(cipher.columns(), 5);
    assert_eq!(cipher.symbol_count(), 3);
    assert_eq!(cipher.symbols(), &["A", "B", "C"]);
    assert_eq!(cipher.symbol_ids(), &[0, 1, 2, 0, 1]);
    assert_eq!(cipher.indices_of(0), &[0, 3]);
    assert_eq!(cipher.indices_of(2), &[2]);
    assert_eq!(cipher.symbol_id("C"), Some(2));
    assert_eq!(cipher.symbol_id("Z"), None);
}

#[test]
fn test_cipher_validates_shape() {
    let symbols: Vec<String> = ["x", "y", "z"].iter().map(|s| s.to_string()).collect();
    assert!(matches!(
        Cipher::new("bad", 2, 2, symbols),
        Err(CipherForgeError::Validation(_))
    ));
    assert!(matches!(
        Cipher::new("empty", 0, 0, Vec::new()),
        Err(CipherForgeError::Config(_))
    ));
}

#[test]
fn test_cipher_loads_from_json() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "name": "tiny",
            "rows": 2,
            "columns": 2,
            "ciphertext": ["+", "K", "K", "+"],
            "knownSolutionKey": {{ "+": "o", "K": "n" }}
        }}"#
    )
    .unwrap();

    let cipher = Cipher::load_from_file(file.path()).unwrap();
    assert_eq!(cipher.name(), "tiny");
    assert_eq!(cipher.rows(), 2);
    assert_eq!(cipher.symbol_count(), 2);
    assert!(cipher.has_known_solution());
    assert_eq!(cipher.known_solution().unwrap()["K"], 'n');
}

#[test]
fn test_known_solution_must_reference_real_symbols() {
    let cipher = Cipher::from_text("t", "AB").unwrap();
    let key = BTreeMap::from([("Q".to_string(), 'e')]);
    assert!(matches!(
        cipher.with_known_solution(key),
        Err(CipherForgeError::Validation(_))
    ));
}

// --- MAPPINGS ---

#[test]
fn test_put_mapping_updates_plaintext_at_every_occurrence() {
    let mut solution = CipherSolution::new(abcab());
    assert_eq!(solution.plaintext(), b"?????");
    assert!(!solution.is_complete());

    solution.put_mapping("A", 't').unwrap();
    assert_eq!(solution.plaintext(), b"t??t?");
    assert_eq!(solution.mapping("A"), Some('t'));
    assert_eq!(solution.mapped_count(), 1);

    solution.put_mapping("B", 'h').unwrap();
    solution.put_mapping("C", 'e').unwrap();
    assert!(solution.is_complete());
    assert_eq!(solution.as_single_line_string(), "theth");
    assert_eq!(solution.mappings()["C"], 'e');
}

#[test]
fn test_put_mapping_refuses_to_overwrite() {
    let mut solution = CipherSolution::new(abcab());
    solution.put_mapping("A", 't').unwrap();
    assert!(matches!(
        solution.put_mapping("A", 'x'),
        Err(CipherForgeError::Validation(_))
    ));
}

#[test]
fn test_replace_mapping_returns_previous_letter() {
    let mut solution = CipherSolution::new(abcab());
    assert!(solution.replace_mapping("A", 'x').is_err());

    solution.put_mapping("A", 't').unwrap();
    assert_eq!(solution.replace_mapping("A", 's').unwrap(), 't');
    assert_eq!(&solution.plaintext()[..4], b"s??s");

    assert_eq!(solution.replace_letter(0, b'q'), b's');
    assert_eq!(solution.letter(0), Some(b'q'));
}

#[test]
fn test_mapping_input_is_validated() {
    let mut solution = CipherSolution::new(abcab());
    assert!(solution.put_mapping("Z", 'a').is_err());
    assert!(solution.put_mapping("A", 'E').is_err());
    assert!(solution.put_mapping("A", 'é').is_err());
}

#[test]
fn test_with_mappings_requires_full_coverage() {
    let full = CipherSolution::with_mappings(abcab(), [("A", 'a'), ("B", 'b'), ("C", 'c')]);
    assert_eq!(full.unwrap().plaintext(), b"abcab");

    let partial = CipherSolution::with_mappings(abcab(), [("A", 'a')]);
    assert!(matches!(partial, Err(CipherForgeError::Validation(_))));
}

// --- LOG-PROBABILITY BOOKKEEPING ---

#[test]
fn test_window_vector_and_aggregate_move_together() {
    let mut solution = CipherSolution::new(abcab());
    assert_eq!(solution.mean_log_probability(), 0.0);

    solution.push_log_probability(-1.0);
    solution.push_log_probability(-2.0);
    solution.push_log_probability(-3.0);
    assert_eq!(solution.log_probability(), -6.0);
    assert_eq!(solution.mean_log_probability(), -2.0);

    let old = solution.replace_log_probability(1, -5.0);
    assert_eq!(old, -2.0);
    assert_eq!(solution.log_probability_at(1), -5.0);
    assert_eq!(solution.log_probability(), -9.0);

    solution.resync_log_probability().unwrap();
    assert_eq!(solution.log_probability(), -9.0);

    solution.clear_log_probabilities();
    assert!(solution.log_probabilities().is_empty());
    assert_eq!(solution.log_probability(), 0.0);
}

#[test]
fn test_resync_flags_a_drifted_aggregate() {
    let mut solution = CipherSolution::new(abcab());
    solution.push_log_probability(-1.0);
    solution.push_log_probability(-2.0);
    solution.restore_aggregates(-30.0, 0.0);

    assert!(matches!(
        solution.resync_log_probability(),
        Err(CipherForgeError::Invariant(_))
    ));
}

// --- KNOWN SOLUTION ---

#[test]
fn test_known_solution_proximity() {
    let key = BTreeMap::from([
        ("A".to_string(), 't'),
        ("B".to_string(), 'h'),
        ("C".to_string(), 'e'),
    ]);
    let cipher = Arc::new(
        Cipher::from_text("known", "ABCAB")
            .unwrap()
            .with_known_solution(key)
            .unwrap(),
    );

    let mut solution = CipherSolution::new(Arc::clone(&cipher));
    assert_eq!(solution.evaluate_known_solution().unwrap(), 0.0);

    solution.put_mapping("A", 't').unwrap();
    solution.put_mapping("B", 'h').unwrap();
    solution.put_mapping("C", 'x').unwrap();
    let proximity = solution.evaluate_known_solution().unwrap();
    assert!((proximity - 2.0 / 3.0).abs() < 1e-6);

    let unknown = CipherSolution::new(abcab());
    assert!(unknown.evaluate_known_solution().is_err());
}

#[test]
fn test_cmp_score_orders_by_score() {
    let mut a = CipherSolution::new(abcab());
    let mut b = a.clone();
    a.set_score(-2.0);
    b.set_score(-1.5);
    assert!(a.cmp_score(&b).is_lt());
    assert!(b.cmp_score(&a).is_gt());
}
