use crate::cipher::Cipher;
use crate::consts::{AGGREGATE_DRIFT_TOLERANCE, UNMAPPED_LETTER};
use crate::error::{CfResult, CipherForgeError};
use crate::model::letter_index;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A symbol-to-letter mapping for one cipher, together with the per-window
/// log-probabilities of its decryption and the derived score.
///
/// The window vector and its running sum are only ever changed together.
#[derive(Debug, Clone)]
pub struct CipherSolution {
    cipher: Arc<Cipher>,
    mappings: Vec<Option<u8>>,
    plaintext: Vec<u8>,
    log_probabilities: Vec<f32>,
    log_probability: f32,
    index_of_coincidence: f32,
    score: f32,
}

impl CipherSolution {
    pub fn new(cipher: Arc<Cipher>) -> Self {
        let symbol_count = cipher.symbol_count();
        let len = cipher.len();
        Self {
            cipher,
            mappings: vec![None; symbol_count],
            plaintext: vec![UNMAPPED_LETTER; len],
            log_probabilities: Vec::new(),
            log_probability: 0.0,
            index_of_coincidence: 0.0,
            score: 0.0,
        }
    }

    /// Builds a fully mapped solution from `(symbol, letter)` pairs.
    pub fn with_mappings<'a, I>(cipher: Arc<Cipher>, mappings: I) -> CfResult<Self>
    where
        I: IntoIterator<Item = (&'a str, char)>,
    {
        let mut solution = Self::new(cipher);
        for (symbol, letter) in mappings {
            solution.put_mapping(symbol, letter)?;
        }
        if !solution.is_complete() {
            return Err(CipherForgeError::Validation(format!(
                "Mapping for cipher '{}' does not cover every symbol",
                solution.cipher.name()
            )));
        }
        Ok(solution)
    }

    pub fn cipher(&self) -> &Arc<Cipher> {
        &self.cipher
    }

    fn resolve(&self, symbol: &str) -> CfResult<usize> {
        self.cipher.symbol_id(symbol).ok_or_else(|| {
            CipherForgeError::Validation(format!(
                "Symbol '{}' does not occur in cipher '{}'",
                symbol,
                self.cipher.name()
            ))
        })
    }

    fn letter_byte(letter: char) -> CfResult<u8> {
        u8::try_from(letter)
            .ok()
            .filter(|&b| letter_index(b).is_some())
            .ok_or_else(|| {
                CipherForgeError::Validation(format!("'{}' is not a lowercase letter", letter))
            })
    }

    /// Adds a mapping for a symbol that has none yet.
    pub fn put_mapping(&mut self, symbol: &str, letter: char) -> CfResult<()> {
        let id = self.resolve(symbol)?;
        if self.mappings[id].is_some() {
            return Err(CipherForgeError::Validation(format!(
                "Symbol '{}' is already mapped; use replace_mapping instead",
                symbol
            )));
        }
        self.set_letter(id, Self::letter_byte(letter)?);
        Ok(())
    }

    /// Changes an existing mapping and returns the previous letter.
    pub fn replace_mapping(&mut self, symbol: &str, letter: char) -> CfResult<char> {
        let id = self.resolve(symbol)?;
        let letter = Self::letter_byte(letter)?;
        match self.mappings[id] {
            Some(_) => Ok(self.replace_letter(id, letter) as char),
            None => Err(CipherForgeError::Validation(format!(
                "Symbol '{}' has no mapping to replace",
                symbol
            ))),
        }
    }

    /// Id-based mapping update used on the hot path. Returns the previous
    /// letter, or [`UNMAPPED_LETTER`] if the symbol was unmapped.
    #[inline]
    pub fn replace_letter(&mut self, id: usize, letter: u8) -> u8 {
        let old = self.mappings[id].unwrap_or(UNMAPPED_LETTER);
        self.set_letter(id, letter);
        old
    }

    #[inline]
    fn set_letter(&mut self, id: usize, letter: u8) {
        self.mappings[id] = Some(letter);
        for &pos in self.cipher.indices_of(id) {
            self.plaintext[pos] = letter;
        }
    }

    #[inline]
    pub fn letter(&self, id: usize) -> Option<u8> {
        self.mappings[id]
    }

    pub fn mapping(&self, symbol: &str) -> Option<char> {
        self.cipher
            .symbol_id(symbol)
            .and_then(|id| self.mappings[id])
            .map(char::from)
    }

    /// All mappings keyed by symbol.
    pub fn mappings(&self) -> BTreeMap<String, char> {
        self.cipher
            .symbols()
            .iter()
            .zip(&self.mappings)
            .filter_map(|(s, m)| m.map(|b| (s.clone(), b as char)))
            .collect()
    }

    pub fn mapped_count(&self) -> usize {
        self.mappings.iter().filter(|m| m.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.mappings.iter().all(Option::is_some)
    }

    /// Decrypted text as bytes, one per ciphertext position.
    #[inline]
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    pub fn as_single_line_string(&self) -> String {
        String::from_utf8_lossy(&self.plaintext).into_owned()
    }

    pub fn log_probabilities(&self) -> &[f32] {
        &self.log_probabilities
    }

    pub fn log_probability_at(&self, index: usize) -> f32 {
        self.log_probabilities[index]
    }

    /// Running sum of the window vector.
    pub fn log_probability(&self) -> f32 {
        self.log_probability
    }

    /// Mean window log-probability; zero when there are no windows.
    pub fn mean_log_probability(&self) -> f32 {
        if self.log_probabilities.is_empty() {
            0.0
        } else {
            self.log_probability / self.log_probabilities.len() as f32
        }
    }

    pub fn clear_log_probabilities(&mut self) {
        self.log_probabilities.clear();
        self.log_probability = 0.0;
    }

    pub fn push_log_probability(&mut self, value: f32) {
        self.log_probabilities.push(value);
        self.log_probability += value;
    }

    /// Overwrites one window and adjusts the aggregate; returns the old value.
    #[inline]
    pub fn replace_log_probability(&mut self, index: usize, value: f32) -> f32 {
        let old = self.log_probabilities[index];
        self.log_probabilities[index] = value;
        self.log_probability -= old;
        self.log_probability += value;
        old
    }

    /// Recomputes the aggregate from the vector and fails if the incremental
    /// sum had drifted beyond tolerance.
    pub fn resync_log_probability(&mut self) -> CfResult<()> {
        let exact: f32 = self.log_probabilities.iter().sum();
        let drift = (exact - self.log_probability).abs();
        if drift > AGGREGATE_DRIFT_TOLERANCE * exact.abs().max(1.0) {
            return Err(CipherForgeError::Invariant(format!(
                "Aggregate log-probability {} drifted from window sum {}",
                self.log_probability, exact
            )));
        }
        self.log_probability = exact;
        Ok(())
    }

    /// Puts back aggregates captured before an evaluation that is being undone.
    pub fn restore_aggregates(&mut self, log_probability: f32, index_of_coincidence: f32) {
        self.log_probability = log_probability;
        self.index_of_coincidence = index_of_coincidence;
    }

    pub fn index_of_coincidence(&self) -> f32 {
        self.index_of_coincidence
    }

    pub fn set_index_of_coincidence(&mut self, value: f32) {
        self.index_of_coincidence = value;
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn set_score(&mut self, score: f32) {
        self.score = score;
    }

    /// Fraction of mapped symbols whose letter agrees with the cipher's known solution.
    pub fn evaluate_known_solution(&self) -> CfResult<f32> {
        let known = self.cipher.known_solution().ok_or_else(|| {
            CipherForgeError::Validation(format!(
                "Cipher '{}' does not have a known solution",
                self.cipher.name()
            ))
        })?;

        let mapped = self.mapped_count();
        if mapped == 0 {
            return Ok(0.0);
        }
        if known.len() != mapped {
            debug!(
                "Solution maps {} symbols but the known solution has {}",
                mapped,
                known.len()
            );
        }

        let matching = known
            .iter()
            .filter(|&(symbol, letter)| self.mapping(symbol) == Some(*letter))
            .count();
        Ok(matching as f32 / mapped as f32)
    }

    /// Orders solutions by score; higher is better.
    pub fn cmp_score(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
    }
}
