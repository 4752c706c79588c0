use crate::consts::ALPHABET_SIZE;
use crate::model::letter_index;

/// Shannon entropy of the plaintext letter distribution, in bits.
///
/// The `|log2(p) * p|` term for every possible letter count is precomputed
/// for one text length, so scoring is a table walk over 26 counts.
#[derive(Debug, Clone)]
pub struct Entropy {
    terms: Vec<f64>,
}

impl Entropy {
    pub fn new(length: usize) -> Self {
        let terms = (0..=length)
            .map(|i| {
                if i == 0 {
                    return 0.0;
                }
                let p = i as f64 / length as f64;
                (p.log2() * p).abs()
            })
            .collect();
        Self { terms }
    }

    pub fn evaluate(&self, plaintext: &[u8]) -> f32 {
        let mut counts = [0usize; ALPHABET_SIZE];
        for &b in plaintext {
            if let Some(idx) = letter_index(b) {
                counts[idx] += 1;
            }
        }

        let sum: f64 = counts
            .iter()
            .map(|&c| self.terms.get(c).copied().unwrap_or(0.0))
            .sum();
        sum as f32
    }
}
