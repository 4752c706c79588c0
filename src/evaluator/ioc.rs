use crate::consts::ALPHABET_SIZE;
use crate::model::letter_index;

/// Precomputed terms of the index of coincidence for one text length.
///
/// `IoC = Σ nᵢ(nᵢ - 1) / (L(L - 1))`; the numerator term for every possible
/// letter count is looked up instead of multiplied.
#[derive(Debug, Clone)]
pub struct IndexOfCoincidence {
    numerators: Vec<u64>,
    denominator: f32,
}

impl IndexOfCoincidence {
    pub fn new(length: usize) -> Self {
        let numerators = (0..=length as u64).map(|i| i * i.saturating_sub(1)).collect();
        let denominator = length as f32 * length.saturating_sub(1) as f32;
        Self {
            numerators,
            denominator,
        }
    }

    pub fn evaluate(&self, plaintext: &[u8]) -> f32 {
        if self.denominator == 0.0 {
            return 0.0;
        }

        let mut counts = [0usize; ALPHABET_SIZE];
        for &b in plaintext {
            if let Some(idx) = letter_index(b) {
                counts[idx] += 1;
            }
        }

        let numerator: u64 = counts
            .iter()
            .map(|&c| self.numerators.get(c).copied().unwrap_or(0))
            .sum();
        numerator as f32 / self.denominator
    }
}
