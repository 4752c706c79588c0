use crate::consts::{ALPHABET_SIZE, ASCII_OFFSET, FLAT_MASS_WEIGHT, LETTER_BUCKET_RESOLUTION};
use crate::error::{CfResult, CipherForgeError};
use crate::model::{letter_index, LanguageModel};
use fastrand::Rng;

/// Cumulative-weight sampler; an index is found by binary search over the
/// running totals.
#[derive(Debug, Clone)]
pub struct RouletteSampler {
    cumulative: Vec<f64>,
    total: f64,
}

impl RouletteSampler {
    /// Zero and negative weights can never be drawn.
    pub fn new(weights: &[f64]) -> CfResult<Self> {
        let mut total = 0.0;
        let cumulative = weights
            .iter()
            .map(|&w| {
                if w > 0.0 {
                    total += w;
                }
                total
            })
            .collect();

        if total <= 0.0 {
            return Err(CipherForgeError::Validation(
                "Roulette sampler needs at least one positive weight".to_string(),
            ));
        }
        Ok(Self { cumulative, total })
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn sample(&self, rng: &mut Rng) -> usize {
        let target = rng.f64() * self.total;
        let idx = self.cumulative.partition_point(|&c| c <= target);
        idx.min(self.cumulative.len() - 1)
    }
}

/// Initial-letter sampler built from the model's unigram counts.
#[derive(Debug, Clone)]
pub struct UnigramSampler {
    letters: Vec<u8>,
    roulette: RouletteSampler,
}

impl UnigramSampler {
    pub fn from_model(model: &dyn LanguageModel) -> CfResult<Self> {
        let (letters, weights): (Vec<u8>, Vec<f64>) = model
            .first_order_nodes()
            .into_iter()
            .filter_map(|n| {
                let letter = n.letter()?;
                letter_index(letter).map(|_| (letter, n.count as f64))
            })
            .unzip();
        Ok(Self {
            letters,
            roulette: RouletteSampler::new(&weights)?,
        })
    }

    pub fn sample(&self, rng: &mut Rng) -> u8 {
        self.letters[self.roulette.sample(rng)]
    }
}

/// Flattened unigram distribution materialised as a bucket of letters.
///
/// Each letter gets `1000 * (p * (1 - w) + w / n)` slots, so common letters
/// are still preferred while rare ones keep a fair chance.
#[derive(Debug, Clone)]
pub struct BiasedLetterBucket {
    bucket: Vec<u8>,
}

impl BiasedLetterBucket {
    pub fn from_model(model: &dyn LanguageModel) -> CfResult<Self> {
        let nodes: Vec<_> = model
            .first_order_nodes()
            .into_iter()
            .filter(|n| n.letter().and_then(letter_index).is_some())
            .collect();
        let total: u64 = nodes.iter().map(|n| n.count).sum();
        if nodes.is_empty() || total == 0 {
            return Err(CipherForgeError::Validation(
                "Model has no first-order counts to build a letter bucket from".to_string(),
            ));
        }

        let flat_mass = FLAT_MASS_WEIGHT / nodes.len() as f32;
        let mut bucket = Vec::new();
        for node in nodes {
            let probability = node.count as f32 / total as f32;
            let scaled_mass = probability * (1.0 - FLAT_MASS_WEIGHT);
            let slots = (LETTER_BUCKET_RESOLUTION * (scaled_mass + flat_mass)) as usize;
            if let Some(letter) = node.letter() {
                bucket.extend(std::iter::repeat(letter).take(slots));
            }
        }
        Ok(Self { bucket })
    }

    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    pub fn slots_for(&self, letter: u8) -> usize {
        self.bucket.iter().filter(|&&b| b == letter).count()
    }

    pub fn sample(&self, rng: &mut Rng) -> u8 {
        self.bucket[rng.usize(..self.bucket.len())]
    }
}

/// Uniform draw from `a..=z`.
#[inline]
pub fn uniform_letter(rng: &mut Rng) -> u8 {
    ASCII_OFFSET + rng.u8(..ALPHABET_SIZE as u8)
}
