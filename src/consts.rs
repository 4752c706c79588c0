/// Number of letters in the plaintext alphabet.
pub const ALPHABET_SIZE: usize = 26;

/// Byte value of the first letter of the alphabet.
pub const ASCII_OFFSET: u8 = b'a';

/// Default n-gram order used by the language model.
pub const DEFAULT_ORDER: usize = 5;

/// Largest order the direct-address table accepts (26^6 floats is already ~1.2 GB).
pub const MAX_ARRAY_ORDER: usize = 6;

/// File signature of a model cache ("ZMMC").
pub const CACHE_MAGIC: i32 = 0x5A4D_4D43;

/// Current model cache format version.
pub const CACHE_VERSION: i32 = 1;

/// Share of the letter sampling mass spread evenly over all letters.
pub const FLAT_MASS_WEIGHT: f32 = 0.8;

/// Number of bucket slots one unit of letter probability is worth.
pub const LETTER_BUCKET_RESOLUTION: f32 = 1000.0;

/// The n-gram and IoC score is scaled by IoC^(1/6).
pub const IOC_SCORE_EXPONENT: f32 = 1.0 / 6.0;

/// The n-gram and entropy score divides by entropy × 0.25.
pub const ENTROPY_SCORE_WEIGHT: f32 = 0.25;

/// Floor for plaintext entropy (bits) so a single-letter text scores finitely.
pub const MIN_ENTROPY: f32 = 1e-3;

/// Allowed relative drift between the running aggregate and the sum of the window vector.
pub const AGGREGATE_DRIFT_TOLERANCE: f32 = 1e-3;

/// Placeholder byte for plaintext positions whose symbol has no mapping yet.
pub const UNMAPPED_LETTER: u8 = b'?';

/// Default cap on the number of k-grams kept from an n-gram export.
pub const DEFAULT_MAX_NGRAMS_TO_KEEP: usize = 3_000_000;
