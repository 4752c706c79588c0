use crate::error::{CfResult, CipherForgeError};
use crate::evaluator::EvaluatorKind;
use crate::optimizer::InitialSampler;
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolverConfig {
    #[command(flatten)]
    #[serde(default)]
    pub search: SearchParams,
    #[command(flatten)]
    #[serde(default)]
    pub model: ModelParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,
    #[arg(long, default_value_t = 5000)]
    pub sampler_iterations: usize,
    #[arg(long, default_value_t = 0.006)]
    pub temp_min: f32,
    #[arg(long, default_value_t = 0.012)]
    pub temp_max: f32,

    // Visit symbols in a fresh random order every sweep
    #[arg(long, default_value_t = false)]
    pub iterate_randomly: bool,

    // Score a cloned solution per proposal instead of mutate-and-rollback
    #[arg(long, default_value_t = false)]
    pub clone_per_proposal: bool,

    #[arg(long, default_value_t = 0.9)]
    pub known_solution_correctness_threshold: f32,

    // NGram | NGramAndIndexOfCoincidence | NGramAndEntropy
    #[arg(long, default_value = "NGramAndIndexOfCoincidence")]
    pub evaluator: String,

    // roulette | biased_bucket
    #[arg(long, default_value = "roulette")]
    pub initial_sampler: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            epochs: 10,
            sampler_iterations: 5000,
            temp_min: 0.006,
            temp_max: 0.012,
            iterate_randomly: false,
            clone_per_proposal: false,
            known_solution_correctness_threshold: 0.9,
            evaluator: "NGramAndIndexOfCoincidence".to_string(),
            initial_sampler: "roulette".to_string(),
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    #[arg(long, default_value_t = crate::consts::DEFAULT_ORDER)]
    pub order: usize,
    #[arg(long, default_value_t = crate::consts::DEFAULT_MAX_NGRAMS_TO_KEEP)]
    pub max_ngrams_to_keep: usize,

    // Falls back to 1 / total unigram count when unset
    #[arg(long)]
    pub unknown_probability: Option<f32>,

    #[arg(long, default_value = "data/letter-model.zmmc")]
    pub model_cache: String,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            order: crate::consts::DEFAULT_ORDER,
            max_ngrams_to_keep: crate::consts::DEFAULT_MAX_NGRAMS_TO_KEEP,
            unknown_probability: None,
            model_cache: "data/letter-model.zmmc".to_string(),
        }
    }
}

impl SolverConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlays values the user typed on the command line; defaults never
    /// overwrite values that came from a file.
    pub fn merge_from_cli(&mut self, cli: &SolverConfig, matches: &ArgMatches) {
        self.search.merge_from_cli(&cli.search, matches);
        self.model.merge_from_cli(&cli.model, matches);
    }

    pub fn evaluator_kind(&self) -> CfResult<EvaluatorKind> {
        EvaluatorKind::from_name(&self.search.evaluator)
    }

    pub fn validate(&self) -> CfResult<()> {
        let s = &self.search;
        if s.sampler_iterations == 0 {
            return Err(CipherForgeError::Config(
                "sampler_iterations must be at least 1".to_string(),
            ));
        }
        if !(s.temp_min > 0.0 && s.temp_max >= s.temp_min) {
            return Err(CipherForgeError::Config(format!(
                "Temperatures must satisfy 0 < temp_min <= temp_max (got {} / {})",
                s.temp_min, s.temp_max
            )));
        }
        if !(0.0..=1.0).contains(&s.known_solution_correctness_threshold) {
            return Err(CipherForgeError::Config(format!(
                "known_solution_correctness_threshold must be within [0, 1], got {}",
                s.known_solution_correctness_threshold
            )));
        }
        if let Some(p) = self.model.unknown_probability {
            if !(p > 0.0 && p <= 1.0) {
                return Err(CipherForgeError::Config(format!(
                    "unknown_probability must be within (0, 1], got {}",
                    p
                )));
            }
        }
        self.evaluator_kind()?;
        InitialSampler::from_name(&s.initial_sampler)?;
        Ok(())
    }
}

macro_rules! update_if_present {
    ($target:expr, $source:expr, $matches:expr, $($field:ident),+ $(,)?) => {
        $(
            if $matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                $target.$field = $source.$field.clone();
            }
        )+
    };
}

impl SearchParams {
    pub fn merge_from_cli(&mut self, cli: &SearchParams, matches: &ArgMatches) {
        update_if_present!(
            self,
            cli,
            matches,
            epochs,
            sampler_iterations,
            temp_min,
            temp_max,
            iterate_randomly,
            clone_per_proposal,
            known_solution_correctness_threshold,
            evaluator,
            initial_sampler,
        );
    }
}

impl ModelParams {
    pub fn merge_from_cli(&mut self, cli: &ModelParams, matches: &ArgMatches) {
        update_if_present!(
            self,
            cli,
            matches,
            order,
            max_ngrams_to_keep,
            unknown_probability,
            model_cache,
        );
    }
}
