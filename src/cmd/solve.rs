use crate::reports;
use cipherforge::cipher::Cipher;
use cipherforge::config::SolverConfig;
use cipherforge::error::CfResult;
use cipherforge::model::{LanguageModel, ModelBuildParams};
use cipherforge::optimizer::{
    AnnealingOptions, EpochCallback, EpochReport, SimulatedAnnealingOptimizer, SolutionOptimizer,
};
use clap::Args;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    pub config: SolverConfig,

    #[arg(short = 'C', long)]
    pub cipher: String,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Score with the prefix trie instead of the direct-address table.
    #[arg(long, default_value_t = false)]
    pub trie: bool,

    /// Stop launching epochs once one reproduces the known solution.
    #[arg(long, default_value_t = false)]
    pub stop_when_solved: bool,
}

struct ProgressLogger {
    threshold: f32,
    stop_when_solved: bool,
}

impl EpochCallback for ProgressLogger {
    fn on_epoch_complete(&self, report: &EpochReport) -> bool {
        reports::print_epoch_line(report);
        match report.known_solution_proximity {
            Some(p) if self.stop_when_solved && p >= self.threshold => {
                info!("🎯 Epoch {} reproduced the known solution", report.epoch);
                false
            }
            _ => true,
        }
    }
}

pub fn run(args: SolveArgs, config: SolverConfig, params: &ModelBuildParams) -> CfResult<()> {
    info!("📂 Loading Cipher: {}", args.cipher);
    let cipher = Arc::new(Cipher::load_from_file(&args.cipher)?);
    reports::print_cipher_grid(&cipher);

    let start = Instant::now();
    let model: Arc<dyn LanguageModel> = if args.trie {
        Arc::new(params.build_tree_model()?)
    } else {
        Arc::new(params.load_or_build()?)
    };
    info!(
        "🧠 Model ready (order {}) in {}ms",
        model.order(),
        start.elapsed().as_millis()
    );

    let evaluator = config.evaluator_kind()?.build(Arc::clone(&model));

    let mut options = AnnealingOptions::try_from(&config)?;
    options.seed = args.seed;
    let optimizer = SimulatedAnnealingOptimizer::new(model.as_ref(), options)?;

    let progress = ProgressLogger {
        threshold: config.search.known_solution_correctness_threshold,
        stop_when_solved: args.stop_when_solved,
    };

    println!(
        "\n🔥 Annealing '{}' for {} epochs of {} sweeps",
        cipher.name(),
        config.search.epochs,
        config.search.sampler_iterations
    );
    let best = optimizer.optimize(
        Arc::clone(&cipher),
        config.search.epochs,
        evaluator,
        &progress,
    )?;

    reports::print_solution_report(&best)?;
    Ok(())
}
