use cipherforge::config::SolverConfig;
use cipherforge::model::ModelBuildParams;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, short, long, default_value = "data/ngrams.csv")]
    ngrams: String,

    /// JSON solver configuration; explicit flags override its values.
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    no_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Solve(cmd::solve::SolveArgs),
    BuildModel(cmd::build_model::BuildModelArgs),
}

fn main() {
    tracing_subscriber::fmt::init();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    info!("🚀 Initializing CipherForge...");

    let cli_config = match &cli.command {
        Commands::Solve(args) => &args.config,
        Commands::BuildModel(args) => &args.config,
    };
    let sub_matches = matches
        .subcommand()
        .map(|(_, m)| m)
        .unwrap_or(&matches);

    let config = match &cli.config {
        Some(path) => {
            info!("⚙️  Loading configuration from: {}", path);
            let mut file_config = SolverConfig::load_from_file(path).unwrap_or_else(|e| {
                error!("❌ Failed to load configuration '{}': {}", path, e);
                process::exit(1);
            });
            file_config.merge_from_cli(cli_config, sub_matches);
            file_config
        }
        None => cli_config.clone(),
    };

    if let Err(e) = config.validate() {
        error!("❌ {}", e);
        process::exit(1);
    }

    let build_params = if cli.no_cache || config.model.model_cache.is_empty() {
        warn!("⚠️  Model cache disabled, the model will be rebuilt from {}", cli.ngrams);
        ModelBuildParams::builder()
            .ngram_path(PathBuf::from(&cli.ngrams))
            .order(config.model.order)
            .max_ngrams_to_keep(config.model.max_ngrams_to_keep)
            .build()
    } else {
        ModelBuildParams::builder()
            .ngram_path(PathBuf::from(&cli.ngrams))
            .order(config.model.order)
            .max_ngrams_to_keep(config.model.max_ngrams_to_keep)
            .cache_path(PathBuf::from(&config.model.model_cache))
            .build()
    };
    let build_params = ModelBuildParams {
        unknown_probability: config.model.unknown_probability,
        ..build_params
    };

    let result = match cli.command {
        Commands::Solve(args) => cmd::solve::run(args, config, &build_params),
        Commands::BuildModel(args) => cmd::build_model::run(args, &build_params),
    };

    if let Err(e) = result {
        error!("\n❌ FATAL ERROR:");
        error!("   {}", e);
        process::exit(1);
    }
}
