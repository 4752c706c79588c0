use crate::reports;
use cipherforge::config::SolverConfig;
use cipherforge::error::{CfResult, CipherForgeError};
use cipherforge::model::{cache, ModelBuildParams};
use clap::Args;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct BuildModelArgs {
    #[command(flatten)]
    pub config: SolverConfig,

    /// Rebuild even when a valid cache already exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

pub fn run(args: BuildModelArgs, params: &ModelBuildParams) -> CfResult<()> {
    let cache_path = params.cache_path.as_ref().ok_or_else(|| {
        CipherForgeError::Config("build-model needs a model cache path".to_string())
    })?;

    if !args.force {
        if let Some(model) =
            cache::read_if_valid(cache_path, params.order, params.max_ngrams_to_keep)?
        {
            info!("⚡ Cache at {:?} is already current", cache_path);
            reports::print_model_summary(&model, cache_path);
            return Ok(());
        }
    }

    info!("🔨 Building order-{} model from {:?}", params.order, params.ngram_path);
    let model = params.build_array_model()?;
    cache::write(cache_path, &model, params.max_ngrams_to_keep)?;
    info!("💾 Wrote model cache to {:?}", cache_path);

    reports::print_model_summary(&model, cache_path);
    Ok(())
}
