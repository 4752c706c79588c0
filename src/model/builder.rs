use super::array::{ArrayModel, ArrayModelBuilder};
use super::loader::{load_ngram_nodes, select_model_nodes};
use super::tree::TreeModel;
use super::{cache, NGramNode};
use crate::error::CfResult;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use typed_builder::TypedBuilder;

/// Everything needed to obtain a trained model, either from the cache or by
/// rebuilding it from the n-gram export.
#[derive(TypedBuilder, Debug, Clone)]
pub struct ModelBuildParams {
    pub ngram_path: PathBuf,
    #[builder(default = crate::consts::DEFAULT_ORDER)]
    pub order: usize,
    #[builder(default = crate::consts::DEFAULT_MAX_NGRAMS_TO_KEEP)]
    pub max_ngrams_to_keep: usize,
    #[builder(default, setter(strip_option))]
    pub unknown_probability: Option<f32>,
    #[builder(default, setter(strip_option))]
    pub cache_path: Option<PathBuf>,
}

impl ModelBuildParams {
    /// Returns the cached model when the cache matches this order and
    /// configuration, otherwise rebuilds it and refreshes the cache.
    pub fn load_or_build(&self) -> CfResult<ArrayModel> {
        if let Some(cache_path) = &self.cache_path {
            if let Some(model) =
                cache::read_if_valid(cache_path, self.order, self.max_ngrams_to_keep)?
            {
                info!("⚡ Loaded model from cache {:?}", cache_path);
                return Ok(model);
            }
            info!("Model cache miss at {:?}, rebuilding", cache_path);
        }

        let model = self.build_array_model()?;

        if let Some(cache_path) = &self.cache_path {
            cache::write(cache_path, &model, self.max_ngrams_to_keep)?;
        }
        Ok(model)
    }

    pub fn build_array_model(&self) -> CfResult<ArrayModel> {
        let nodes = load_ngram_nodes(&self.ngram_path)?;
        self.array_model_from_nodes(nodes)
    }

    pub fn array_model_from_nodes(&self, nodes: Vec<NGramNode>) -> CfResult<ArrayModel> {
        let start = Instant::now();
        let selected = select_model_nodes(nodes, self.order, self.max_ngrams_to_keep);

        let mut builder = ArrayModelBuilder::new(self.order)?;
        if let Some(p) = self.unknown_probability {
            builder = builder.unknown_probability(p);
        }
        builder.import(selected)?;
        let populated = builder.populated_count();
        let model = builder.finish()?;

        info!(
            "🔨 Built order-{} model with {} k-grams in {}ms",
            self.order,
            populated,
            start.elapsed().as_millis()
        );
        Ok(model)
    }

    /// Builds the trie variant from the same export. All orders up to the
    /// model order are kept so prefix queries have something to find.
    pub fn build_tree_model(&self) -> CfResult<TreeModel> {
        let nodes = load_ngram_nodes(&self.ngram_path)?;
        let mut model = TreeModel::new(self.order);
        let mut total = 0u64;
        for node in nodes.into_iter().filter(|n| n.order() <= self.order) {
            if node.order() == 1 {
                total += node.count;
            }
            model.add_node(node)?;
        }

        let probability = match self.unknown_probability {
            Some(p) => p as f64,
            None if total > 0 => 1.0 / total as f64,
            None => f64::MIN_POSITIVE,
        };
        model.set_unknown_probability(probability);
        Ok(model)
    }
}
