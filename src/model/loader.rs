use super::NGramNode;
use crate::error::{CfResult, CipherForgeError};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// One row of an n-gram export.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NGramRecord {
    cumulative_string: String,
    order: usize,
    count: u64,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default)]
    log_probability: Option<f64>,
    #[serde(default)]
    conditional_probability: Option<f64>,
    #[serde(default)]
    log_conditional_probability: Option<f64>,
}

impl NGramRecord {
    fn into_node(self) -> CfResult<NGramNode> {
        let ngram = self.cumulative_string.trim().to_ascii_lowercase();
        if ngram.len() != self.order {
            return Err(CipherForgeError::Construction(format!(
                "N-gram '{}' declares order {} but has {} letters",
                ngram,
                self.order,
                ngram.len()
            )));
        }

        let log_probability = match (self.log_probability, self.probability) {
            (Some(lp), _) => lp,
            (None, Some(p)) if p > 0.0 => p.ln(),
            _ => {
                return Err(CipherForgeError::Construction(format!(
                    "N-gram '{}' has no usable probability",
                    ngram
                )))
            }
        };

        Ok(NGramNode {
            ngram,
            count: self.count,
            probability: self.probability.unwrap_or_else(|| log_probability.exp()),
            log_probability,
            conditional_probability: self.conditional_probability.unwrap_or(0.0),
            log_conditional_probability: self.log_conditional_probability.unwrap_or(0.0),
        })
    }
}

/// Parses an n-gram CSV with a header row:
/// `cumulativeString,order,count,probability,logProbability,conditionalProbability,logConditionalProbability`.
pub fn read_ngram_nodes<R: Read>(reader: R) -> CfResult<Vec<NGramNode>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut nodes = Vec::new();
    for record in rdr.deserialize::<NGramRecord>() {
        nodes.push(record?.into_node()?);
    }
    Ok(nodes)
}

pub fn load_ngram_nodes<P: AsRef<Path>>(path: P) -> CfResult<Vec<NGramNode>> {
    let path = path.as_ref();
    info!("📚 Loading n-grams from {:?}", path);
    let nodes = read_ngram_nodes(File::open(path)?)?;
    info!("Loaded {} n-grams", nodes.len());
    Ok(nodes)
}

/// Keeps the first-order nodes plus the `max_ngrams_to_keep` most frequent
/// n-grams of `order`. Everything else is dropped.
pub fn select_model_nodes(
    nodes: Vec<NGramNode>,
    order: usize,
    max_ngrams_to_keep: usize,
) -> Vec<NGramNode> {
    let (mut first_order, mut kgrams): (Vec<_>, Vec<_>) = nodes
        .into_iter()
        .filter(|n| n.order() == 1 || n.order() == order)
        .partition(|n| n.order() == 1 && order != 1);

    if kgrams.len() > max_ngrams_to_keep {
        warn!(
            "Keeping the {} most frequent of {} order-{} n-grams",
            max_ngrams_to_keep,
            kgrams.len(),
            order
        );
    }
    kgrams.sort_by(|a, b| b.count.cmp(&a.count));
    kgrams.truncate(max_ngrams_to_keep);

    first_order.append(&mut kgrams);
    first_order
}
