use super::{letter_index, LanguageModel, NGramNode};
use crate::consts::{ALPHABET_SIZE, MAX_ARRAY_ORDER};
use crate::error::{CfResult, CipherForgeError};
use rayon::prelude::*;
use tracing::debug;

/// Number of slots needed to address every k-gram of the given order.
#[inline]
pub fn array_length(order: usize) -> usize {
    ALPHABET_SIZE.pow(order as u32)
}

/// Radix index of a k-gram: `Σ (letter_i - 'a') * 26^(k-1-i)`.
///
/// Returns `None` when any byte is outside `a..=z`.
#[inline(always)]
pub fn compute_index(kgram: &[u8]) -> Option<usize> {
    let mut idx = 0usize;
    for &b in kgram {
        idx = idx * ALPHABET_SIZE + letter_index(b)?;
    }
    Some(idx)
}

fn validate_order(order: usize) -> CfResult<()> {
    if order == 0 || order > MAX_ARRAY_ORDER {
        return Err(CipherForgeError::Config(format!(
            "Model order must be between 1 and {}, got {}",
            MAX_ARRAY_ORDER, order
        )));
    }
    Ok(())
}

/// Direct-address n-gram table. Built through [`ArrayModelBuilder`] and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ArrayModel {
    order: usize,
    unknown_probability: f32,
    unknown_log_probability: f32,
    first_order_nodes: Vec<NGramNode>,
    log_probabilities: Vec<f32>,
    populated: usize,
}

impl ArrayModel {
    /// Reassembles a finished model from its raw parts (used by the cache reader).
    pub fn from_parts(
        order: usize,
        unknown_probability: f32,
        first_order_nodes: Vec<NGramNode>,
        log_probabilities: Vec<f32>,
        populated: usize,
    ) -> CfResult<Self> {
        validate_order(order)?;
        if log_probabilities.len() != array_length(order) {
            return Err(CipherForgeError::Construction(format!(
                "Expected {} log-probabilities for order {}, got {}",
                array_length(order),
                order,
                log_probabilities.len()
            )));
        }

        Ok(Self {
            order,
            unknown_probability,
            unknown_log_probability: unknown_probability.ln(),
            first_order_nodes,
            log_probabilities,
            populated,
        })
    }

    /// Index of `kgram` if it is a valid k-gram for this model's order.
    pub fn index_of(&self, kgram: &str) -> Option<usize> {
        if kgram.len() != self.order {
            return None;
        }
        compute_index(kgram.as_bytes())
    }

    pub fn log_probabilities(&self) -> &[f32] {
        &self.log_probabilities
    }

    /// Number of k-grams that were trained (as opposed to holding the fallback).
    pub fn populated_count(&self) -> usize {
        self.populated
    }

    pub fn unknown_probability(&self) -> f32 {
        self.unknown_probability
    }
}

impl LanguageModel for ArrayModel {
    #[inline]
    fn order(&self) -> usize {
        self.order
    }

    #[inline(always)]
    fn lookup(&self, kgram: &[u8]) -> f32 {
        if kgram.len() != self.order {
            return self.unknown_log_probability;
        }
        match compute_index(kgram) {
            Some(idx) => self.log_probabilities[idx],
            None => self.unknown_log_probability,
        }
    }

    fn first_order_nodes(&self) -> Vec<&NGramNode> {
        self.first_order_nodes.iter().collect()
    }

    fn unknown_log_probability(&self) -> f32 {
        self.unknown_log_probability
    }
}

/// Mutable construction phase of an [`ArrayModel`].
///
/// Population is tracked with a presence map, so a trained value that happens
/// to equal the fallback is still recognised as a duplicate on re-insert.
pub struct ArrayModelBuilder {
    order: usize,
    unknown_probability: Option<f32>,
    unknown_log_probability: Option<f32>,
    first_order_nodes: Vec<NGramNode>,
    log_probabilities: Vec<f32>,
    present: Vec<bool>,
    populated: usize,
}

impl ArrayModelBuilder {
    pub fn new(order: usize) -> CfResult<Self> {
        validate_order(order)?;
        let len = array_length(order);
        Ok(Self {
            order,
            unknown_probability: None,
            unknown_log_probability: None,
            first_order_nodes: Vec::new(),
            log_probabilities: vec![0.0; len],
            present: vec![false; len],
            populated: 0,
        })
    }

    /// Fixes the fallback probability instead of deriving `1 / total count`.
    pub fn unknown_probability(mut self, probability: f32) -> Self {
        self.unknown_probability = Some(probability);
        self.unknown_log_probability = Some(probability.ln());
        self
    }

    /// Fixes the fallback log-probability exactly.
    pub fn unknown_log_probability(mut self, log_probability: f32) -> Self {
        self.unknown_probability = Some(log_probability.exp());
        self.unknown_log_probability = Some(log_probability);
        self
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn populated_count(&self) -> usize {
        self.populated
    }

    pub fn is_populated(&self, kgram: &str) -> bool {
        kgram.len() == self.order
            && compute_index(kgram.as_bytes()).is_some_and(|idx| self.present[idx])
    }

    /// Adds one trained node. Unigrams become first-order nodes; k-grams of
    /// the model's order go into the table.
    pub fn add_node(&mut self, node: NGramNode) -> CfResult<()> {
        let len = node.order();
        if len != 1 && len != self.order {
            return Err(CipherForgeError::Construction(format!(
                "N-gram '{}' has order {}, model expects 1 or {}",
                node.ngram, len, self.order
            )));
        }

        if len == self.order {
            let idx = compute_index(node.ngram.as_bytes()).ok_or_else(|| invalid_ngram(&node))?;
            if self.present[idx] {
                return Err(duplicate_ngram(&node.ngram));
            }
            self.present[idx] = true;
            self.log_probabilities[idx] = node.log_probability as f32;
            self.populated += 1;
        }

        if len == 1 {
            self.add_first_order_node(node)?;
        }
        Ok(())
    }

    fn add_first_order_node(&mut self, node: NGramNode) -> CfResult<()> {
        if letter_index(node.letter().unwrap_or(0)).is_none() {
            return Err(invalid_ngram(&node));
        }
        if self.first_order_nodes.iter().any(|n| n.ngram == node.ngram) {
            return Err(duplicate_ngram(&node.ngram));
        }
        self.first_order_nodes.push(node);
        Ok(())
    }

    /// Bulk import. The table is split into one slice per leading letter and
    /// each slice is filled on its own rayon task, since no two leading
    /// letters share a slot.
    pub fn import(&mut self, nodes: Vec<NGramNode>) -> CfResult<()> {
        let stride = array_length(self.order - 1);
        let mut partitions: Vec<Vec<(usize, NGramNode)>> =
            (0..ALPHABET_SIZE).map(|_| Vec::new()).collect();

        for node in nodes {
            if node.order() == 1 && self.order != 1 {
                self.add_first_order_node(node)?;
                continue;
            }
            if node.order() != self.order {
                return Err(CipherForgeError::Construction(format!(
                    "N-gram '{}' has order {}, model expects 1 or {}",
                    node.ngram,
                    node.order(),
                    self.order
                )));
            }
            let idx = compute_index(node.ngram.as_bytes()).ok_or_else(|| invalid_ngram(&node))?;
            if self.order == 1 {
                self.add_first_order_node(node.clone())?;
            }
            partitions[idx / stride].push((idx % stride, node));
        }

        let added: Vec<CfResult<usize>> = self
            .log_probabilities
            .par_chunks_mut(stride)
            .zip(self.present.par_chunks_mut(stride))
            .zip(partitions.into_par_iter())
            .map(|((slots, present), partition)| {
                let mut added = 0;
                for (offset, node) in partition {
                    if present[offset] {
                        return Err(duplicate_ngram(&node.ngram));
                    }
                    present[offset] = true;
                    slots[offset] = node.log_probability as f32;
                    added += 1;
                }
                Ok(added)
            })
            .collect();

        for result in added {
            self.populated += result?;
        }
        Ok(())
    }

    /// Seals the model. Every slot that was never trained receives the
    /// fallback log-probability.
    pub fn finish(self) -> CfResult<ArrayModel> {
        let (unknown_probability, unknown_log_probability) =
            match (self.unknown_probability, self.unknown_log_probability) {
                (Some(p), Some(lp)) => (p, lp),
                _ => {
                    let total: u64 = self.first_order_nodes.iter().map(|n| n.count).sum();
                    if total == 0 {
                        return Err(CipherForgeError::Construction(
                            "Cannot derive an unknown n-gram probability without first-order counts"
                                .to_string(),
                        ));
                    }
                    let p = 1.0 / total as f32;
                    (p, p.ln())
                }
            };

        let mut log_probabilities = self.log_probabilities;
        log_probabilities
            .par_iter_mut()
            .zip(self.present.par_iter())
            .for_each(|(slot, &present)| {
                if !present {
                    *slot = unknown_log_probability;
                }
            });

        debug!(
            "Finalized order-{} model: {} trained k-grams, {} first-order nodes, fallback {:.4}",
            self.order,
            self.populated,
            self.first_order_nodes.len(),
            unknown_log_probability
        );

        Ok(ArrayModel {
            order: self.order,
            unknown_probability,
            unknown_log_probability,
            first_order_nodes: self.first_order_nodes,
            log_probabilities,
            populated: self.populated,
        })
    }
}

fn duplicate_ngram(ngram: &str) -> CipherForgeError {
    CipherForgeError::Construction(format!("Unable to add the same n-gram twice: '{}'", ngram))
}

fn invalid_ngram(node: &NGramNode) -> CipherForgeError {
    CipherForgeError::Construction(format!(
        "N-gram '{}' contains characters outside a-z",
        node.ngram
    ))
}
