use super::{LanguageModel, NGramNode};
use crate::error::{CfResult, CipherForgeError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// A node of the letter trie. `populated` is false for intermediate nodes
/// that were only created to reach a deeper n-gram.
#[derive(Debug, Clone, Default)]
pub struct TreeNode {
    pub ngram: NGramNode,
    pub populated: bool,
    children: BTreeMap<u8, TreeNode>,
}

impl TreeNode {
    fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            ngram: NGramNode {
                ngram: String::from_utf8_lossy(prefix).into_owned(),
                ..Default::default()
            },
            populated: false,
            children: BTreeMap::new(),
        }
    }

    pub fn child(&self, letter: u8) -> Option<&TreeNode> {
        self.children.get(&letter)
    }

    pub fn children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.values()
    }

    fn count_all(&self) -> u64 {
        1 + self.children.values().map(TreeNode::count_all).sum::<u64>()
    }
}

/// Prefix-tree language model. Slower than the direct-address table, but
/// supports longest-prefix queries and incremental training.
#[derive(Debug, Clone)]
pub struct TreeModel {
    order: usize,
    root: TreeNode,
    unknown_log_probability: f32,
}

impl TreeModel {
    pub fn new(order: usize) -> Self {
        Self {
            order,
            root: TreeNode::default(),
            unknown_log_probability: f32::NEG_INFINITY,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn set_unknown_probability(&mut self, probability: f64) {
        self.unknown_log_probability = probability.ln() as f32;
    }

    /// Inserts a trained node. An empty n-gram sets the root statistics.
    pub fn add_node(&mut self, node: NGramNode) -> CfResult<()> {
        if node.ngram.is_empty() {
            self.root.ngram = node;
            self.root.populated = true;
            return Ok(());
        }

        let bytes = node.ngram.as_bytes().to_vec();
        let mut current = &mut self.root;
        for depth in 1..=bytes.len() {
            current = current
                .children
                .entry(bytes[depth - 1])
                .or_insert_with(|| TreeNode::with_prefix(&bytes[..depth]));
        }

        if current.populated {
            return Err(CipherForgeError::Construction(format!(
                "Unable to add the same n-gram twice: '{}'",
                node.ngram
            )));
        }
        current.ngram = node;
        current.populated = true;
        Ok(())
    }

    /// Counts one observation of `ngram`, incrementing every prefix along the
    /// path. Returns true when a previously unseen n-gram of the model's
    /// order was created.
    pub fn add_letter_transition(&mut self, ngram: &str) -> bool {
        let bytes = ngram.as_bytes();
        let mut is_new = false;
        let mut current = &mut self.root;
        for depth in 1..=bytes.len() {
            let letter = bytes[depth - 1];
            is_new = !current.children.contains_key(&letter);
            current = current
                .children
                .entry(letter)
                .or_insert_with(|| TreeNode::with_prefix(&bytes[..depth]));
            current.ngram.count += 1;
            current.populated = true;
        }
        is_new && bytes.len() == self.order
    }

    pub fn find_exact(&self, ngram: &str) -> Option<&TreeNode> {
        self.find_exact_bytes(ngram.as_bytes())
    }

    fn find_exact_bytes(&self, ngram: &[u8]) -> Option<&TreeNode> {
        if ngram.is_empty() {
            return None;
        }
        let mut current = &self.root;
        for letter in ngram {
            current = current.children.get(letter)?;
        }
        Some(current)
    }

    /// Deepest node matching a prefix of `ngram`.
    pub fn find_longest(&self, ngram: &str) -> Option<&TreeNode> {
        let mut current = &self.root;
        let mut longest = None;
        for letter in ngram.as_bytes() {
            match current.children.get(letter) {
                Some(next) => {
                    longest = Some(next);
                    current = next;
                }
                None => break,
            }
        }
        longest
    }

    /// Sets probability and log-probability of every node of `order` to
    /// `count / total`, and the conditional probability of every node relative
    /// to its parent. Subtrees under each first letter are processed in parallel.
    pub fn normalize(&mut self, order: usize, total: u64) {
        let root_count = if self.root.ngram.count > 0 {
            self.root.ngram.count
        } else {
            total
        };

        self.root
            .children
            .par_iter_mut()
            .for_each(|(_, child)| normalize_terminal(child, order, total, root_count));

        if self.unknown_log_probability == f32::NEG_INFINITY && total > 0 {
            self.set_unknown_probability(1.0 / total as f64);
        }

        debug!("Normalized order-{} trie nodes against total {}", order, total);
    }

    /// Total number of nodes, root included.
    pub fn size(&self) -> u64 {
        self.root.count_all()
    }
}

fn normalize_terminal(node: &mut TreeNode, order: usize, total: u64, parent_count: u64) {
    if parent_count > 0 {
        node.ngram.conditional_probability = node.ngram.count as f64 / parent_count as f64;
        node.ngram.log_conditional_probability = node.ngram.conditional_probability.ln();
    }

    if node.ngram.order() == order {
        node.ngram.probability = node.ngram.count as f64 / total as f64;
        node.ngram.log_probability = node.ngram.probability.ln();
        return;
    }

    let count = node.ngram.count;
    for child in node.children.values_mut() {
        normalize_terminal(child, order, total, count);
    }
}

impl LanguageModel for TreeModel {
    fn order(&self) -> usize {
        self.order
    }

    fn lookup(&self, kgram: &[u8]) -> f32 {
        if kgram.len() != self.order {
            return self.unknown_log_probability;
        }
        match self.find_exact_bytes(kgram) {
            Some(node) if node.populated => node.ngram.log_probability as f32,
            _ => self.unknown_log_probability,
        }
    }

    fn first_order_nodes(&self) -> Vec<&NGramNode> {
        self.root
            .children
            .values()
            .filter(|c| c.populated)
            .map(|c| &c.ngram)
            .collect()
    }

    fn unknown_log_probability(&self) -> f32 {
        self.unknown_log_probability
    }
}
