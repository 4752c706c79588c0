use crate::error::{CfResult, CipherForgeError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// On-disk form of a cipher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherDefinition {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub ciphertext: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_solution_key: Option<BTreeMap<String, char>>,
}

/// A ciphertext laid out as rows x columns.
///
/// Distinct symbols get a dense id in order of first appearance; solutions
/// index their mappings by that id.
#[derive(Debug, Clone)]
pub struct Cipher {
    name: String,
    rows: usize,
    columns: usize,
    ciphertext: Vec<String>,
    known_solution: Option<BTreeMap<String, char>>,
    symbols: Vec<String>,
    symbol_ids: Vec<usize>,
    symbol_lookup: HashMap<String, usize>,
    symbol_indices: Vec<Vec<usize>>,
}

impl Cipher {
    pub fn new(
        name: impl Into<String>,
        rows: usize,
        columns: usize,
        ciphertext: Vec<String>,
    ) -> CfResult<Self> {
        let name = name.into();
        if ciphertext.is_empty() {
            return Err(CipherForgeError::Config(format!(
                "Cipher '{}' has zero distinct symbols",
                name
            )));
        }
        if rows * columns != ciphertext.len() {
            return Err(CipherForgeError::Validation(format!(
                "Cipher '{}' is {}x{} but has {} symbols",
                name,
                rows,
                columns,
                ciphertext.len()
            )));
        }

        let mut symbols = Vec::new();
        let mut symbol_lookup = HashMap::new();
        let mut symbol_indices: Vec<Vec<usize>> = Vec::new();
        let mut symbol_ids = Vec::with_capacity(ciphertext.len());

        for (pos, symbol) in ciphertext.iter().enumerate() {
            let id = *symbol_lookup.entry(symbol.clone()).or_insert_with(|| {
                symbols.push(symbol.clone());
                symbol_indices.push(Vec::new());
                symbols.len() - 1
            });
            symbol_indices[id].push(pos);
            symbol_ids.push(id);
        }

        Ok(Self {
            name,
            rows,
            columns,
            ciphertext,
            known_solution: None,
            symbols,
            symbol_ids,
            symbol_lookup,
            symbol_indices,
        })
    }

    /// Convenience constructor: one symbol per character, laid out as a single row.
    pub fn from_text(name: impl Into<String>, text: &str) -> CfResult<Self> {
        let ciphertext: Vec<String> = text.chars().map(String::from).collect();
        let len = ciphertext.len();
        Self::new(name, 1, len, ciphertext)
    }

    pub fn with_known_solution(mut self, key: BTreeMap<String, char>) -> CfResult<Self> {
        if let Some(unknown) = key.keys().find(|s| !self.symbol_lookup.contains_key(*s)) {
            return Err(CipherForgeError::Validation(format!(
                "Known solution maps symbol '{}' which does not occur in cipher '{}'",
                unknown, self.name
            )));
        }
        self.known_solution = Some(key);
        Ok(self)
    }

    pub fn from_definition(def: CipherDefinition) -> CfResult<Self> {
        let cipher = Self::new(def.name, def.rows, def.columns, def.ciphertext)?;
        match def.known_solution_key {
            Some(key) => cipher.with_known_solution(key),
            None => Ok(cipher),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CfResult<Self> {
        let content = fs::read_to_string(path)?;
        let def: CipherDefinition = serde_json::from_str(&content)?;
        Self::from_definition(def)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    pub fn ciphertext(&self) -> &[String] {
        &self.ciphertext
    }

    /// Distinct symbols, indexed by symbol id.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_id(&self, symbol: &str) -> Option<usize> {
        self.symbol_lookup.get(symbol).copied()
    }

    /// Symbol id at every ciphertext position.
    pub fn symbol_ids(&self) -> &[usize] {
        &self.symbol_ids
    }

    /// Ascending positions where the symbol with `id` occurs.
    pub fn indices_of(&self, id: usize) -> &[usize] {
        &self.symbol_indices[id]
    }

    pub fn has_known_solution(&self) -> bool {
        self.known_solution.is_some()
    }

    pub fn known_solution(&self) -> Option<&BTreeMap<String, char>> {
        self.known_solution.as_ref()
    }
}
