//
// token_index.rs
//
// Term classification and the per-document token index used for completion
//

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

use crate::parser::{
    RawTerm, TERM_BLANK_NODE, TERM_IRI, TERM_PREFIXED_NAME, TERM_QUERY_VARIABLE,
};

/// Category of an indexed term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenCategory {
    Iri,
    BlankNode,
    QueryVariable,
    PrefixedName,
}

/// A classified term, ready to be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    QueryVariable(String),
    PrefixedName { prefix: String, local: String },
}

impl Term {
    pub fn category(&self) -> TokenCategory {
        match self {
            Term::Iri(_) => TokenCategory::Iri,
            Term::BlankNode(_) => TokenCategory::BlankNode,
            Term::QueryVariable(_) => TokenCategory::QueryVariable,
            Term::PrefixedName { .. } => TokenCategory::PrefixedName,
        }
    }
}

/// Classify a raw parser term.
///
/// The parser only ever emits the four grammar labels with their matching
/// shapes, so any other combination means the parser and the index disagree.
/// That is an internal invariant violation and is returned as an error which
/// aborts the current analysis pass.
pub fn classify(kind: &str, term: RawTerm<'_>) -> Result<Term> {
    let classified = match (kind, term) {
        (TERM_IRI, RawTerm::Single(iri)) => Term::Iri(iri.to_string()),
        (TERM_BLANK_NODE, RawTerm::Single(label)) => Term::BlankNode(label.to_string()),
        (TERM_QUERY_VARIABLE, RawTerm::Single(name)) => Term::QueryVariable(name.to_string()),
        (TERM_PREFIXED_NAME, RawTerm::Pair(prefix, local)) => Term::PrefixedName {
            prefix: prefix.to_string(),
            local: local.to_string(),
        },
        (kind, term) => bail!("malformed term from parser: kind '{}' with shape {:?}", kind, term),
    };
    Ok(classified)
}

/// Deduplicated store of the terms seen in one document.
///
/// Sets are ordered, so every query comes back sorted and duplicate-free
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenIndex {
    iris: BTreeSet<String>,
    blank_nodes: BTreeSet<String>,
    query_variables: BTreeSet<String>,
    /// prefix -> local names
    prefixed_names: BTreeMap<String, BTreeSet<String>>,
    /// Prefixes whose vocabulary terms have already been added
    seeded_prefixes: BTreeSet<String>,
}

impl TokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term. Returns `true` if it was not present yet.
    ///
    /// Empty values (e.g. the local part of a bare `ex:`) are not indexed.
    pub fn add(&mut self, term: Term) -> bool {
        match term {
            Term::Iri(value) => insert_non_empty(&mut self.iris, value),
            Term::BlankNode(value) => insert_non_empty(&mut self.blank_nodes, value),
            Term::QueryVariable(value) => insert_non_empty(&mut self.query_variables, value),
            Term::PrefixedName { prefix, local } => {
                let locals = self.prefixed_names.entry(prefix).or_default();
                insert_non_empty(locals, local)
            }
        }
    }

    /// Add vocabulary local names for `prefix`, once per index.
    ///
    /// Returns `false` (and adds nothing) if the prefix was already seeded.
    pub fn seed_prefix<I, T>(&mut self, prefix: &str, locals: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        if !self.seeded_prefixes.insert(prefix.to_string()) {
            return false;
        }
        let bucket = self.prefixed_names.entry(prefix.to_string()).or_default();
        for local in locals {
            insert_non_empty(bucket, local.into());
        }
        true
    }

    pub fn is_seeded(&self, prefix: &str) -> bool {
        self.seeded_prefixes.contains(prefix)
    }

    /// Iterate the terms of `category`, sorted.
    ///
    /// For `PrefixedName`, `needle` names the prefix whose local names are
    /// returned; a prefix with no entries yields nothing. The needle is
    /// ignored for the other categories.
    pub fn terms<'a>(
        &'a self,
        category: TokenCategory,
        needle: Option<&str>,
    ) -> Box<dyn Iterator<Item = &'a String> + 'a> {
        match category {
            TokenCategory::Iri => Box::new(self.iris.iter()),
            TokenCategory::BlankNode => Box::new(self.blank_nodes.iter()),
            TokenCategory::QueryVariable => Box::new(self.query_variables.iter()),
            TokenCategory::PrefixedName => match needle.and_then(|p| self.prefixed_names.get(p)) {
                Some(locals) => Box::new(locals.iter()),
                None => Box::new(std::iter::empty()),
            },
        }
    }

    /// Sorted, duplicate-free terms of `category` (see [`TokenIndex::terms`]).
    pub fn get(&self, category: TokenCategory, needle: Option<&str>) -> Vec<String> {
        self.terms(category, needle).cloned().collect()
    }

    /// Total number of indexed terms across all categories.
    pub fn len(&self) -> usize {
        self.iris.len()
            + self.blank_nodes.len()
            + self.query_variables.len()
            + self.prefixed_names.values().map(BTreeSet::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_non_empty(set: &mut BTreeSet<String>, value: String) -> bool {
    if value.is_empty() {
        return false;
    }
    set.insert(value)
}
