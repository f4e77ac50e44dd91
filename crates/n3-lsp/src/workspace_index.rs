//
// workspace_index.rs
//
// Token indexes of all open documents and the aggregated view across them
//

use std::collections::{BTreeSet, HashMap};

use tower_lsp::lsp_types::Url;

use crate::token_index::{TokenCategory, TokenIndex};

/// Per-document token indexes for every open document.
///
/// The aggregated view is never stored: it is computed on demand from the
/// committed indexes, so it can never disagree with them.
#[derive(Debug, Default)]
pub struct WorkspaceTokens {
    documents: HashMap<Url, TokenIndex>,
}

impl WorkspaceTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the committed index of `uri` with the result of a completed pass.
    pub fn commit(&mut self, uri: &Url, index: TokenIndex) {
        log::trace!("Committing {} indexed terms for {}", index.len(), uri);
        self.documents.insert(uri.clone(), index);
    }

    /// Forget the index of a closed document.
    pub fn remove(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn document_mut(&mut self, uri: &Url) -> Option<&mut TokenIndex> {
        self.documents.get_mut(uri)
    }

    /// Document-scoped lookup. Unknown documents yield an empty list.
    pub fn get(&self, uri: &Url, category: TokenCategory, needle: Option<&str>) -> Vec<String> {
        self.documents
            .get(uri)
            .map(|index| index.get(category, needle))
            .unwrap_or_default()
    }

    /// Sorted, duplicate-free union of `category` across all open documents.
    pub fn get_all(&self, category: TokenCategory, needle: Option<&str>) -> Vec<String> {
        let merged: BTreeSet<&String> = self
            .documents
            .values()
            .flat_map(|index| index.terms(category, needle))
            .collect();
        merged.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
