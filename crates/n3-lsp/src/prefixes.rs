//
// prefixes.rs
//
// Per-document prefix map, prefix resolution and vocabulary pre-population
//

use std::collections::BTreeMap;

use crate::namespaces::{KnownNamespaces, Vocabularies};
use crate::parser::lexer::is_name_char;
use crate::token_index::TokenIndex;

/// Prefixes declared by one document, rebuilt on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    map: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration from the raw lexical forms, e.g. `ex:` and
    /// `<http://example.org/>`.
    pub fn declare_raw(&mut self, raw_prefix: &str, raw_uri: &str) {
        self.declare(strip_prefix_delimiters(raw_prefix), strip_iri_delimiters(raw_uri));
    }

    pub fn declare(&mut self, prefix: &str, uri: &str) {
        self.map.insert(prefix.to_string(), uri.to_string());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.map.get(prefix).map(String::as_str)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.map.contains_key(prefix)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// `ex:` -> `ex`
pub fn strip_prefix_delimiters(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix(':').unwrap_or(trimmed)
}

/// `<http://e/>` -> `http://e/`
pub fn strip_iri_delimiters(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('<').unwrap_or(trimmed);
    trimmed.strip_suffix('>').unwrap_or(trimmed)
}

/// Where a prefix got its namespace from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Declared in the document itself
    Declared(&'a str),
    /// Not declared, but present in the known namespace table
    Known(&'a str),
}

impl<'a> Resolution<'a> {
    pub fn uri(&self) -> &'a str {
        match self {
            Resolution::Declared(uri) | Resolution::Known(uri) => uri,
        }
    }
}

/// Resolves prefixes against the document's declarations first, then the
/// known namespace table.
#[derive(Debug, Clone, Copy)]
pub struct PrefixResolver<'a> {
    declared: &'a PrefixMap,
    known: &'a KnownNamespaces,
}

impl<'a> PrefixResolver<'a> {
    pub fn new(declared: &'a PrefixMap, known: &'a KnownNamespaces) -> Self {
        Self { declared, known }
    }

    pub fn resolve(&self, prefix: &str) -> Option<Resolution<'a>> {
        if let Some(uri) = self.declared.get(prefix) {
            return Some(Resolution::Declared(uri));
        }
        self.known.get(prefix).map(Resolution::Known)
    }

    /// Namespace of a prefix that is known but not declared by the document.
    pub fn known_undeclared(&self, prefix: &str) -> Option<&'a str> {
        match self.resolve(prefix) {
            Some(Resolution::Known(uri)) => Some(uri),
            _ => None,
        }
    }
}

/// Extract the prefix being typed right before `offset`.
///
/// A comment at the end of the last line, trailing whitespace and a single
/// trailing colon are skipped, then the run of prefix characters is taken.
/// Returns `None` if there is no such run.
pub fn partial_prefix_before(text: &str, offset: usize) -> Option<&str> {
    let before = strip_trailing_comment(text.get(..offset)?).trim_end();
    let before = before.strip_suffix(':').unwrap_or(before);
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_name_char(*ch))
        .last()
        .map(|(idx, _)| idx)?;
    let candidate = before[start..].trim_start_matches('.');
    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

/// Cut a `#` comment off the last line of `text`. A `#` inside an IRI or a
/// string does not start a comment.
fn strip_trailing_comment(text: &str) -> &str {
    let line_start = text.rfind(['\n', '\r']).map_or(0, |i| i + 1);
    let mut in_iri = false;
    let mut quote = None;
    for (idx, ch) in text[line_start..].char_indices() {
        match (ch, quote) {
            (c, Some(q)) if c == q => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) if !in_iri => quote = Some(ch),
            ('<', None) => in_iri = true,
            ('>', None) => in_iri = false,
            ('#', None) if !in_iri => return &text[..line_start + idx],
            _ => {}
        }
    }
    text
}

/// Add the vocabulary terms of `namespace_uri` under `prefix`, once per index.
///
/// Returns `true` if terms were added.
pub fn seed_vocabulary(
    index: &mut TokenIndex,
    prefix: &str,
    namespace_uri: &str,
    vocabularies: &Vocabularies,
) -> bool {
    let terms = vocabularies.terms(namespace_uri);
    if terms.is_empty() || index.is_seeded(prefix) {
        return false;
    }
    log::trace!("Seeding {} vocabulary terms for prefix '{}'", terms.len(), prefix);
    index.seed_prefix(prefix, terms.iter().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_index::TokenCategory;

    fn known() -> KnownNamespaces {
        let mut known = KnownNamespaces::new();
        known.insert("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        known.insert("ex", "http://example.org/known/");
        known
    }

    #[test]
    fn test_declare_raw_strips_delimiters() {
        let mut prefixes = PrefixMap::new();
        prefixes.declare_raw("ex:", "<http://example.org/>");
        prefixes.declare_raw(":", "<http://default/>");
        assert_eq!(prefixes.get("ex"), Some("http://example.org/"));
        assert_eq!(prefixes.get(""), Some("http://default/"));
        assert_eq!(prefixes.len(), 2);
    }

    #[test]
    fn test_declared_wins_over_known() {
        let known = known();
        let mut declared = PrefixMap::new();
        declared.declare("ex", "http://example.org/mine/");
        let resolver = PrefixResolver::new(&declared, &known);

        assert_eq!(
            resolver.resolve("ex"),
            Some(Resolution::Declared("http://example.org/mine/"))
        );
        assert_eq!(resolver.known_undeclared("ex"), None);
        assert_eq!(
            resolver.known_undeclared("rdf"),
            Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#")
        );
        assert_eq!(resolver.resolve("foaf"), None);
    }

    #[test]
    fn test_partial_prefix_before() {
        let text = "<a> <b> <c> .\n<s> rdf:";
        assert_eq!(partial_prefix_before(text, text.len()), Some("rdf"));
        assert_eq!(partial_prefix_before("<s> rdfs  \n", 11), Some("rdfs"));
        assert_eq!(partial_prefix_before("<s> <p> ", 8), None);
        assert_eq!(partial_prefix_before("", 0), None);
        assert_eq!(partial_prefix_before("x", 5), None);
    }

    #[test]
    fn test_partial_prefix_only_takes_trailing_run() {
        assert_eq!(partial_prefix_before("ex:a owl", 8), Some("owl"));
        assert_eq!(partial_prefix_before("[ foo-bar:", 10), Some("foo-bar"));
    }

    #[test]
    fn test_partial_prefix_skips_trailing_comment() {
        let text = "<s> rdf: # todo";
        assert_eq!(partial_prefix_before(text, text.len()), Some("rdf"));
        let text = "<http://e/#a> rdf:";
        assert_eq!(partial_prefix_before(text, text.len()), Some("rdf"));
        let text = "# note\n<s> owl #";
        assert_eq!(partial_prefix_before(text, text.len()), Some("owl"));
    }

    #[test]
    fn test_seed_vocabulary_once() {
        let mut vocab = Vocabularies::new();
        vocab.insert("http://e/", vec!["type".to_string(), "Property".to_string()]);
        let mut index = TokenIndex::new();

        assert!(seed_vocabulary(&mut index, "e", "http://e/", &vocab));
        assert!(!seed_vocabulary(&mut index, "e", "http://e/", &vocab));
        assert_eq!(
            index.get(TokenCategory::PrefixedName, Some("e")),
            vec!["Property", "type"]
        );
        assert!(!seed_vocabulary(&mut index, "x", "http://x/", &vocab));
        assert!(!index.is_seeded("x"));
    }
}
