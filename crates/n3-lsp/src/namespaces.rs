//
// namespaces.rs
//
// Known namespace table, vocabulary term table, and their loading
//

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use indexmap::IndexMap;

use crate::config::ServerSettings;

const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
const OWL: &str = "http://www.w3.org/2002/07/owl#";
const LOG: &str = "http://www.w3.org/2000/10/swap/log#";

/// Prefixes known without any configuration file.
const BUILTIN_NAMESPACES: &[(&str, &str)] = &[
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("owl", OWL),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("log", LOG),
    ("math", "http://www.w3.org/2000/10/swap/math#"),
    ("string", "http://www.w3.org/2000/10/swap/string#"),
    ("list", "http://www.w3.org/2000/10/swap/list#"),
    ("time", "http://www.w3.org/2000/10/swap/time#"),
    ("crypto", "http://www.w3.org/2000/10/swap/crypto#"),
    ("e", "http://eulersharp.sourceforge.net/2003/03swap/log-rules#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
];

const RDF_TERMS: &[&str] = &[
    "type",
    "Property",
    "Statement",
    "subject",
    "predicate",
    "object",
    "List",
    "first",
    "rest",
    "nil",
    "value",
    "langString",
    "XMLLiteral",
    "Bag",
    "Seq",
    "Alt",
];

const RDFS_TERMS: &[&str] = &[
    "Resource",
    "Class",
    "Literal",
    "Datatype",
    "Container",
    "subClassOf",
    "subPropertyOf",
    "domain",
    "range",
    "label",
    "comment",
    "member",
    "seeAlso",
    "isDefinedBy",
];

const OWL_TERMS: &[&str] = &[
    "Thing",
    "Nothing",
    "Class",
    "Ontology",
    "Restriction",
    "ObjectProperty",
    "DatatypeProperty",
    "AnnotationProperty",
    "TransitiveProperty",
    "SymmetricProperty",
    "FunctionalProperty",
    "InverseFunctionalProperty",
    "sameAs",
    "differentFrom",
    "equivalentClass",
    "equivalentProperty",
    "inverseOf",
    "disjointWith",
    "onProperty",
    "someValuesFrom",
    "allValuesFrom",
    "hasValue",
    "unionOf",
    "intersectionOf",
    "complementOf",
    "oneOf",
    "imports",
];

const LOG_TERMS: &[&str] = &[
    "implies",
    "includes",
    "notIncludes",
    "equalTo",
    "notEqualTo",
    "semantics",
    "content",
    "parsedAsN3",
    "conclusion",
    "conjunction",
    "uri",
    "rawType",
    "collectAllIn",
    "forAllIn",
    "skolem",
    "outputString",
];

/// Prefix to namespace IRI table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownNamespaces {
    map: IndexMap<String, String>,
}

impl KnownNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        BUILTIN_NAMESPACES
            .iter()
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect()
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.map.get(prefix).map(String::as_str)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.map.contains_key(prefix)
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.map.insert(prefix.into(), uri.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, String)> for KnownNamespaces {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Namespace IRI to well-known local names. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabularies {
    map: HashMap<String, Vec<String>>,
}

impl Vocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        [
            (RDF, RDF_TERMS),
            (RDFS, RDFS_TERMS),
            (OWL, OWL_TERMS),
            (LOG, LOG_TERMS),
        ]
        .iter()
        .map(|(uri, terms)| {
            (
                uri.to_string(),
                terms.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
    }

    /// Terms of the namespace, or an empty slice if it has none.
    pub fn terms(&self, namespace_uri: &str) -> &[String] {
        self.map
            .get(namespace_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn insert(&mut self, namespace_uri: impl Into<String>, terms: Vec<String>) {
        self.map.insert(namespace_uri.into(), terms);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for Vocabularies {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Session-wide namespace configuration: both static tables together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTables {
    pub known: KnownNamespaces,
    pub vocabularies: Vocabularies,
}

impl NamespaceTables {
    pub fn new(known: KnownNamespaces, vocabularies: Vocabularies) -> Self {
        Self {
            known,
            vocabularies,
        }
    }

    pub fn builtin() -> Self {
        Self::new(KnownNamespaces::builtin(), Vocabularies::builtin())
    }

    /// Vocabulary terms of the namespace a known prefix maps to.
    pub fn vocabulary_for_prefix(&self, prefix: &str) -> &[String] {
        self.known
            .get(prefix)
            .map(|uri| self.vocabularies.terms(uri))
            .unwrap_or(&[])
    }

    /// Build the tables described by `settings`.
    ///
    /// Each table comes from its configured file, or from the built-in
    /// defaults when no file is configured. A configured file that cannot be
    /// read or parsed contributes an empty table and one warning message.
    /// Inline tables from the settings are merged over the result.
    ///
    /// # Returns
    ///
    /// The tables and the warnings to show the user.
    pub fn load(settings: &ServerSettings) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();

        let mut known = match settings.namespace_path() {
            Some(path) => match load_namespace_file(path) {
                Ok(map) => map.into_iter().collect(),
                Err(e) => {
                    warnings.push(e.to_string());
                    KnownNamespaces::new()
                }
            },
            None => KnownNamespaces::builtin(),
        };

        let mut vocabularies = match settings.vocabularies_path() {
            Some(path) => match load_vocabulary_file(path) {
                Ok(map) => map.into_iter().collect(),
                Err(e) => {
                    warnings.push(e.to_string());
                    Vocabularies::new()
                }
            },
            None => Vocabularies::builtin(),
        };

        if let Some(inline) = &settings.namespaces {
            for (prefix, uri) in inline {
                known.insert(prefix.clone(), uri.clone());
            }
        }
        if let Some(inline) = &settings.vocabularies {
            for (uri, terms) in inline {
                vocabularies.insert(uri.clone(), terms.clone());
            }
        }

        for warning in &warnings {
            log::warn!("{}", warning);
        }
        log::info!(
            "Loaded {} known namespaces and {} vocabularies",
            known.len(),
            vocabularies.len()
        );

        (Self::new(known, vocabularies), warnings)
    }
}

/// Read a JSON object mapping prefixes to namespace IRIs.
pub fn load_namespace_file(path: &Path) -> Result<IndexMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read namespace file {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow!("Invalid namespace file {}: {}", path.display(), e))
}

/// Read a JSON object mapping namespace IRIs to lists of local names.
pub fn load_vocabulary_file(path: &Path) -> Result<HashMap<String, Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read vocabulary file {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow!("Invalid vocabulary file {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_builtin_tables() {
        let tables = NamespaceTables::builtin();
        assert_eq!(tables.known.get("rdf"), Some(RDF));
        assert!(tables.known.contains("xsd"));
        assert!(tables
            .vocabulary_for_prefix("rdf")
            .iter()
            .any(|t| t == "type"));
        assert!(tables.vocabulary_for_prefix("xsd").is_empty());
        assert!(tables.vocabulary_for_prefix("nope").is_empty());
    }

    #[test]
    fn test_load_without_files_uses_builtin() {
        let (tables, warnings) = NamespaceTables::load(&ServerSettings::default());
        assert!(warnings.is_empty());
        assert_eq!(tables, NamespaceTables::builtin());
    }

    #[test]
    fn test_load_from_files() {
        let namespaces = json_file(r#"{ "ex": "http://example.org/", "foo": "http://foo.org/ns#" }"#);
        let vocab = json_file(r#"{ "http://foo.org/ns#": ["Baz", "bar"] }"#);
        let settings = ServerSettings {
            namespace_file: Some(namespaces.path().to_path_buf()),
            vocabularies_file: Some(vocab.path().to_path_buf()),
            ..Default::default()
        };

        let (tables, warnings) = NamespaceTables::load(&settings);
        assert!(warnings.is_empty());
        assert_eq!(tables.known.len(), 2);
        assert!(!tables.known.contains("rdf"));
        assert_eq!(
            tables.known.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            vec!["ex", "foo"]
        );
        assert_eq!(tables.vocabulary_for_prefix("foo"), ["Baz", "bar"]);
    }

    #[test]
    fn test_missing_file_warns_and_falls_back_to_empty() {
        let settings = ServerSettings {
            namespace_file: Some(PathBuf::from("/nonexistent/namespaces.json")),
            ..Default::default()
        };
        let (tables, warnings) = NamespaceTables::load(&settings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("namespaces.json"));
        assert!(tables.known.is_empty());
        // The vocabulary source is independent and still built in
        assert!(!tables.vocabularies.is_empty());
    }

    #[test]
    fn test_malformed_file_warns() {
        let vocab = json_file(r#"{ "http://foo.org/": "not a list" }"#);
        let settings = ServerSettings {
            vocabularies_file: Some(vocab.path().to_path_buf()),
            ..Default::default()
        };
        let (tables, warnings) = NamespaceTables::load(&settings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Invalid vocabulary file"));
        assert!(tables.vocabularies.is_empty());
    }

    #[test]
    fn test_inline_tables_override() {
        let mut namespaces = IndexMap::new();
        namespaces.insert("rdf".to_string(), "http://other/rdf#".to_string());
        namespaces.insert("ex".to_string(), "http://example.org/".to_string());
        let mut vocabularies = HashMap::new();
        vocabularies.insert("http://example.org/".to_string(), vec!["a".to_string()]);

        let settings = ServerSettings {
            namespaces: Some(namespaces),
            vocabularies: Some(vocabularies),
            ..Default::default()
        };
        let (tables, _) = NamespaceTables::load(&settings);
        assert_eq!(tables.known.get("rdf"), Some("http://other/rdf#"));
        assert_eq!(tables.vocabulary_for_prefix("ex"), ["a"]);
        assert!(tables.known.contains("owl"));
    }
}
