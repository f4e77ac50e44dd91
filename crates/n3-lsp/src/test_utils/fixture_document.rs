//! Deterministic N3 document generator for benchmarks and tests.
//!
//! Produces rule files with a prefix header, plain triples, blank nodes and
//! `=>` rules over query variables. No randomness, so benchmark input is
//! reproducible.

use std::fmt::Write;

/// Shape of a generated document.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub triples: usize,
    pub rules: usize,
    /// Uses of `rdfs:` and `owl:` without a declaration
    pub undeclared_uses: usize,
}

impl FixtureConfig {
    pub fn small() -> Self {
        Self {
            triples: 50,
            rules: 10,
            undeclared_uses: 2,
        }
    }

    pub fn large() -> Self {
        Self {
            triples: 2_000,
            rules: 400,
            undeclared_uses: 50,
        }
    }
}

/// Render a document for `config`.
pub fn generate_document(config: &FixtureConfig) -> String {
    let mut out = String::new();
    out.push_str("# generated fixture\n\n");
    out.push_str("@prefix : <http://example.org/fixture#> .\n");
    out.push_str("@prefix ex: <http://example.org/vocab#> .\n");
    out.push_str("@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .\n\n");

    for i in 0..config.triples {
        let _ = writeln!(out, ":item{} rdf:type ex:Class{} .", i, i % 17);
        if i % 5 == 0 {
            let _ = writeln!(out, ":item{} ex:link [ ex:target <http://example.org/t/{}> ] .", i, i);
        }
        if i % 7 == 0 {
            let _ = writeln!(out, "_:b{} ex:label \"item {}\"@en .", i, i);
        }
    }

    for i in 0..config.rules {
        let _ = writeln!(
            out,
            "{{ ?s{i} ex:p{m} ?o{i} . ?o{i} ex:q ?v }} => {{ ?s{i} ex:derived{m} ?v }} .",
            i = i,
            m = i % 11
        );
    }

    for i in 0..config.undeclared_uses {
        let prefix = if i % 2 == 0 { "rdfs" } else { "owl" };
        let local = if i % 2 == 0 { "subClassOf" } else { "sameAs" };
        let _ = writeln!(out, ":item{} {}:{} :item{} .", i, prefix, local, i + 1);
    }

    out
}
