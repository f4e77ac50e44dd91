//
// state.rs
//
// Session state: open documents, committed analysis results and
// namespace configuration
//

use std::collections::HashMap;

use ropey::Rope;
use tower_lsp::lsp_types::{Diagnostic, TextDocumentContentChangeEvent, Url};

use crate::analysis::{analyze_with, AnalysisContext};
use crate::config::ServerSettings;
use crate::edit_notifier::{EditNotifier, NamespaceEdit};
use crate::namespaces::NamespaceTables;
use crate::parser::{self, EventSink};
use crate::perf::{self, TimingGuard};
use crate::prefixes::{seed_vocabulary, PrefixMap, PrefixResolver};
use crate::utf16::utf16_column_to_byte_offset;
use crate::workspace_index::WorkspaceTokens;

/// Passes slower than this are reported in verbose perf mode
const SLOW_PASS_MS: u64 = 50;

/// An open document
pub struct Document {
    pub contents: Rope,
    pub version: Option<i32>,
    pub revision: u64,
}

impl Document {
    pub fn new(text: &str, version: Option<i32>) -> Self {
        Self {
            contents: Rope::from_str(text),
            version,
            revision: 0,
        }
    }

    /// Apply an incremental or full-text change.
    ///
    /// Positions past the end of the document clamp to the end.
    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        if let Some(range) = change.range {
            let start_idx = self.char_index(range.start.line, range.start.character);
            let end_idx = self.char_index(range.end.line, range.end.character).max(start_idx);

            self.contents.remove(start_idx..end_idx);
            self.contents.insert(start_idx, &change.text);
        } else {
            // Full document sync
            self.contents = Rope::from_str(&change.text);
        }

        self.revision += 1;
    }

    fn char_index(&self, line: u32, utf16_col: u32) -> usize {
        let line = line as usize;
        if line >= self.contents.len_lines() {
            return self.contents.len_chars();
        }
        let line_text = self.contents.line(line).to_string();
        let line_text = line_text.trim_end_matches(['\n', '\r']);
        let byte_offset = utf16_column_to_byte_offset(line_text, utf16_col);
        let char_offset = line_text[..byte_offset].chars().count();
        self.contents.line_to_char(line) + char_offset
    }

    pub fn text(&self) -> String {
        self.contents.to_string()
    }
}

/// What one completed pass hands to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Full replacement diagnostic set for the document
    pub diagnostics: Vec<Diagnostic>,
    /// Namespace edits cleared for delivery
    pub edits: Vec<NamespaceEdit>,
}

/// The single session context shared by every request and notification.
pub struct WorldState {
    pub documents: HashMap<Url, Document>,
    pub tokens: WorkspaceTokens,
    /// Prefix declarations of the last committed pass per document
    pub prefixes: HashMap<Url, PrefixMap>,
    pub namespaces: NamespaceTables,
    pub settings: ServerSettings,
    pub edit_notifier: EditNotifier,
    /// Configuration warnings waiting for the client to finish initializing
    pub startup_warnings: Vec<String>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    /// Create a state with default settings and the built-in namespace tables.
    ///
    /// # Examples
    ///
    /// ```
    /// use n3_lsp::state::WorldState;
    ///
    /// let state = WorldState::new();
    /// assert!(state.documents.is_empty());
    /// assert!(state.namespaces.known.contains("rdf"));
    /// ```
    pub fn new() -> Self {
        Self::with_tables(NamespaceTables::builtin(), ServerSettings::default())
    }

    pub fn with_tables(namespaces: NamespaceTables, settings: ServerSettings) -> Self {
        Self {
            documents: HashMap::new(),
            tokens: WorkspaceTokens::new(),
            prefixes: HashMap::new(),
            namespaces,
            settings,
            edit_notifier: EditNotifier::new(),
            startup_warnings: Vec::new(),
        }
    }

    /// Replace the settings and reload the namespace tables.
    ///
    /// Tables are always reloaded: a configured file may have changed on disk
    /// even when its path did not.
    ///
    /// # Returns
    ///
    /// Warnings for configured files that could not be loaded.
    pub fn apply_settings(&mut self, settings: ServerSettings) -> Vec<String> {
        log::info!(
            "Applying settings: insertion mode {:?}, autocomplete {}",
            settings.namespace_insertion_mode,
            settings.autocomplete_enabled
        );
        let (tables, warnings) = NamespaceTables::load(&settings);
        self.namespaces = tables;
        self.settings = settings;
        warnings
    }

    pub fn open_document(&mut self, uri: Url, text: &str, version: Option<i32>) -> Option<PassReport> {
        self.documents.insert(uri.clone(), Document::new(text, version));
        self.revalidate(&uri)
    }

    pub fn change_document(
        &mut self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: Option<i32>,
    ) -> Option<PassReport> {
        let doc = self.documents.get_mut(uri)?;
        for change in changes {
            doc.apply_change(change);
        }
        doc.version = version;
        self.revalidate(uri)
    }

    /// Drop the document and everything derived from it.
    pub fn close_document(&mut self, uri: &Url) {
        self.documents.remove(uri);
        self.tokens.remove(uri);
        self.prefixes.remove(uri);
        self.edit_notifier.clear(uri);
    }

    /// Run one full analysis pass for an open document and commit it.
    ///
    /// Returns `None` if the document is not open or the pass was aborted;
    /// in the latter case the previously committed results stay in place.
    pub fn revalidate(&mut self, uri: &Url) -> Option<PassReport> {
        self.run_pass(uri, |text, sink| parser::parse(text, sink))
    }

    fn run_pass<F>(&mut self, uri: &Url, parse: F) -> Option<PassReport>
    where
        F: FnOnce(&str, &mut dyn EventSink),
    {
        let text = self.documents.get(uri)?.text();
        let timing = TimingGuard::with_threshold("analysis pass", SLOW_PASS_MS);

        let ctx = AnalysisContext {
            namespaces: &self.namespaces,
            mode: self.settings.namespace_insertion_mode,
        };
        let outcome = match analyze_with(&text, &ctx, parse) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Analysis of {} aborted: {:#}", uri, e);
                return None;
            }
        };

        let edits = self.edit_notifier.settle(
            uri,
            &outcome.pending_edits,
            &outcome.diagnostics,
            &outcome.prefixes,
        );
        self.tokens.commit(uri, outcome.index);
        self.prefixes.insert(uri.clone(), outcome.prefixes);

        let total = perf::record_pass();
        log::trace!(
            "Committed pass for {} in {:?} ({} passes so far)",
            uri,
            timing.elapsed(),
            total
        );
        drop(timing);

        Some(PassReport {
            diagnostics: outcome.diagnostics,
            edits,
        })
    }

    /// Revalidate every open document, one after another, in URI order.
    pub fn revalidate_all(&mut self) -> Vec<(Url, PassReport)> {
        let mut uris: Vec<Url> = self.documents.keys().cloned().collect();
        uris.sort();
        log::trace!("Revalidating {} open documents", uris.len());
        uris.into_iter()
            .filter_map(|uri| self.revalidate(&uri).map(|report| (uri, report)))
            .collect()
    }

    /// Add the vocabulary of `prefix` to the document's committed index.
    ///
    /// The prefix is resolved through the document's own declarations first,
    /// then through the known namespace table.
    pub fn seed_vocabulary(&mut self, uri: &Url, prefix: &str) -> bool {
        let empty = PrefixMap::new();
        let declared = self.prefixes.get(uri).unwrap_or(&empty);
        let resolver = PrefixResolver::new(declared, &self.namespaces.known);
        let Some(resolution) = resolver.resolve(prefix) else {
            return false;
        };
        let Some(index) = self.tokens.document_mut(uri) else {
            return false;
        };
        seed_vocabulary(index, prefix, resolution.uri(), &self.namespaces.vocabularies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceMode;
    use crate::edit_notifier::EditGate;
    use crate::parser::RawTerm;
    use crate::token_index::TokenCategory;
    use tower_lsp::lsp_types::{Position, Range};

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///workspace/{}.n3", name)).unwrap()
    }

    fn change(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_document_apply_change_ascii() {
        let mut doc = Document::new("<a> <b> <c> .", None);
        doc.apply_change(change((0, 8), (0, 11), "<d>"));
        assert_eq!(doc.text(), "<a> <b> <d> .");
        assert_eq!(doc.revision, 1);
    }

    #[test]
    fn test_document_apply_change_utf16_emoji() {
        // U+1F389 is 4 bytes in UTF-8, 2 UTF-16 code units
        let mut doc = Document::new("a\u{1F389}b", None);
        doc.apply_change(change((0, 3), (0, 3), "x"));
        assert_eq!(doc.text(), "a\u{1F389}xb");
    }

    #[test]
    fn test_document_apply_change_multiline_and_past_end() {
        let mut doc = Document::new("line0\nline1\nline2", None);
        doc.apply_change(change((0, 2), (2, 3), "X"));
        assert_eq!(doc.text(), "liXe2");

        doc.apply_change(change((9, 0), (9, 0), " ."));
        assert_eq!(doc.text(), "liXe2 .");
    }

    #[test]
    fn test_document_lines_match_lsp_line_breaks() {
        let mut doc = Document::new("<s> <p> \"x\u{2028}y\" .\n<a> <b> <c> .\n", None);
        doc.apply_change(change((1, 0), (1, 3), "<z>"));
        assert_eq!(doc.text(), "<s> <p> \"x\u{2028}y\" .\n<z> <b> <c> .\n");

        let mut doc = Document::new("<a> <b> <c> .\r<d> <e> <f> .\r", None);
        doc.apply_change(change((1, 0), (1, 3), "<z>"));
        assert_eq!(doc.text(), "<a> <b> <c> .\r<z> <e> <f> .\r");
    }

    #[test]
    fn test_unicode_separator_edit_keeps_document_valid() {
        let mut state = WorldState::new();
        let doc = uri("a");
        state.open_document(doc.clone(), "<s> <p> \"x\u{2028}y\" .\n<a> <b> <c> .\n", None);
        let report = state
            .change_document(&doc, vec![change((1, 0), (1, 3), "<z>")], None)
            .unwrap();
        assert!(report.diagnostics.is_empty());
        assert!(state
            .tokens
            .get(&doc, TokenCategory::Iri, None)
            .contains(&"z".to_string()));
    }

    #[test]
    fn test_document_full_sync() {
        let mut doc = Document::new("old", None);
        doc.apply_change(TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".to_string(),
        });
        assert_eq!(doc.text(), "new");
    }

    #[test]
    fn test_open_change_close_lifecycle() {
        let mut state = WorldState::new();
        let doc = uri("a");

        let report = state
            .open_document(doc.clone(), "?x <p> ?y .\n", Some(1))
            .unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            state.tokens.get(&doc, TokenCategory::QueryVariable, None),
            vec!["x", "y"]
        );

        // Deleting ?y must not leave it behind
        let report = state
            .change_document(&doc, vec![change((0, 7), (0, 9), "<o>")], Some(2))
            .unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            state.tokens.get(&doc, TokenCategory::QueryVariable, None),
            vec!["x"]
        );

        state.close_document(&doc);
        assert!(state.documents.is_empty());
        assert!(state.tokens.is_empty());
        assert!(state.prefixes.is_empty());
    }

    #[test]
    fn test_change_unknown_document_is_ignored() {
        let mut state = WorldState::new();
        assert!(state
            .change_document(&uri("missing"), vec![change((0, 0), (0, 0), "x")], None)
            .is_none());
    }

    #[test]
    fn test_automatic_edit_delivered_once() {
        let mut state = WorldState::new();
        let doc = uri("a");
        let report = state
            .open_document(doc.clone(), "<s> rdf:type <o> .\n", Some(1))
            .unwrap();
        assert_eq!(report.edits.len(), 1);
        assert_eq!(report.edits[0].namespace.prefix, "rdf");

        // The client has not applied the edit yet
        let report = state.revalidate(&doc).unwrap();
        assert!(report.edits.is_empty());
    }

    #[test]
    fn test_settings_switch_to_suggest_mode() {
        let mut state = WorldState::new();
        let doc = uri("a");
        state.open_document(doc.clone(), "<s> rdf:type <o> .\n", Some(1));

        let settings = ServerSettings {
            namespace_insertion_mode: NamespaceMode::Suggest,
            ..Default::default()
        };
        let warnings = state.apply_settings(settings);
        assert!(warnings.is_empty());

        let reports = state.revalidate_all();
        assert_eq!(reports.len(), 1);
        let (reported_uri, report) = &reports[0];
        assert_eq!(reported_uri, &doc);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].message, "Unknown prefix: rdf");
        assert!(report.edits.is_empty());
    }

    #[test]
    fn test_missing_namespace_file_leaves_empty_table() {
        let mut state = WorldState::new();
        let settings = ServerSettings {
            namespace_file: Some("/nonexistent/ns.json".into()),
            ..Default::default()
        };
        let warnings = state.apply_settings(settings);
        assert_eq!(warnings.len(), 1);
        assert!(state.namespaces.known.is_empty());
    }

    #[test]
    fn test_reapplied_settings_reload_edited_namespace_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"ex": "http://a/"}"#).unwrap();
        let settings = ServerSettings {
            namespace_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let mut state = WorldState::new();
        state.apply_settings(settings.clone());
        assert_eq!(state.namespaces.known.get("ex"), Some("http://a/"));

        std::fs::write(file.path(), r#"{"ex": "http://b/"}"#).unwrap();
        state.apply_settings(settings);
        assert_eq!(state.namespaces.known.get("ex"), Some("http://b/"));
    }

    #[test]
    fn test_aborted_pass_keeps_committed_results() {
        let mut state = WorldState::new();
        let doc = uri("a");
        let other = uri("b");
        state.open_document(doc.clone(), "@prefix ex: <http://e/> .\nex:s ex:p ?x .\n", Some(1));
        state.open_document(other.clone(), "?y <http://e/p> <http://e/o> .\n", Some(1));
        let other_iris = state.tokens.get(&other, TokenCategory::Iri, None);

        state
            .documents
            .get_mut(&doc)
            .unwrap()
            .apply_change(change((1, 10), (1, 12), "?z"));
        let report = state.run_pass(&doc, |text, sink| {
            parser::parse(text, &mut *sink);
            sink.on_term("literal", RawTerm::Single("1"));
        });

        assert!(report.is_none());
        assert_eq!(
            state.tokens.get(&doc, TokenCategory::QueryVariable, None),
            vec!["x"]
        );
        assert_eq!(
            state.tokens.get(&doc, TokenCategory::PrefixedName, Some("ex")),
            vec!["p", "s"]
        );
        assert_eq!(state.prefixes[&doc].get("ex"), Some("http://e/"));
        assert_eq!(state.tokens.get(&other, TokenCategory::Iri, None), other_iris);
        assert_eq!(
            state.tokens.get(&other, TokenCategory::QueryVariable, None),
            vec!["y"]
        );

        // The next clean pass commits the edit
        assert!(state.revalidate(&doc).is_some());
        assert_eq!(
            state.tokens.get(&doc, TokenCategory::QueryVariable, None),
            vec!["z"]
        );
    }

    #[test]
    fn test_seed_vocabulary_prefers_declared_namespace() {
        let mut state = WorldState::new();
        let doc = uri("a");
        state.open_document(
            doc.clone(),
            "@prefix r: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .\n",
            None,
        );
        assert!(state.seed_vocabulary(&doc, "r"));
        assert!(state
            .tokens
            .get(&doc, TokenCategory::PrefixedName, Some("r"))
            .contains(&"type".to_string()));
        assert!(!state.seed_vocabulary(&doc, "r"));
        assert!(!state.seed_vocabulary(&doc, "unknown"));
    }

    #[test]
    fn test_close_resets_edit_gate() {
        let mut state = WorldState::new();
        let doc = uri("a");
        state.open_document(doc.clone(), "", None);
        state.edit_notifier.note_completion(&doc);
        assert_eq!(state.edit_notifier.gate(&doc), EditGate::AwaitingCleanPass);
        state.close_document(&doc);
        assert_eq!(state.edit_notifier.gate(&doc), EditGate::Idle);
    }
}
