//
// edit_notifier.rs
//
// Decides when namespace insertion edits are safe to send to the client
//

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::{Diagnostic, TextEdit, Url};

use crate::analysis::statement_contains;
use crate::namespace_insertion::PendingEdit;
use crate::prefixes::PrefixMap;

/// Per-document delivery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditGate {
    /// No edit is being held back
    #[default]
    Idle,
    /// A completion was requested or an edit was dropped; the next pass must
    /// be clean around an edit's statements before it is sent
    AwaitingCleanPass,
}

/// Prefix and namespace an edit declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub uri: String,
}

/// One entry of the `n3/insertNamespaces` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceEdit {
    pub namespace: NamespaceBinding,
    pub edit: TextEdit,
}

impl From<&PendingEdit> for NamespaceEdit {
    fn from(pending: &PendingEdit) -> Self {
        Self {
            namespace: NamespaceBinding {
                prefix: pending.prefix.clone(),
                uri: pending.namespace_uri.clone(),
            },
            edit: pending.text_edit(),
        }
    }
}

/// Parameters for the n3/insertNamespaces notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertNamespacesParams {
    pub uri: Url,
    pub edits: Vec<NamespaceEdit>,
}

/// Server to client: apply these namespace declarations to a document.
pub enum InsertNamespaces {}

impl Notification for InsertNamespaces {
    type Params = InsertNamespacesParams;
    const METHOD: &'static str = "n3/insertNamespaces";
}

#[derive(Debug, Default)]
struct DocumentEdits {
    gate: EditGate,
    /// Prefixes sent to the client but not yet seen declared
    in_flight: HashSet<String>,
}

/// Holds back namespace edits while the statements they serve are in error.
#[derive(Debug, Default)]
pub struct EditNotifier {
    documents: HashMap<Url, DocumentEdits>,
}

impl EditNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self, uri: &Url) -> EditGate {
        self.documents
            .get(uri)
            .map(|doc| doc.gate)
            .unwrap_or_default()
    }

    /// A completion list may be open for `uri`.
    pub fn note_completion(&mut self, uri: &Url) {
        let doc = self.documents.entry(uri.clone()).or_default();
        if doc.gate != EditGate::AwaitingCleanPass {
            log::trace!("Edit gate for {}: awaiting clean pass", uri);
        }
        doc.gate = EditGate::AwaitingCleanPass;
    }

    /// Decide which of a finished pass's edits are delivered.
    ///
    /// An edit is blocked when any diagnostic of the pass starts inside a
    /// statement that uses its prefix. While the gate is idle, only blocked
    /// edits are dropped. While it awaits a clean pass, one blocked edit holds
    /// back the whole batch. Dropped edits are not kept; the next
    /// pass recomputes them. A prefix already sent is not sent again until a
    /// pass sees it declared.
    pub fn settle(
        &mut self,
        uri: &Url,
        edits: &[PendingEdit],
        diagnostics: &[Diagnostic],
        declared: &PrefixMap,
    ) -> Vec<NamespaceEdit> {
        let doc = self.documents.entry(uri.clone()).or_default();
        doc.in_flight.retain(|prefix| !declared.contains(prefix));

        let candidates: Vec<(&PendingEdit, bool)> = edits
            .iter()
            .filter(|edit| {
                let sent = doc.in_flight.contains(&edit.prefix);
                if sent {
                    log::trace!("Edit for '{}' already sent to {}", edit.prefix, uri);
                }
                !sent
            })
            .map(|edit| (edit, is_blocked(edit, diagnostics)))
            .collect();
        let hold_batch = doc.gate == EditGate::AwaitingCleanPass
            && candidates.iter().any(|(_, blocked)| *blocked);

        let mut delivered = Vec::new();
        let mut dropped = 0;
        for (edit, blocked) in candidates {
            if blocked || hold_batch {
                log::trace!(
                    "Dropping edit for '{}' in {}: {}",
                    edit.prefix,
                    uri,
                    if blocked { "statement has errors" } else { "batch held" }
                );
                dropped += 1;
                continue;
            }
            doc.in_flight.insert(edit.prefix.clone());
            delivered.push(NamespaceEdit::from(edit));
        }
        share_separator(&mut delivered);

        doc.gate = if dropped > 0 {
            EditGate::AwaitingCleanPass
        } else {
            EditGate::Idle
        };
        log::trace!(
            "Settled edits for {}: {} delivered, {} dropped, gate {:?}",
            uri,
            delivered.len(),
            dropped,
            doc.gate
        );
        delivered
    }

    /// Forget everything about a closed document.
    pub fn clear(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }
}

fn is_blocked(edit: &PendingEdit, diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|diagnostic| {
        edit.statements
            .iter()
            .any(|statement| statement_contains(statement, diagnostic.range.start))
    })
}

/// Directives inserted at the same position share one trailing blank line,
/// carried by the last of them.
fn share_separator(edits: &mut [NamespaceEdit]) {
    for i in 0..edits.len() {
        let start = edits[i].edit.range.start;
        let followed = edits[i + 1..].iter().any(|e| e.edit.range.start == start);
        if followed && edits[i].edit.new_text.ends_with("\n\n") {
            edits[i].edit.new_text.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OPEN_STATEMENT_END;
    use tower_lsp::lsp_types::{Position, Range};

    fn uri() -> Url {
        Url::parse("file:///workspace/rules.n3").unwrap()
    }

    fn pending(prefix: &str, statements: Vec<Range>) -> PendingEdit {
        PendingEdit {
            prefix: prefix.to_string(),
            namespace_uri: format!("http://{}/", prefix),
            insertion_line: 0,
            insertion_text: format!("@prefix {}: <http://{}/> .\n\n", prefix, prefix),
            statements,
        }
    }

    fn diagnostic_at(line: u32, character: u32) -> Diagnostic {
        let at = Position::new(line, character);
        Diagnostic {
            range: Range::new(at, at),
            message: "unexpected end of input".to_string(),
            ..Default::default()
        }
    }

    fn statement(start_line: u32, end_line: u32) -> Range {
        Range::new(Position::new(start_line, 0), Position::new(end_line, 0))
    }

    #[test]
    fn test_clean_pass_delivers() {
        let mut notifier = EditNotifier::new();
        let edits = vec![pending("foo", vec![statement(0, 1)])];
        let delivered = notifier.settle(&uri(), &edits, &[], &PrefixMap::new());
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].namespace.prefix, "foo");
        assert_eq!(delivered[0].namespace.uri, "http://foo/");
        assert_eq!(delivered[0].edit.new_text, edits[0].insertion_text);
        assert_eq!(notifier.gate(&uri()), EditGate::Idle);
    }

    #[test]
    fn test_diagnostic_in_same_statement_drops_edit() {
        let mut notifier = EditNotifier::new();
        let edits = vec![pending(
            "foo",
            vec![Range::new(Position::new(2, 0), OPEN_STATEMENT_END)],
        )];
        let delivered = notifier.settle(&uri(), &edits, &[diagnostic_at(2, 14)], &PrefixMap::new());
        assert!(delivered.is_empty());
        assert_eq!(notifier.gate(&uri()), EditGate::AwaitingCleanPass);

        // Recomputed on the next pass, which is clean
        let delivered = notifier.settle(&uri(), &edits, &[], &PrefixMap::new());
        assert_eq!(delivered.len(), 1);
        assert_eq!(notifier.gate(&uri()), EditGate::Idle);
    }

    #[test]
    fn test_diagnostic_in_other_statement_does_not_block() {
        let mut notifier = EditNotifier::new();
        let edits = vec![pending("foo", vec![statement(0, 1)])];
        let delivered = notifier.settle(&uri(), &edits, &[diagnostic_at(4, 2)], &PrefixMap::new());
        assert_eq!(delivered.len(), 1);
    }

    #[test]
    fn test_awaiting_gate_holds_whole_batch() {
        let edits = vec![
            pending("foo", vec![statement(0, 1)]),
            pending("bar", vec![Range::new(Position::new(2, 0), OPEN_STATEMENT_END)]),
        ];
        let diagnostics = [diagnostic_at(2, 7)];

        // Idle: only the edit whose statement is in error waits
        let mut idle = EditNotifier::new();
        let delivered = idle.settle(&uri(), &edits, &diagnostics, &PrefixMap::new());
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].namespace.prefix, "foo");

        // After a completion request nothing goes out until the batch is clean
        let mut awaiting = EditNotifier::new();
        awaiting.note_completion(&uri());
        assert!(awaiting
            .settle(&uri(), &edits, &diagnostics, &PrefixMap::new())
            .is_empty());
        assert_eq!(awaiting.gate(&uri()), EditGate::AwaitingCleanPass);

        let delivered = awaiting.settle(&uri(), &edits, &[], &PrefixMap::new());
        assert_eq!(delivered.len(), 2);
        assert_eq!(awaiting.gate(&uri()), EditGate::Idle);
    }

    #[test]
    fn test_clean_awaiting_pass_delivers_unblocked_edits() {
        let mut notifier = EditNotifier::new();
        notifier.note_completion(&uri());
        let edits = vec![pending("foo", vec![statement(0, 1)])];
        let delivered = notifier.settle(&uri(), &edits, &[diagnostic_at(4, 2)], &PrefixMap::new());
        assert_eq!(delivered.len(), 1);
        assert_eq!(notifier.gate(&uri()), EditGate::Idle);
    }

    #[test]
    fn test_batch_at_one_line_shares_blank_line() {
        let mut notifier = EditNotifier::new();
        let edits = vec![
            pending("rdf", vec![statement(0, 1)]),
            pending("owl", vec![statement(0, 1)]),
        ];
        let delivered = notifier.settle(&uri(), &edits, &[], &PrefixMap::new());
        let texts: Vec<&str> = delivered.iter().map(|e| e.edit.new_text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "@prefix rdf: <http://rdf/> .\n",
                "@prefix owl: <http://owl/> .\n\n",
            ]
        );
    }

    #[test]
    fn test_in_flight_prefix_is_not_resent_until_declared() {
        let mut notifier = EditNotifier::new();
        let edits = vec![pending("foo", vec![statement(0, 1)])];
        assert_eq!(notifier.settle(&uri(), &edits, &[], &PrefixMap::new()).len(), 1);
        assert!(notifier.settle(&uri(), &edits, &[], &PrefixMap::new()).is_empty());

        let mut declared = PrefixMap::new();
        declared.declare("foo", "http://foo/");
        assert!(notifier.settle(&uri(), &[], &[], &declared).is_empty());

        // Declaration removed again: the prefix may be inserted once more
        assert_eq!(notifier.settle(&uri(), &edits, &[], &PrefixMap::new()).len(), 1);
    }

    #[test]
    fn test_completion_and_clear() {
        let mut notifier = EditNotifier::new();
        assert_eq!(notifier.gate(&uri()), EditGate::Idle);
        notifier.note_completion(&uri());
        assert_eq!(notifier.gate(&uri()), EditGate::AwaitingCleanPass);
        notifier.clear(&uri());
        assert_eq!(notifier.gate(&uri()), EditGate::Idle);
    }

    #[test]
    fn test_notification_payload_shape() {
        let params = InsertNamespacesParams {
            uri: uri(),
            edits: vec![NamespaceEdit::from(&pending("foo", Vec::new()))],
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["uri"], "file:///workspace/rules.n3");
        assert_eq!(json["edits"][0]["namespace"]["prefix"], "foo");
        assert_eq!(json["edits"][0]["namespace"]["uri"], "http://foo/");
        assert_eq!(json["edits"][0]["edit"]["range"]["start"]["line"], 0);
        assert_eq!(json["edits"][0]["edit"]["newText"], "@prefix foo: <http://foo/> .\n\n");
        assert_eq!(InsertNamespaces::METHOD, "n3/insertNamespaces");
    }
}
