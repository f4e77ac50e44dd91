//
// handlers.rs
//
// Completion and code action request handlers
//

use std::collections::{HashMap, HashSet};

use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CompletionItem, CompletionItemKind,
    CompletionResponse, Diagnostic, Position, Url, WorkspaceEdit,
};

use crate::analysis::UNKNOWN_PREFIX_MESSAGE;
use crate::completion_context::{detect_completion_context, line_prefix_at, CompletionContext};
use crate::namespace_insertion::plan_insertion;
use crate::prefixes::{PrefixMap, PrefixResolver};
use crate::state::WorldState;
use crate::token_index::TokenCategory;

/// Answer a completion request.
///
/// Variables and blank nodes come from the requesting document only; IRIs
/// and prefixed names from every open document. Before prefixed names are
/// listed, the prefix's vocabulary is added to the document's index.
pub fn completion(state: &mut WorldState, uri: &Url, position: Position) -> Option<CompletionResponse> {
    if !state.settings.autocomplete_enabled {
        return None;
    }
    let text = state.documents.get(uri)?.text();
    state.edit_notifier.note_completion(uri);

    let Some(context) = line_prefix_at(&text, position).and_then(detect_completion_context) else {
        return Some(CompletionResponse::Array(Vec::new()));
    };
    log::trace!("Completion at {}:{:?} in context {:?}", uri, position, context);

    Some(CompletionResponse::Array(completion_items(state, uri, &context)))
}

/// Completion items for an already detected context, sorted by label.
pub fn completion_items(
    state: &mut WorldState,
    uri: &Url,
    context: &CompletionContext,
) -> Vec<CompletionItem> {
    match context {
        CompletionContext::QueryVariable => items(
            state.tokens.get(uri, TokenCategory::QueryVariable, None),
            CompletionItemKind::VARIABLE,
        ),
        CompletionContext::BlankNode => items(
            state.tokens.get(uri, TokenCategory::BlankNode, None),
            CompletionItemKind::VALUE,
        ),
        CompletionContext::Iri => items(
            state.tokens.get_all(TokenCategory::Iri, None),
            CompletionItemKind::REFERENCE,
        ),
        CompletionContext::PrefixedName { prefix } => {
            state.seed_vocabulary(uri, prefix);
            let locals = state
                .tokens
                .get_all(TokenCategory::PrefixedName, Some(prefix));

            let empty = PrefixMap::new();
            let declared = state.prefixes.get(uri).unwrap_or(&empty);
            let namespace = PrefixResolver::new(declared, &state.namespaces.known)
                .resolve(prefix)
                .map(|resolution| resolution.uri());

            locals
                .into_iter()
                .map(|local| CompletionItem {
                    detail: namespace.map(|ns| format!("{}{}", ns, local)),
                    label: local,
                    kind: Some(CompletionItemKind::PROPERTY),
                    ..Default::default()
                })
                .collect()
        }
    }
}

fn items(labels: Vec<String>, kind: CompletionItemKind) -> Vec<CompletionItem> {
    labels
        .into_iter()
        .map(|label| CompletionItem {
            label,
            kind: Some(kind),
            ..Default::default()
        })
        .collect()
}

/// Quick fixes for unknown-prefix diagnostics whose prefix is known.
///
/// The prefix is read back from the diagnostic message, so the document does
/// not have to be parsed again. One action is offered per prefix.
pub fn code_actions(state: &WorldState, uri: &Url, diagnostics: &[Diagnostic]) -> Vec<CodeActionOrCommand> {
    let Some(doc) = state.documents.get(uri) else {
        return Vec::new();
    };
    let text = doc.text();

    let mut seen = HashSet::new();
    let mut actions = Vec::new();
    for diagnostic in diagnostics {
        let Some(prefix) = diagnostic.message.strip_prefix(UNKNOWN_PREFIX_MESSAGE) else {
            continue;
        };
        let Some(namespace_uri) = state.namespaces.known.get(prefix) else {
            continue;
        };
        if !seen.insert(prefix) {
            continue;
        }

        let edit = plan_insertion(&text, prefix, namespace_uri);
        let mut changes = HashMap::new();
        changes.insert(uri.clone(), vec![edit.text_edit()]);

        actions.push(CodeActionOrCommand::CodeAction(CodeAction {
            title: format!("Import {} namespace", prefix),
            kind: Some(CodeActionKind::QUICKFIX),
            diagnostics: Some(vec![diagnostic.clone()]),
            edit: Some(WorkspaceEdit {
                changes: Some(changes),
                ..Default::default()
            }),
            is_preferred: Some(true),
            ..Default::default()
        }));
    }
    actions
}
