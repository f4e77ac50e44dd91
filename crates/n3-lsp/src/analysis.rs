//
// analysis.rs
//
// One analysis pass: reduces parser events into an index, prefixes,
// diagnostics and pending namespace edits
//

use std::collections::HashSet;

use anyhow::Result;
use indexmap::IndexMap;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::config::NamespaceMode;
use crate::namespace_insertion::{plan_insertion, PendingEdit};
use crate::namespaces::NamespaceTables;
use crate::parser::lexer::Span;
use crate::parser::{self, EventSink, RawTerm};
use crate::prefixes::{partial_prefix_before, seed_vocabulary, PrefixMap, PrefixResolver};
use crate::token_index::{classify, TokenIndex};
use crate::utf16::position_to_byte_offset;

/// Message prefix of unknown-prefix diagnostics. Code actions recover the
/// prefix from the text following it.
pub const UNKNOWN_PREFIX_MESSAGE: &str = "Unknown prefix: ";

pub const DIAGNOSTIC_SOURCE: &str = "n3";

/// End of the statement still open at the end of the document.
pub const OPEN_STATEMENT_END: Position = Position {
    line: u32::MAX,
    character: u32::MAX,
};

/// Session state a pass reads but never changes.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub namespaces: &'a NamespaceTables,
    pub mode: NamespaceMode,
}

/// Everything one completed pass produced for a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassOutcome {
    pub index: TokenIndex,
    pub prefixes: PrefixMap,
    /// Full replacement set for the document
    pub diagnostics: Vec<Diagnostic>,
    /// At most one per prefix, in order of first use
    pub pending_edits: Vec<PendingEdit>,
}

/// Run a full pass over `text`.
///
/// Syntax problems end up in the outcome's diagnostics. An error is only
/// returned when the parser hands over a term the index cannot classify;
/// the caller must then keep the document's previous outcome.
pub fn analyze(text: &str, ctx: &AnalysisContext<'_>) -> Result<PassOutcome> {
    analyze_with(text, ctx, |text, sink| parser::parse(text, sink))
}

/// Run a pass with a caller-supplied event source in place of the parser.
pub(crate) fn analyze_with<F>(text: &str, ctx: &AnalysisContext<'_>, parse: F) -> Result<PassOutcome>
where
    F: FnOnce(&str, &mut dyn EventSink),
{
    let mut reducer = PassReducer::new(text, ctx);
    parse(text, &mut reducer);
    reducer.finish()
}

/// Whether `position` lies in `statement` (half-open).
pub fn statement_contains(statement: &Range, position: Position) -> bool {
    statement.start <= position && position < statement.end
}

fn unknown_prefix_diagnostic(prefix: &str, range: Range) -> Diagnostic {
    error_diagnostic(range, format!("{}{}", UNKNOWN_PREFIX_MESSAGE, prefix))
}

fn error_diagnostic(range: Range, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

/// Event sink for a single pass. Owns everything it builds; borrows the
/// document text only for the duration of the pass.
struct PassReducer<'a> {
    text: &'a str,
    ctx: &'a AnalysisContext<'a>,
    index: TokenIndex,
    prefixes: PrefixMap,
    diagnostics: Vec<Diagnostic>,
    pending: IndexMap<String, PendingEdit>,
    /// First use of each prefix that got a pending edit
    first_use: IndexMap<String, Range>,
    /// Prefixes that already have an unknown-prefix diagnostic
    reported: HashSet<String>,
    /// Candidates the partial-prefix heuristic already handled
    partial_candidates: HashSet<String>,
    occurrences: Vec<(String, Position)>,
    statement_ends: Vec<Position>,
    failure: Option<anyhow::Error>,
}

impl<'a> PassReducer<'a> {
    fn new(text: &'a str, ctx: &'a AnalysisContext<'a>) -> Self {
        Self {
            text,
            ctx,
            index: TokenIndex::new(),
            prefixes: PrefixMap::new(),
            diagnostics: Vec::new(),
            pending: IndexMap::new(),
            first_use: IndexMap::new(),
            reported: HashSet::new(),
            partial_candidates: HashSet::new(),
            occurrences: Vec::new(),
            statement_ends: Vec::new(),
            failure: None,
        }
    }

    fn report_unknown(&mut self, prefix: &str, range: Range) {
        if self.reported.insert(prefix.to_string()) {
            self.diagnostics.push(unknown_prefix_diagnostic(prefix, range));
        }
    }

    /// A prefix typed at the end of input, before any local name, only
    /// shows up as a syntax error. Pre-populate its vocabulary so completion
    /// has something to offer.
    fn seed_partial_prefix(&mut self, line: u32, column: u32) {
        let offset = position_to_byte_offset(self.text, line, column).unwrap_or(self.text.len());
        let Some(candidate) = partial_prefix_before(self.text, offset) else {
            return;
        };
        if !self.partial_candidates.insert(candidate.to_string()) {
            return;
        }
        let resolver = PrefixResolver::new(&self.prefixes, &self.ctx.namespaces.known);
        if let Some(uri) = resolver.known_undeclared(candidate) {
            seed_vocabulary(
                &mut self.index,
                candidate,
                uri,
                &self.ctx.namespaces.vocabularies,
            );
        }
    }

    fn statement_ranges(&self) -> Vec<Range> {
        let mut start = Position::new(0, 0);
        let mut ranges = Vec::with_capacity(self.statement_ends.len() + 1);
        for &end in &self.statement_ends {
            ranges.push(Range::new(start, end));
            start = end;
        }
        ranges.push(Range::new(start, OPEN_STATEMENT_END));
        ranges
    }

    fn finish(mut self) -> Result<PassOutcome> {
        if let Some(e) = self.failure.take() {
            return Err(e);
        }

        // A prefix declared further down is not missing; inserting another
        // directive would redeclare it.
        let declared_later: Vec<String> = self
            .pending
            .keys()
            .filter(|prefix| self.prefixes.contains(prefix))
            .cloned()
            .collect();
        for prefix in declared_later {
            self.pending.shift_remove(&prefix);
            if let Some(range) = self.first_use.get(&prefix).copied() {
                self.report_unknown(&prefix, range);
            }
        }

        let statements = self.statement_ranges();
        for (prefix, position) in &self.occurrences {
            let Some(edit) = self.pending.get_mut(prefix) else {
                continue;
            };
            if let Some(statement) = statements
                .iter()
                .find(|s| statement_contains(s, *position))
            {
                if !edit.statements.contains(statement) {
                    edit.statements.push(*statement);
                }
            }
        }

        log::trace!(
            "Pass finished: {} terms, {} prefixes, {} diagnostics, {} pending edits",
            self.index.len(),
            self.prefixes.len(),
            self.diagnostics.len(),
            self.pending.len()
        );

        Ok(PassOutcome {
            index: self.index,
            prefixes: self.prefixes,
            diagnostics: self.diagnostics,
            pending_edits: self.pending.into_values().collect(),
        })
    }
}

impl EventSink for PassReducer<'_> {
    fn syntax_error(&mut self, token: Option<&Span>, line: u32, column: u32, message: &str) {
        let range = match token {
            Some(span) => Range::new(
                Position::new(span.start.line, span.start.column),
                Position::new(span.end.line, span.end.column),
            ),
            None => {
                let at = Position::new(line, column);
                Range::new(at, at)
            }
        };
        self.diagnostics.push(error_diagnostic(range, message.to_string()));

        if token.is_none() {
            self.seed_partial_prefix(line, column);
        }
    }

    fn unknown_prefix(&mut self, prefix: &str, _pname: &str, line: u32, start: u32, end: u32) {
        let range = Range::new(Position::new(line, start), Position::new(line, end));
        self.occurrences.push((prefix.to_string(), range.start));

        if self.pending.contains_key(prefix) || self.reported.contains(prefix) {
            return;
        }

        let known_uri = match self.ctx.mode {
            NamespaceMode::Automatic => self.ctx.namespaces.known.get(prefix),
            NamespaceMode::Suggest => None,
        };
        match known_uri {
            Some(uri) => {
                let edit = plan_insertion(self.text, prefix, uri);
                self.first_use.insert(prefix.to_string(), range);
                self.pending.insert(prefix.to_string(), edit);
            }
            None => self.report_unknown(prefix, range),
        }
    }

    fn on_term(&mut self, kind: &str, term: RawTerm<'_>) {
        if self.failure.is_some() {
            return;
        }
        match classify(kind, term) {
            Ok(term) => {
                self.index.add(term);
            }
            Err(e) => self.failure = Some(e),
        }
    }

    fn on_prefix(&mut self, prefix: &str, uri: &str) {
        self.prefixes.declare_raw(prefix, uri);
    }

    fn console_error(&mut self, kind: &str, line: u32, start: u32, end: u32, message: &str) {
        log::debug!("{} at {}:{}-{}: {}", kind, line, start, end, message);
    }

    fn statement_end(&mut self, line: u32, column: u32) {
        self.statement_ends.push(Position::new(line, column));
    }
}
