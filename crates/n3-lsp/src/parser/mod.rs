//
// parser/mod.rs
//
// Event-driven N3/Turtle parser. The parser never builds a tree: it reports
// what it recognises to an `EventSink` while walking the token stream once.
//

pub mod lexer;

use std::collections::HashMap;

use crate::utf16::utf16_len;
use lexer::{Lexer, SourcePos, Span, Token, TokenKind};

/// Grammar label for IRI references.
pub const TERM_IRI: &str = "iri";
/// Grammar label for blank-node labels.
pub const TERM_BLANK_NODE: &str = "bnode";
/// Grammar label for quick variables.
pub const TERM_QUERY_VARIABLE: &str = "qvar";
/// Grammar label for prefixed names.
pub const TERM_PREFIXED_NAME: &str = "pname";

/// Raw shape of a term as the grammar delivers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTerm<'a> {
    Single(&'a str),
    Pair(&'a str, &'a str),
}

/// Receiver of parse events. All callbacks run synchronously inside [`parse`].
///
/// Lines are 0-based; columns are 0-based UTF-16 code units.
pub trait EventSink {
    /// A syntax error. `token` is `None` when the error is at end of input.
    fn syntax_error(&mut self, token: Option<&Span>, line: u32, column: u32, message: &str);

    /// A prefixed name whose prefix has not been declared (yet).
    /// `start`/`end` delimit the prefix part on `line`.
    fn unknown_prefix(&mut self, prefix: &str, pname: &str, line: u32, start: u32, end: u32);

    /// A term was recognised. `kind` is one of the `TERM_*` labels.
    fn on_term(&mut self, kind: &str, term: RawTerm<'_>);

    /// A prefix declaration, with its raw lexical forms (`ex:`, `<http://…>`).
    fn on_prefix(&mut self, prefix: &str, uri: &str);

    /// Non-fatal debug channel.
    fn console_error(&mut self, _kind: &str, _line: u32, _start: u32, _end: u32, _message: &str) {}

    /// A top-level statement ended at the given position (just past its terminator).
    fn statement_end(&mut self, _line: u32, _column: u32) {}
}

/// Parse `text` and report everything to `sink`. Never fails: problems are
/// reported as `syntax_error` events and parsing resumes at the next statement.
pub fn parse<S: EventSink + ?Sized>(text: &str, sink: &mut S) {
    let tokens = Lexer::new(text).tokenize();
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        depth: 0,
        declared: HashMap::new(),
        sink,
    };
    parser.document();
}

/// Marker for an error that has already been reported to the sink.
struct Reported;

type ParseResult<T = ()> = Result<T, Reported>;

struct Parser<'t, 's, S: EventSink + ?Sized> {
    text: &'t str,
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting depth of `[`, `(` and `{` at the current token
    depth: usize,
    /// Declared prefix -> namespace IRI for the current parse
    declared: HashMap<String, String>,
    sink: &'s mut S,
}

fn is_word(kind: &TokenKind, word: &str) -> bool {
    match kind {
        TokenKind::Name(name) | TokenKind::AtKeyword(name) => name == word,
        _ => false,
    }
}

fn is_keyword_ci(kind: &TokenKind, word: &str) -> bool {
    matches!(kind, TokenKind::Name(name) if name.eq_ignore_ascii_case(word))
}

impl<'t, 's, S: EventSink + ?Sized> Parser<'t, 's, S> {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof and `pos` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn source_of(&self, span: &Span) -> &'t str {
        &self.text[span.start.offset..span.end.offset]
    }

    /// Report an error at the current token.
    fn error(&mut self, expected: &str) -> Reported {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Eof => {
                let message = format!("unexpected end of input, expected {}", expected);
                self.sink.syntax_error(
                    None,
                    token.span.start.line,
                    token.span.start.column,
                    &message,
                );
            }
            TokenKind::Invalid(problem) => {
                let message = format!("{}, expected {}", problem, expected);
                self.sink.syntax_error(
                    Some(&token.span),
                    token.span.start.line,
                    token.span.start.column,
                    &message,
                );
            }
            _ => {
                let message = format!(
                    "unexpected '{}', expected {}",
                    self.source_of(&token.span),
                    expected
                );
                self.sink.syntax_error(
                    Some(&token.span),
                    token.span.start.line,
                    token.span.start.column,
                    &message,
                );
            }
        }
        Reported
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn end_statement(&mut self, at: SourcePos) {
        self.sink.statement_end(at.line, at.column);
    }

    fn document(&mut self) {
        while !self.peek().is_eof() {
            if self.statement().is_err() {
                self.recover();
            }
        }
    }

    /// Skip to the terminator of the statement in which the error occurred.
    fn recover(&mut self) {
        let mut level = self.depth;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::LBracket | TokenKind::LParen | TokenKind::LBrace => level += 1,
                TokenKind::RBracket | TokenKind::RParen | TokenKind::RBrace => {
                    level = level.saturating_sub(1)
                }
                TokenKind::Dot if level == 0 => {
                    self.end_statement(token.span.end);
                    break;
                }
                _ => {}
            }
        }
        self.depth = 0;
    }

    fn statement(&mut self) -> ParseResult {
        let kind = self.peek().kind.clone();
        if is_word(&kind, "prefix") && matches!(kind, TokenKind::AtKeyword(_)) {
            self.prefix_directive(true)
        } else if is_keyword_ci(&kind, "prefix") {
            self.prefix_directive(false)
        } else if is_word(&kind, "base") && matches!(kind, TokenKind::AtKeyword(_)) {
            self.base_directive(true)
        } else if is_keyword_ci(&kind, "base") {
            self.base_directive(false)
        } else if matches!(&kind, TokenKind::AtKeyword(k) if k == "forAll" || k == "forSome") {
            self.quantifier()
        } else {
            self.triples()?;
            let dot = self.expect(TokenKind::Dot, "'.' at end of statement")?;
            self.end_statement(dot.span.end);
            Ok(())
        }
    }

    fn prefix_directive(&mut self, at_form: bool) -> ParseResult {
        self.advance();
        let prefix_token = self.peek().clone();
        let prefix = match &prefix_token.kind {
            TokenKind::PrefixedName { prefix, local } if local.is_empty() => prefix.clone(),
            _ => return Err(self.error("a prefix name such as 'ex:'")),
        };
        self.advance();

        let iri_token = self.peek().clone();
        let TokenKind::IriRef(iri) = &iri_token.kind else {
            return Err(self.error("a namespace IRI such as <http://example.org/>"));
        };
        self.advance();

        let raw_prefix = self.source_of(&prefix_token.span);
        let raw_iri = self.source_of(&iri_token.span);
        if let Some(previous) = self.declared.get(&prefix) {
            if previous != iri {
                let message = format!("prefix '{}:' redeclared", prefix);
                self.sink.console_error(
                    "prefix",
                    prefix_token.span.start.line,
                    prefix_token.span.start.column,
                    prefix_token.span.end.column,
                    &message,
                );
            }
        }
        self.sink.on_prefix(raw_prefix, raw_iri);
        self.declared.insert(prefix, iri.clone());

        if at_form {
            let dot = self.expect(TokenKind::Dot, "'.' after prefix directive")?;
            self.end_statement(dot.span.end);
        } else {
            self.end_statement(iri_token.span.end);
        }
        Ok(())
    }

    fn base_directive(&mut self, at_form: bool) -> ParseResult {
        self.advance();
        let iri_token = self.peek().clone();
        if !matches!(iri_token.kind, TokenKind::IriRef(_)) {
            return Err(self.error("a base IRI"));
        }
        self.advance();
        if at_form {
            let dot = self.expect(TokenKind::Dot, "'.' after base directive")?;
            self.end_statement(dot.span.end);
        } else {
            self.end_statement(iri_token.span.end);
        }
        Ok(())
    }

    fn quantifier(&mut self) -> ParseResult {
        self.advance();
        self.path("a quantified term")?;
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            self.path("a quantified term")?;
        }
        let dot = self.expect(TokenKind::Dot, "'.' after quantifier")?;
        self.end_statement(dot.span.end);
        Ok(())
    }

    fn triples(&mut self) -> ParseResult {
        let standalone = matches!(self.peek().kind, TokenKind::LBracket | TokenKind::LBrace);
        self.path("subject")?;
        let next = &self.peek().kind;
        if standalone && matches!(next, TokenKind::Dot | TokenKind::RBrace) {
            return Ok(());
        }
        self.predicate_object_list()
    }

    fn predicate_object_list(&mut self) -> ParseResult {
        self.verb()?;
        self.object_list()?;
        while self.peek().kind == TokenKind::Semicolon {
            while self.peek().kind == TokenKind::Semicolon {
                self.advance();
            }
            if matches!(
                self.peek().kind,
                TokenKind::Dot | TokenKind::RBracket | TokenKind::RBrace
            ) {
                break;
            }
            self.verb()?;
            self.object_list()?;
        }
        Ok(())
    }

    fn verb(&mut self) -> ParseResult {
        let kind = self.peek().kind.clone();
        match kind {
            TokenKind::Equals | TokenKind::Implies | TokenKind::ImpliedBy => {
                self.advance();
                Ok(())
            }
            ref k if is_word(k, "a") => {
                self.advance();
                Ok(())
            }
            ref k if is_word(k, "has") => {
                self.advance();
                self.path("predicate")
            }
            ref k if is_word(k, "is") => {
                self.advance();
                self.path("predicate")?;
                if is_word(&self.peek().kind, "of") {
                    self.advance();
                    Ok(())
                } else {
                    Err(self.error("'of'"))
                }
            }
            _ => self.path("predicate"),
        }
    }

    fn object_list(&mut self) -> ParseResult {
        self.path("object")?;
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            self.path("object")?;
        }
        Ok(())
    }

    fn path(&mut self, expected: &str) -> ParseResult {
        self.path_item(expected)?;
        while matches!(self.peek().kind, TokenKind::Bang | TokenKind::Caret) {
            self.advance();
            self.path_item("path step")?;
        }
        Ok(())
    }

    fn prefixed_name(&mut self, token: &Token, prefix: &str, local: &str) {
        if !self.declared.contains_key(prefix) {
            let start = token.span.start.column;
            let pname = self.source_of(&token.span);
            self.sink.unknown_prefix(
                prefix,
                pname,
                token.span.start.line,
                start,
                start + utf16_len(prefix),
            );
        }
        self.sink
            .on_term(TERM_PREFIXED_NAME, RawTerm::Pair(prefix, local));
    }

    fn path_item(&mut self, expected: &str) -> ParseResult {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::IriRef(iri) => {
                self.advance();
                self.sink.on_term(TERM_IRI, RawTerm::Single(iri));
            }
            TokenKind::PrefixedName { prefix, local } => {
                self.advance();
                self.prefixed_name(&token, prefix, local);
            }
            TokenKind::BlankNodeLabel(label) => {
                self.advance();
                self.sink.on_term(TERM_BLANK_NODE, RawTerm::Single(label));
            }
            TokenKind::Variable(name) => {
                self.advance();
                self.sink
                    .on_term(TERM_QUERY_VARIABLE, RawTerm::Single(name));
            }
            TokenKind::StringLiteral(_) => {
                self.advance();
                self.literal_suffix()?;
            }
            TokenKind::Number(_) => {
                self.advance();
            }
            kind if is_word(kind, "true") || is_word(kind, "false") => {
                self.advance();
            }
            TokenKind::LBracket => {
                self.advance();
                self.depth += 1;
                if self.peek().kind != TokenKind::RBracket {
                    self.predicate_object_list()?;
                }
                self.expect(TokenKind::RBracket, "']'")?;
                self.depth -= 1;
            }
            TokenKind::LParen => {
                self.advance();
                self.depth += 1;
                while self.peek().kind != TokenKind::RParen {
                    self.path("collection item or ')'")?;
                }
                self.advance();
                self.depth -= 1;
            }
            TokenKind::LBrace => {
                self.advance();
                self.depth += 1;
                self.formula_content()?;
                self.depth -= 1;
            }
            _ => return Err(self.error(expected)),
        }
        Ok(())
    }

    fn literal_suffix(&mut self) -> ParseResult {
        match self.peek().kind {
            TokenKind::LangTag(_) => {
                self.advance();
            }
            TokenKind::DoubleCaret => {
                self.advance();
                let token = self.peek().clone();
                match &token.kind {
                    TokenKind::IriRef(iri) => {
                        self.advance();
                        self.sink.on_term(TERM_IRI, RawTerm::Single(iri));
                    }
                    TokenKind::PrefixedName { prefix, local } => {
                        self.advance();
                        self.prefixed_name(&token, prefix, local);
                    }
                    _ => return Err(self.error("a datatype IRI")),
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Statements inside `{ … }`, consuming the closing brace.
    fn formula_content(&mut self) -> ParseResult {
        loop {
            if self.peek().kind == TokenKind::RBrace {
                self.advance();
                return Ok(());
            }
            self.triples()?;
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                }
                TokenKind::RBrace => {}
                _ => return Err(self.error("'.' or '}'")),
            }
        }
    }
}
