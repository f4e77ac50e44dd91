//
// parser/lexer.rs
//
// Tokenizer for N3/Turtle source text
//

use crate::utf16::utf16_len;

/// A position in the source: 0-based line, 0-based UTF-16 column, byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

/// Half-open source range covered by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: SourcePos,
    pub end: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `<http://example.org/>`, content without the angle brackets
    IriRef(String),
    /// `prefix:local`, either part may be empty
    PrefixedName { prefix: String, local: String },
    /// `_:label`
    BlankNodeLabel(String),
    /// `?name`
    Variable(String),
    /// String literal content, any quoting style
    StringLiteral(String),
    /// `@en` directly after a string literal
    LangTag(String),
    Number(String),
    /// `@prefix`, `@base`, `@forAll`, ...
    AtKeyword(String),
    /// A bare word: `a`, `PREFIX`, `true`, `is`, or an unrecognised identifier
    Name(String),
    Dot,
    Semicolon,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    DoubleCaret,
    Caret,
    Bang,
    Equals,
    Implies,
    ImpliedBy,
    /// Lexical error; the payload describes the problem
    Invalid(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Characters allowed after the first character of a prefix or bare name.
pub fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '.'
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_local_char(ch: char) -> bool {
    is_name_char(ch) || ch == ':' || ch == '%'
}

pub struct Lexer<'a> {
    text: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let start = self.pos();
            let Some(ch) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span { start, end: start },
                });
                return tokens;
            };

            let after_literal = matches!(
                tokens.last(),
                Some(Token { kind: TokenKind::StringLiteral(_), span }) if span.end.offset == start.offset
            );
            let kind = self.next_kind(ch, after_literal);
            tokens.push(Token {
                kind,
                span: Span {
                    start,
                    end: self.pos(),
                },
            });
        }
    }

    fn next_kind(&mut self, ch: char, after_literal: bool) -> TokenKind {
        match ch {
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            '.' => self.single(TokenKind::Dot),
            ';' => self.single(TokenKind::Semicolon),
            ',' => self.single(TokenKind::Comma),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '!' => self.single(TokenKind::Bang),
            '^' if self.peek_nth(1) == Some('^') => {
                self.bump();
                self.single(TokenKind::DoubleCaret)
            }
            '^' => self.single(TokenKind::Caret),
            '=' if self.peek_nth(1) == Some('>') => {
                self.bump();
                self.single(TokenKind::Implies)
            }
            '=' => self.single(TokenKind::Equals),
            '<' if self.peek_nth(1) == Some('=') => {
                self.bump();
                self.single(TokenKind::ImpliedBy)
            }
            '<' => self.read_iri(),
            '"' | '\'' => self.read_string(ch),
            '@' => self.read_at_word(after_literal),
            '?' => self.read_variable(),
            '_' if self.peek_nth(1) == Some(':') => self.read_blank_node(),
            '+' | '-' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit() || c == '.') => {
                self.read_number()
            }
            c if c.is_ascii_digit() => self.read_number(),
            ':' => self.read_name_or_pname(),
            c if is_name_start(c) => self.read_name_or_pname(),
            other => {
                self.bump();
                TokenKind::Invalid(format!("unexpected character '{}'", other))
            }
        }
    }

    fn pos(&self) -> SourcePos {
        SourcePos {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        // A lone '\r' ends a line too; in "\r\n" the '\n' does
        if ch == '\n' || (ch == '\r' && self.peek() != Some('\n')) {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as u32;
        }
        Some(ch)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    /// Consume characters while `pred` holds and return the consumed slice.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.offset;
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.bump();
        }
        &self.text[start..self.offset]
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                self.take_while(|c| c != '\n' && c != '\r');
            } else {
                break;
            }
        }
    }

    fn read_iri(&mut self) -> TokenKind {
        self.bump(); // <
        let content = self.take_while(|c| c != '>' && c != '<' && !c.is_whitespace());
        if self.peek() == Some('>') {
            self.bump();
            TokenKind::IriRef(content.to_string())
        } else {
            TokenKind::Invalid("unterminated IRI reference".to_string())
        }
    }

    fn read_string(&mut self, quote: char) -> TokenKind {
        let long = self.peek_nth(1) == Some(quote) && self.peek_nth(2) == Some(quote);
        if long {
            self.bump();
            self.bump();
            self.bump();
        } else {
            self.bump();
        }

        let start = self.offset;
        loop {
            let Some(ch) = self.peek() else {
                return TokenKind::Invalid("unterminated string literal".to_string());
            };
            if ch == '\\' {
                self.bump();
                self.bump();
                continue;
            }
            if !long && (ch == '\n' || ch == '\r') {
                return TokenKind::Invalid("unterminated string literal".to_string());
            }
            if ch == quote {
                if !long {
                    let content = &self.text[start..self.offset];
                    self.bump();
                    return TokenKind::StringLiteral(content.to_string());
                }
                if self.peek_nth(1) == Some(quote) && self.peek_nth(2) == Some(quote) {
                    let content = &self.text[start..self.offset];
                    self.bump();
                    self.bump();
                    self.bump();
                    return TokenKind::StringLiteral(content.to_string());
                }
            }
            self.bump();
        }
    }

    fn read_at_word(&mut self, after_literal: bool) -> TokenKind {
        self.bump(); // @
        let word = self.take_while(|c| c.is_alphanumeric() || c == '-');
        if word.is_empty() {
            return TokenKind::Invalid("expected a keyword or language tag after '@'".to_string());
        }
        if after_literal {
            TokenKind::LangTag(word.to_string())
        } else {
            TokenKind::AtKeyword(word.to_string())
        }
    }

    fn read_variable(&mut self) -> TokenKind {
        self.bump(); // ?
        let name = self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if name.is_empty() {
            TokenKind::Invalid("expected a variable name after '?'".to_string())
        } else {
            TokenKind::Variable(name.to_string())
        }
    }

    fn read_blank_node(&mut self) -> TokenKind {
        self.bump(); // _
        self.bump(); // :
        let label = self.take_local();
        TokenKind::BlankNodeLabel(label.to_string())
    }

    fn read_number(&mut self) -> TokenKind {
        let start = self.offset;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        TokenKind::Number(self.text[start..self.offset].to_string())
    }

    /// Consume a local-name run, leaving any trailing dots for the statement terminator.
    fn take_local(&mut self) -> &'a str {
        let rest = self.rest();
        let mut last_non_dot = 0;
        for (idx, ch) in rest.char_indices() {
            if !is_local_char(ch) {
                break;
            }
            if ch != '.' {
                last_non_dot = idx + ch.len_utf8();
            }
        }
        let local = &rest[..last_non_dot];
        self.advance_over(local);
        local
    }

    /// Advance over a slice known to contain no line breaks.
    fn advance_over(&mut self, consumed: &str) {
        self.offset += consumed.len();
        self.column += utf16_len(consumed);
    }

    fn read_name_or_pname(&mut self) -> TokenKind {
        let rest = self.rest();
        let mut prefix_end = 0;
        let mut last_non_dot = 0;
        for (idx, ch) in rest.char_indices() {
            if !is_name_char(ch) {
                break;
            }
            prefix_end = idx + ch.len_utf8();
            if ch != '.' {
                last_non_dot = prefix_end;
            }
        }

        if rest[prefix_end..].starts_with(':') {
            let prefix = &rest[..prefix_end];
            self.advance_over(prefix);
            self.bump(); // :
            let local = self.take_local();
            return TokenKind::PrefixedName {
                prefix: prefix.to_string(),
                local: local.to_string(),
            };
        }

        let word = &rest[..last_non_dot];
        self.advance_over(word);
        TokenKind::Name(word.to_string())
    }
}
