//
// namespace_insertion.rs
//
// Where and what to insert when a known prefix is used without a declaration
//

use std::sync::OnceLock;

use regex::Regex;
use tower_lsp::lsp_types::{Position, Range, TextEdit};

use crate::utf16::lsp_lines;

const COMMENT_MARKER: char = '#';
const DIRECTIVE_KEYWORD: &str = "@prefix";

/// `@prefix` (case-sensitive) or SPARQL-style `PREFIX` (any case)
fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:@prefix|(?i:prefix))\b").unwrap())
}

/// A namespace declaration waiting to be delivered for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub prefix: String,
    pub namespace_uri: String,
    pub insertion_line: u32,
    pub insertion_text: String,
    /// Statements containing a use of the prefix in the pass that produced it
    pub statements: Vec<Range>,
}

impl PendingEdit {
    /// Zero-width insertion at the start of the insertion line.
    pub fn text_edit(&self) -> TextEdit {
        let at = Position::new(self.insertion_line, 0);
        TextEdit {
            range: Range::new(at, at),
            new_text: self.insertion_text.clone(),
        }
    }
}

/// The directive line declaring `prefix`.
pub fn directive_text(prefix: &str, namespace_uri: &str) -> String {
    format!("{} {}: <{}> .\n", DIRECTIVE_KEYWORD, prefix, namespace_uri)
}

fn is_directive(line: &str) -> bool {
    directive_pattern().is_match(line)
}

/// Find the insertion line: past the leading comment block, then past blank
/// lines. Returns the line and whether it already holds a prefix directive.
///
/// A document that is nothing but comments and blank lines inserts at line 0.
pub fn insertion_point(text: &str) -> (u32, bool) {
    let lines: Vec<&str> = lsp_lines(text).map(|(_, line)| line.trim()).collect();

    let mut idx = lines
        .iter()
        .position(|line| !line.starts_with(COMMENT_MARKER))
        .unwrap_or(lines.len());
    while idx < lines.len() && lines[idx].is_empty() {
        idx += 1;
    }

    match lines.get(idx) {
        Some(line) => (idx as u32, is_directive(line)),
        None => (0, false),
    }
}

/// Plan the declaration of `prefix` in `text`.
///
/// Next to an existing directive only the directive line is inserted;
/// anywhere else a blank line follows it.
///
/// # Examples
///
/// ```
/// use n3_lsp::namespace_insertion::plan_insertion;
///
/// let edit = plan_insertion(":- x y z .\n", "b", "http://b/");
/// assert_eq!(edit.insertion_line, 0);
/// assert_eq!(edit.insertion_text, "@prefix b: <http://b/> .\n\n");
/// ```
pub fn plan_insertion(text: &str, prefix: &str, namespace_uri: &str) -> PendingEdit {
    let (line, next_is_directive) = insertion_point(text);
    let mut insertion_text = directive_text(prefix, namespace_uri);
    if !next_is_directive {
        insertion_text.push('\n');
    }
    PendingEdit {
        prefix: prefix.to_string(),
        namespace_uri: namespace_uri.to_string(),
        insertion_line: line,
        insertion_text,
        statements: Vec::new(),
    }
}
