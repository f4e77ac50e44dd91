//
// completion_context.rs
//
// Detects what kind of term is being completed from the text before the cursor
//

use tower_lsp::lsp_types::Position;

use crate::parser::lexer::is_name_char;
use crate::utf16::{lsp_lines, utf16_column_to_byte_offset};

/// What the character before the cursor asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// After `?`: variables of the current document
    QueryVariable,
    /// After `<`: IRIs of all open documents
    Iri,
    /// After `_:`: blank node labels of the current document
    BlankNode,
    /// After `prefix:`: local names of that prefix in all open documents
    PrefixedName { prefix: String },
}

/// Text of the cursor's line up to the cursor.
///
/// Returns `None` when the line does not exist.
pub fn line_prefix_at(text: &str, position: Position) -> Option<&str> {
    let (_, line) = lsp_lines(text).nth(position.line as usize)?;
    let end = utf16_column_to_byte_offset(line, position.character);
    Some(&line[..end])
}

/// Classify the completion request from the line text before the cursor.
///
/// # Examples
///
/// ```
/// use n3_lsp::completion_context::{detect_completion_context, CompletionContext};
///
/// assert_eq!(detect_completion_context("{ ?"), Some(CompletionContext::QueryVariable));
/// assert_eq!(
///     detect_completion_context("<s> rdf:"),
///     Some(CompletionContext::PrefixedName { prefix: "rdf".into() })
/// );
/// assert_eq!(detect_completion_context("<s> rdf"), None);
/// ```
pub fn detect_completion_context(line_prefix: &str) -> Option<CompletionContext> {
    match line_prefix.chars().last()? {
        '?' => Some(CompletionContext::QueryVariable),
        '<' => Some(CompletionContext::Iri),
        ':' => {
            let before = &line_prefix[..line_prefix.len() - 1];
            let start = before
                .char_indices()
                .rev()
                .take_while(|(_, ch)| is_name_char(*ch))
                .last()
                .map(|(idx, _)| idx)
                .unwrap_or(before.len());
            let prefix = &before[start..];
            if prefix == "_" {
                Some(CompletionContext::BlankNode)
            } else {
                Some(CompletionContext::PrefixedName {
                    prefix: prefix.to_string(),
                })
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pname(prefix: &str) -> Option<CompletionContext> {
        Some(CompletionContext::PrefixedName {
            prefix: prefix.to_string(),
        })
    }

    #[test]
    fn test_trigger_characters() {
        assert_eq!(detect_completion_context("?"), Some(CompletionContext::QueryVariable));
        assert_eq!(detect_completion_context("<s> <"), Some(CompletionContext::Iri));
        assert_eq!(detect_completion_context("<s> _:"), Some(CompletionContext::BlankNode));
        assert_eq!(detect_completion_context("ex:"), pname("ex"));
    }

    #[test]
    fn test_other_characters_complete_nothing() {
        assert_eq!(detect_completion_context(""), None);
        assert_eq!(detect_completion_context("<s> "), None);
        assert_eq!(detect_completion_context("ex:a"), None);
        assert_eq!(detect_completion_context("<s> ."), None);
    }

    #[test]
    fn test_prefix_extraction() {
        assert_eq!(detect_completion_context("  :"), pname(""));
        assert_eq!(detect_completion_context("{ ?x foaf-x.y:"), pname("foaf-x.y"));
        assert_eq!(detect_completion_context("[ my_:"), pname("my_"));
        assert_eq!(detect_completion_context("(_:"), Some(CompletionContext::BlankNode));
    }

    #[test]
    fn test_line_prefix_at() {
        let text = "@prefix ex: <http://e/> .\r\n<s> ex:\n";
        assert_eq!(line_prefix_at(text, Position::new(1, 7)), Some("<s> ex:"));
        assert_eq!(line_prefix_at(text, Position::new(0, 200)), Some("@prefix ex: <http://e/> ."));
        assert_eq!(line_prefix_at(text, Position::new(5, 0)), None);
    }

    #[test]
    fn test_line_prefix_utf16_columns() {
        // U+1F600 is two UTF-16 units
        let text = "\"\u{1F600}\" ?";
        assert_eq!(line_prefix_at(text, Position::new(0, 6)), Some(text));
    }
}
