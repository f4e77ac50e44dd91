//
// utf16.rs
//
// Conversions between LSP UTF-16 columns and byte offsets
//

/// Convert a UTF-16 column offset (from LSP Position.character) to a byte
/// offset within the given line. Columns past the end clamp to the line length.
pub fn utf16_column_to_byte_offset(line: &str, utf16_col: u32) -> usize {
    let mut utf16_count = 0;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_count >= utf16_col as usize {
            return byte_idx;
        }
        utf16_count += ch.len_utf16();
    }
    line.len()
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|ch| ch.len_utf16() as u32).sum()
}

/// Lines of `text` the way LSP counts them: `\n`, `\r\n` and a lone `\r` each
/// end a line. Yields the byte offset of every line and its text without the
/// terminator. Text ending in a terminator has a final empty line.
pub fn lsp_lines(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let bytes = text.as_bytes();
    let mut next_start = Some(0);
    std::iter::from_fn(move || {
        let start = next_start?;
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    next_start = Some(i + 1);
                    return Some((start, &text[start..i]));
                }
                b'\r' => {
                    let skip = if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    next_start = Some(i + skip);
                    return Some((start, &text[start..i]));
                }
                _ => i += 1,
            }
        }
        next_start = None;
        Some((start, &text[start..]))
    })
}

/// Byte offset of an LSP position (0-based line, UTF-16 column) within `text`.
///
/// Returns `None` when the line does not exist.
pub fn position_to_byte_offset(text: &str, line: u32, utf16_col: u32) -> Option<usize> {
    let (line_start, line_text) = lsp_lines(text).nth(line as usize)?;
    Some(line_start + utf16_column_to_byte_offset(line_text, utf16_col))
}
