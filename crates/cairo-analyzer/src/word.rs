// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Word extraction from raw line text.
//!
//! Every higher-level feature (hover, go-to-definition, completion) starts by
//! asking "what identifier is under the caret". Identifiers are runs of
//! `[0-9a-zA-Z_]`, optionally including `.` so that a qualified
//! `namespace.function` reference can be recovered in one piece.

/// Extract the maximal identifier run containing `offset`.
///
/// Scans left from `offset` to the nearest boundary character, then right
/// similarly, and returns the inclusive substring. With `include_dot` the dot
/// counts as an identifier character, so callers can compare the dotted and
/// bare forms to tell `ns.func` apart from `func`.
///
/// Offsets are in characters, clamped to the text. Returns an empty string
/// when `offset` sits on a boundary character.
pub fn extract_word(text: &str, offset: usize, include_dot: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let offset = offset.min(chars.len());

    let is_word =
        |c: char| c.is_ascii_alphanumeric() || c == '_' || (include_dot && c == '.');

    let mut start = offset;
    while start > 0 && is_word(chars[start - 1]) {
        start -= 1;
    }

    let mut end = offset;
    while end < chars.len() && is_word(chars[end]) {
        end += 1;
    }

    chars[start..end].iter().collect()
}

/// Both spellings of the word at `offset`: with and without dots.
pub fn word_pair(text: &str, offset: usize) -> (String, String) {
    (
        extract_word(text, offset, true),
        extract_word(text, offset, false),
    )
}

/// Check that `line` opens with `keyword` followed by whitespace.
///
/// `functions_helper` must not count as a `func` line, so the character right
/// after the keyword has to be whitespace and at least one more character has
/// to follow it.
pub fn starts_with_word(line: &str, keyword: &str) -> bool {
    line.starts_with(keyword)
        && line.len() > keyword.len() + 1
        && line[keyword.len()..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
}
