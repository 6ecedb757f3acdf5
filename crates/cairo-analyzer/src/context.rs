// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Syntactic caret-context classification.
//!
//! Cairo has no embeddable parser we can lean on, so the classifier works the
//! way a reader skimming the file would: one forward pass over the text before
//! the caret, folding line by line through a small state machine. The running
//! state is flat on purpose. Deeply nested constructs (an attribute block
//! inside a function inside a namespace) are approximated, not modeled, and
//! the tests below pin down which approximations we accept.

use crate::word::starts_with_word;

/// Where the caret sits, syntactically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxContext {
    /// File scope.
    Base,
    /// Right after a bare `from`.
    ImportModule,
    /// After `from <module>`, before `import`.
    ImportKeyword,
    /// After `from <module> import`.
    ImportFunction,
    /// Inside a still-open `from <module> import ( ...` list.
    ImportFunctionParenthesized,
    /// Between `func` and the header-closing `:`.
    FunctionDecl,
    /// Inside a function body.
    Function,
    /// Inside a `with_attr ...:` block.
    WithAttr,
}

/// Classify the caret context.
///
/// `text_up_to_cursor` is the document from the start to the caret and
/// `line_up_to_cursor` is the caret's line up to the caret. Import statements
/// are recognized from the current line alone; everything else needs the fold
/// over the preceding lines.
pub fn classify(text_up_to_cursor: &str, line_up_to_cursor: &str) -> SyntaxContext {
    // Single-line checks for the import forms.
    if line_up_to_cursor.trim() == "from" {
        return SyntaxContext::ImportModule;
    }
    let lead = line_up_to_cursor.trim_start();
    if lead.starts_with("from") && !line_up_to_cursor.contains("import") {
        return SyntaxContext::ImportKeyword;
    }
    if lead.starts_with("from") && line_up_to_cursor.contains("import") {
        return SyntaxContext::ImportFunction;
    }

    // No one-line syntax matched; fold over every line up to the caret.
    text_up_to_cursor
        .split('\n')
        .fold(SyntaxContext::Base, fold_line)
}

/// One transition of the classifier state machine.
///
/// | current                       | line                                | next          |
/// |-------------------------------|-------------------------------------|---------------|
/// | `WithAttr`                    | `end`                               | `Function`    |
/// | any other                     | `end`                               | `Base`        |
/// | any                           | `with_attr ...`                     | `WithAttr`    |
/// | any                           | `func ...` without `:`              | `FunctionDecl`|
/// | any                           | `func ...` with `:`                 | `Function`    |
/// | `FunctionDecl`                | line ending with `:`                | `Function`    |
/// | any                           | `from ...` with unterminated `(`    | `ImportFunctionParenthesized` |
/// | `ImportFunctionParenthesized` | line containing `)`                 | `Base`        |
/// | otherwise                     |                                     | unchanged     |
fn fold_line(current: SyntaxContext, line: &str) -> SyntaxContext {
    if line.trim() == "end" {
        return if current == SyntaxContext::WithAttr {
            // The attribute block closes back into its enclosing function.
            SyntaxContext::Function
        } else {
            SyntaxContext::Base
        };
    }

    let lead = line.trim_start();

    if starts_with_word(lead, "with_attr") {
        return SyntaxContext::WithAttr;
    }

    if starts_with_word(lead, "func") {
        return if line.contains(':') {
            // The header closed on its own line.
            SyntaxContext::Function
        } else {
            SyntaxContext::FunctionDecl
        };
    }

    if current == SyntaxContext::FunctionDecl && line.trim_end().ends_with(':') {
        return SyntaxContext::Function;
    }

    if starts_with_word(lead, "from") && line.contains('(') && !line.contains(')') {
        return SyntaxContext::ImportFunctionParenthesized;
    }

    if current == SyntaxContext::ImportFunctionParenthesized && line.contains(')') {
        return SyntaxContext::Base;
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_at_end(text: &str) -> SyntaxContext {
        let line = text.rsplit('\n').next().unwrap_or(text);
        classify(text, line)
    }

    #[test]
    fn bare_from_is_import_module() {
        assert_eq!(classify_at_end("from "), SyntaxContext::ImportModule);
        assert_eq!(classify_at_end("%lang starknet\nfrom"), SyntaxContext::ImportModule);
    }

    #[test]
    fn from_module_is_import_keyword() {
        assert_eq!(
            classify_at_end("from starkware.cairo "),
            SyntaxContext::ImportKeyword
        );
    }

    #[test]
    fn from_module_import_is_import_function() {
        assert_eq!(
            classify_at_end("from starkware.cairo.common.math import asse"),
            SyntaxContext::ImportFunction
        );
    }

    #[test]
    fn closed_header_puts_next_line_in_function() {
        let text = "func foo{range_check_ptr}():\n";
        assert_eq!(classify_at_end(text), SyntaxContext::Function);
    }

    #[test]
    fn open_header_is_function_decl() {
        assert_eq!(classify_at_end("func foo{range_check_ptr}"), SyntaxContext::FunctionDecl);
    }

    #[test]
    fn multi_line_header_closes_into_function() {
        let text = "func foo{range_check_ptr}(\n        a: felt) -> (res: felt):\n";
        assert_eq!(classify_at_end(text), SyntaxContext::Function);
    }

    #[test]
    fn with_attr_block_is_with_attr() {
        let text = "func f():\n    with_attr error_message(\"nope\"):\n        ";
        assert_eq!(classify_at_end(text), SyntaxContext::WithAttr);
    }

    #[test]
    fn end_of_with_attr_returns_to_function() {
        let text = "func f():\n    with_attr error_message(\"nope\"):\n        assert x = 0\n    end\n    ";
        assert_eq!(classify_at_end(text), SyntaxContext::Function);
    }

    #[test]
    fn end_of_function_returns_to_base() {
        let text = "func f():\n    return ()\nend\n";
        assert_eq!(classify_at_end(text), SyntaxContext::Base);
    }

    #[test]
    fn open_parenthesized_import() {
        let text = "from starkware.cairo.common.math import (\n    assert_not_zero,\n    ";
        assert_eq!(classify_at_end(text), SyntaxContext::ImportFunctionParenthesized);
    }

    #[test]
    fn closed_parenthesized_import_returns_to_base() {
        let text = "from starkware.cairo.common.math import (\n    assert_not_zero)\n";
        assert_eq!(classify_at_end(text), SyntaxContext::Base);
    }

    #[test]
    fn single_line_parenthesized_import_stays_base() {
        let text = "from starkware.cairo.common.math import (assert_not_zero)\n";
        assert_eq!(classify_at_end(text), SyntaxContext::Base);
    }

    #[test]
    fn func_prefix_needs_word_boundary() {
        assert_eq!(
            classify_at_end("functions_helper = 1\n"),
            SyntaxContext::Base
        );
    }
}
