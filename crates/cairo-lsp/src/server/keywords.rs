//! Keyword completion tables.
//!
//! Sort keys keep keywords from mixing into import suggestions: import
//! candidates sort at "0", base keywords at "1", StarkNet decorators at "2".

use lsp_types::{CompletionItem, CompletionItemKind};

fn keyword(label: &str, kind: CompletionItemKind, detail: &str, sort: Option<&str>) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        detail: Some(detail.to_string()),
        sort_text: sort.map(str::to_string),
        ..Default::default()
    }
}

/// Keywords available at file scope.
pub fn base_keywords() -> Vec<CompletionItem> {
    [
        ("namespace", CompletionItemKind::KEYWORD, "namespace"),
        ("func", CompletionItemKind::KEYWORD, "function"),
        ("from", CompletionItemKind::KEYWORD, "from"),
        ("import", CompletionItemKind::KEYWORD, "import"),
        ("const", CompletionItemKind::KEYWORD, "const"),
        ("end", CompletionItemKind::KEYWORD, "end"),
        ("member", CompletionItemKind::KEYWORD, "struct member"),
        ("felt", CompletionItemKind::CLASS, "field element"),
        ("struct", CompletionItemKind::CLASS, "struct"),
        ("error_message", CompletionItemKind::CLASS, "error message"),
    ]
    .iter()
    .map(|(label, kind, detail)| keyword(label, *kind, detail, Some("1")))
    .collect()
}

/// Keywords only available inside a function body.
pub fn function_keywords() -> Vec<CompletionItem> {
    [
        ("const", CompletionItemKind::KEYWORD, "const"),
        ("let", CompletionItemKind::KEYWORD, "let"),
        ("local", CompletionItemKind::KEYWORD, "local"),
        ("if", CompletionItemKind::KEYWORD, "if"),
        ("else", CompletionItemKind::KEYWORD, "else"),
        ("end", CompletionItemKind::KEYWORD, "end"),
        ("return", CompletionItemKind::KEYWORD, "return"),
        ("assert", CompletionItemKind::KEYWORD, "assert"),
        ("with_attr", CompletionItemKind::KEYWORD, "with attribute"),
        ("felt", CompletionItemKind::CLASS, "field element"),
        ("struct", CompletionItemKind::CLASS, "struct"),
        ("error_message", CompletionItemKind::CLASS, "error message"),
        ("alloc_locals", CompletionItemKind::FUNCTION, "allocate locals"),
        ("alloc", CompletionItemKind::FUNCTION, "allocate"),
    ]
    .iter()
    .map(|(label, kind, detail)| keyword(label, *kind, detail, None))
    .collect()
}

/// StarkNet `@` decorators, offered at file scope when compiling for
/// StarkNet.
pub fn starknet_keywords() -> Vec<CompletionItem> {
    [
        ("storage_var", CompletionItemKind::PROPERTY, "storage variable"),
        ("view", CompletionItemKind::PROPERTY, "view"),
        ("external", CompletionItemKind::PROPERTY, "external"),
        ("l1_handler", CompletionItemKind::PROPERTY, "l1 handler"),
    ]
    .iter()
    .map(|(label, kind, detail)| keyword(label, *kind, detail, Some("2")))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_keywords_sort_after_imports() {
        for item in base_keywords() {
            assert_eq!(item.sort_text.as_deref(), Some("1"));
        }
        for item in starknet_keywords() {
            assert_eq!(item.sort_text.as_deref(), Some("2"));
        }
    }

    #[test]
    fn function_keywords_include_with_attr() {
        assert!(function_keywords().iter().any(|i| i.label == "with_attr"));
    }
}
