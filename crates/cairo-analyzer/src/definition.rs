// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Declaration lookup for the identifier under the caret.
//!
//! Two passes, concatenated: the imported-name pass resolves the caret word
//! against the import table and scans the resolved module file for matching
//! `func`/`struct`/`namespace` declarations, and the same-file pass scans the
//! current document for `func` declarations. Module files are read from disk
//! on every request; nothing is indexed.

use lsp_types::{LocationLink, Position, Range, Url};

use crate::imports::ImportTable;
use crate::resolver::{resolve_module, SearchPathSet};
use crate::word::starts_with_word;

/// Sentinel "rest of line" column for links that span a whole line.
const LINE_END: u32 = 999;

/// Sentinel "rest of file" line for links that mean "jump to this file".
const FILE_END_LINE: u32 = 9999;

/// Scope state while scanning a module file.
///
/// Tracks the currently open `namespace` and whether an `end` on the current
/// line belongs to a nested `func` or `with_attr` block instead of the
/// namespace itself.
#[derive(Debug, Default)]
struct ScanContext {
    namespace: Option<String>,
    in_func: bool,
    in_attr: bool,
}

/// Find declaration locations for the word under the caret.
///
/// `word_with_dot` and `word` are the two spellings from the word extractor;
/// a qualified `namespace.function` reference differs between them. Results
/// may be empty; multiple matches are all returned and callers typically use
/// the first.
pub fn locate_definition(
    text: &str,
    uri: &Url,
    word_with_dot: &str,
    word: &str,
    imports: &ImportTable,
    search_paths: &SearchPathSet,
) -> Vec<LocationLink> {
    let mut links = Vec::new();
    if word_with_dot.is_empty() {
        return links;
    }

    for entry in imports.entries() {
        if word_with_dot == entry.module {
            // The caret is on the module itself; link to the whole file and
            // let the editor place the caret.
            if let Some((module_url, _)) = resolve_module(&entry.module, search_paths) {
                links.push(whole_file_link(module_url));
            }
            break;
        } else if word_with_dot.starts_with(entry.name.as_str()) {
            let Some((module_url, module_path)) = resolve_module(&entry.module, search_paths)
            else {
                break;
            };
            let Ok(contents) = std::fs::read_to_string(&module_path) else {
                tracing::warn!("could not read module file {}", module_path.display());
                break;
            };
            scan_module(
                &contents,
                &module_url,
                &entry.name,
                word_with_dot,
                word,
                &mut links,
            );
        }
    }

    links.extend(same_file_pass(text, uri, word_with_dot));
    links
}

/// Scan a resolved module for declarations matching the caret word.
fn scan_module(
    contents: &str,
    module_url: &Url,
    import_name: &str,
    word_with_dot: &str,
    word: &str,
    links: &mut Vec<LocationLink>,
) {
    let mut ctx = ScanContext::default();

    for (line_number, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if ctx.namespace.is_some() {
            // Figure out when the namespace ends; `end` lines of nested
            // blocks must not close it.
            if starts_with_word(line, "func") {
                ctx.in_func = true;
            } else if starts_with_word(line, "with_attr") {
                ctx.in_attr = true;
            } else if ctx.in_attr && line == "end" {
                ctx.in_attr = false;
                continue;
            } else if ctx.in_func && line == "end" {
                ctx.in_func = false;
                continue;
            } else if line == "end" {
                ctx.namespace = None;
                continue;
            }
        }

        if starts_with_word(line, "func") {
            if let Some(namespace) = ctx.namespace.as_deref() {
                let (ns, func) = match word_with_dot.split_once('.') {
                    Some(pair) => pair,
                    None => (word_with_dot, ""),
                };
                // Only the function half of `namespace.function` points here.
                if ns == namespace && word == func {
                    push_if_declared(line, line_number, func, '{', module_url, links);
                    push_if_declared(line, line_number, func, '(', module_url, links);
                }
            } else {
                push_if_declared(line, line_number, import_name, '{', module_url, links);
                push_if_declared(line, line_number, import_name, '(', module_url, links);
            }
        }

        if starts_with_word(line, "struct") {
            push_if_declared(line, line_number, import_name, ':', module_url, links);
        }

        if starts_with_word(line, "namespace") {
            let name_end = line.rfind(':').unwrap_or(line.len());
            let namespace = line["namespace".len()..name_end].trim().to_string();
            tracing::trace!("entering namespace {namespace}");

            let first_segment = word_with_dot.split('.').next().unwrap_or("");
            if word == first_segment {
                // Caret on the namespace half of `namespace.function`.
                push_if_declared(line, line_number, import_name, ':', module_url, links);
            }

            ctx = ScanContext {
                namespace: Some(namespace),
                in_func: false,
                in_attr: false,
            };
        }
    }
}

/// Same-file pass: `func` declarations matching the caret word.
fn same_file_pass(text: &str, uri: &Url, word_with_dot: &str) -> Vec<LocationLink> {
    let mut links = Vec::new();
    for (line_number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !starts_with_word(line, "func") {
            continue;
        }
        let header = line["func".len()..].trim();
        let Some(name_end) = header.find(['{', '(']) else {
            continue;
        };
        if header[..name_end].trim() == word_with_dot {
            tracing::debug!("found function within the same module: {line}");
            links.push(whole_line_link(uri.clone(), line_number));
        }
    }
    links
}

/// Push a link to `line` when `name` appears on it as the declared name.
///
/// The name must run from just after the declaration keyword up to
/// `delimiter` (`{` or `(` for a function, `:` for a struct or namespace) and
/// be immediately preceded by whitespace, so a match inside a longer
/// identifier does not count.
fn push_if_declared(
    line: &str,
    line_number: usize,
    name: &str,
    delimiter: char,
    url: &Url,
    links: &mut Vec<LocationLink>,
) {
    if name.is_empty() {
        return;
    }
    let Some(name_start) = line.find(name) else {
        return;
    };
    let Some(delimiter_index) = line.find(delimiter) else {
        return;
    };
    if delimiter_index <= name_start {
        return;
    }
    let preceded_by_space = line[..name_start]
        .chars()
        .next_back()
        .is_some_and(char::is_whitespace);
    if !preceded_by_space {
        return;
    }
    if line[name_start..delimiter_index].trim() != name {
        return;
    }
    tracing::debug!("found declaration on line {line_number}: {line}");
    links.push(whole_line_link(url.clone(), line_number));
}

fn whole_line_link(url: Url, line: usize) -> LocationLink {
    let range = Range {
        start: Position {
            line: line as u32,
            character: 0,
        },
        end: Position {
            line: line as u32,
            character: LINE_END,
        },
    };
    LocationLink {
        origin_selection_range: None,
        target_uri: url,
        target_range: range,
        target_selection_range: range,
    }
}

fn whole_file_link(url: Url) -> LocationLink {
    let range = Range {
        start: Position {
            line: 0,
            character: 0,
        },
        end: Position {
            line: FILE_END_LINE,
            character: 0,
        },
    };
    LocationLink {
        origin_selection_range: None,
        target_uri: url,
        target_range: range,
        target_selection_range: range,
    }
}

/// Names of the `func`/`struct`/`namespace` declarations in a module,
/// unique and in order of appearance. Feeds import-list completion.
pub fn list_declarations(contents: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if starts_with_word(line, "func")
            || starts_with_word(line, "struct")
            || starts_with_word(line, "namespace")
        {
            let mut parts = line
                .split(|c: char| c.is_whitespace() || matches!(c, '{' | '(' | ':'))
                .filter(|s| !s.is_empty());
            parts.next(); // the keyword
            if let Some(name) = parts.next() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::build_import_table;
    use std::fs;
    use std::path::PathBuf;

    const MATH_MODULE: &str = "\
# common math helpers

func assert_not_zero{range_check_ptr}(value):
    assert value != 0
    return ()
end

func assert_not_equal(a, b):
    return ()
end

struct Uint256:
    member low: felt
    member high: felt
end

namespace SafeMath:
    func add{range_check_ptr}(a: felt, b: felt) -> (res: felt):
        with_attr error_message(\"overflow\"):
            assert a + b != 0
        end
        return (res=a + b)
    end
end
";

    struct Fixture {
        _dir: tempfile::TempDir,
        paths: SearchPathSet,
        module_path: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("starkware/math.cairo");
        fs::create_dir_all(module_path.parent().unwrap()).unwrap();
        fs::write(&module_path, MATH_MODULE).unwrap();
        let paths = SearchPathSet::new(vec![dir.path().to_path_buf()]);
        Fixture {
            _dir: dir,
            paths,
            module_path,
        }
    }

    fn doc_url() -> Url {
        Url::from_file_path("/workspace/contract.cairo").unwrap()
    }

    #[test]
    fn same_file_function_definition() {
        let text = "func helper{range_check_ptr}(x):\n    return ()\nend\n\nfunc main():\n    helper(1)\n    return ()\nend\n";
        let imports = ImportTable::default();
        let paths = SearchPathSet::default();
        let links = locate_definition(text, &doc_url(), "helper", "helper", &imports, &paths);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_range.start.line, 0);
        assert_eq!(links[0].target_uri, doc_url());
    }

    #[test]
    fn same_file_function_without_implicit_args() {
        let text = "func main():\n    return ()\nend\n";
        let links = locate_definition(
            text,
            &doc_url(),
            "main",
            "main",
            &ImportTable::default(),
            &SearchPathSet::default(),
        );
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn imported_function_definition() {
        let f = fixture();
        let text = "from starkware.math import assert_not_zero\n";
        let imports = build_import_table(text).unwrap();
        let links = locate_definition(
            text,
            &doc_url(),
            "assert_not_zero",
            "assert_not_zero",
            &imports,
            &f.paths,
        );
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].target_uri.to_file_path().unwrap(),
            f.module_path
        );
        // declared on line 2 of the module
        assert_eq!(links[0].target_range.start.line, 2);
    }

    #[test]
    fn imported_struct_definition() {
        let f = fixture();
        let text = "from starkware.math import Uint256\n";
        let imports = build_import_table(text).unwrap();
        let links = locate_definition(text, &doc_url(), "Uint256", "Uint256", &imports, &f.paths);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_range.start.line, 11);
    }

    #[test]
    fn namespace_scoped_function_definition() {
        let f = fixture();
        let text = "from starkware.math import SafeMath\n";
        let imports = build_import_table(text).unwrap();
        // caret on the function half of SafeMath.add
        let links = locate_definition(text, &doc_url(), "SafeMath.add", "add", &imports, &f.paths);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_range.start.line, 17);
    }

    #[test]
    fn namespace_itself_resolves_to_declaration() {
        let f = fixture();
        let text = "from starkware.math import SafeMath\n";
        let imports = build_import_table(text).unwrap();
        // caret on the namespace half of SafeMath.add
        let links =
            locate_definition(text, &doc_url(), "SafeMath.add", "SafeMath", &imports, &f.paths);
        assert!(!links.is_empty());
        assert_eq!(links[0].target_range.start.line, 16);
    }

    #[test]
    fn module_name_links_to_whole_file() {
        let f = fixture();
        let text = "from starkware.math import assert_not_zero\n";
        let imports = build_import_table(text).unwrap();
        let links = locate_definition(
            text,
            &doc_url(),
            "starkware.math",
            "math",
            &imports,
            &f.paths,
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_range.start.line, 0);
        assert_eq!(links[0].target_range.end.line, 9999);
    }

    #[test]
    fn unresolved_word_yields_no_links() {
        let links = locate_definition(
            "func other():\nend\n",
            &doc_url(),
            "missing",
            "missing",
            &ImportTable::default(),
            &SearchPathSet::default(),
        );
        assert!(links.is_empty());
    }

    #[test]
    fn list_declarations_in_order_and_unique() {
        assert_eq!(
            list_declarations(MATH_MODULE),
            vec!["assert_not_zero", "assert_not_equal", "Uint256", "SafeMath", "add"]
        );
    }

    #[test]
    fn list_declarations_skips_lookalikes() {
        let text = "# func commented(x):\nfunctions_helper = 1\nfunc real(x):\nend\n";
        assert_eq!(list_declarations(text), vec!["real"]);
    }
}
