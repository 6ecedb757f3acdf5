// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Import table construction.
//!
//! Scans the top of a document for `from <module> import <names>` statements,
//! including the multi-line parenthesized form, and maps each imported name to
//! the module it came from. Imports are assumed contiguous at the top of the
//! file (blank lines and comments allowed in between); the scan stops at the
//! first other line once imports have begun.

/// One imported name and the dotted module it originates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub name: String,
    pub module: String,
}

/// Insertion-ordered mapping from imported name to origin module.
///
/// Rebuilt from scratch on every request that needs it; a name imported twice
/// keeps its first position but takes the later module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    entries: Vec<ImportEntry>,
}

impl ImportTable {
    fn insert(&mut self, name: &str, module: &str) {
        if name.is_empty() {
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.module = module.to_string();
        } else {
            self.entries.push(ImportEntry {
                name: name.to_string(),
                module: module.to_string(),
            });
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.module.as_str())
    }

    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the import table for a document snapshot.
///
/// Returns `None` when a `from` line violates the minimum token contract
/// (`from <module> import <name>...`); callers treat that as "no import-based
/// results" rather than an error.
pub fn build_import_table(text: &str) -> Option<ImportTable> {
    let mut table = ImportTable::default();
    let mut from_found = false;
    // Module of a `from m import (` list whose `)` has not been seen yet.
    let mut open_module: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("from") {
            from_found = true;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 4 || tokens[0] != "from" || tokens[2] != "import" {
                tracing::debug!("could not parse import: {line}");
                return None;
            }
            let module = tokens[1];
            for token in &tokens[3..] {
                if token.contains('(') {
                    // Names continue on the following lines.
                    open_module = Some(module.to_string());
                    break;
                }
                table.insert(token.trim_end_matches(','), module);
            }
        } else if from_found {
            if let Some(module) = open_module.clone() {
                for token in line.split_whitespace() {
                    let name = token.trim_end_matches(',');
                    if name != ")" {
                        table.insert(name, &module);
                    }
                }
                if line.contains(')') {
                    open_module = None;
                }
            } else {
                // End of the import region.
                break;
            }
        }
    }

    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules_of(table: &ImportTable) -> Vec<(&str, &str)> {
        table
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), e.module.as_str()))
            .collect()
    }

    #[test]
    fn single_line_import() {
        let table = build_import_table("from contracts.Initializable import initialized, initialize\n").unwrap();
        assert_eq!(
            modules_of(&table),
            vec![
                ("initialized", "contracts.Initializable"),
                ("initialize", "contracts.Initializable"),
            ]
        );
    }

    #[test]
    fn multi_line_import() {
        let text = "from starkware.cairo.common.math import (\n    assert_not_zero,\n    assert_not_equal\n)\n";
        let table = build_import_table(text).unwrap();
        assert_eq!(
            modules_of(&table),
            vec![
                ("assert_not_zero", "starkware.cairo.common.math"),
                ("assert_not_equal", "starkware.cairo.common.math"),
            ]
        );
        // the bracket itself is never recorded as a name
        assert!(table.get("(").is_none());
        assert!(table.get(")").is_none());
    }

    #[test]
    fn imports_after_directives_and_comments() {
        let text = "%lang starknet\n\n# storage helpers\nfrom contracts.storage import read_value\n";
        let table = build_import_table(text).unwrap();
        assert_eq!(table.get("read_value"), Some("contracts.storage"));
    }

    #[test]
    fn scan_stops_after_import_region() {
        let text = "from a.b import c\n\nfunc c_shadow():\n    return ()\nend\nfrom x.y import z\n";
        let table = build_import_table(text).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("z").is_none());
    }

    #[test]
    fn malformed_import_aborts_build() {
        assert!(build_import_table("from onlymodule\n").is_none());
        assert!(build_import_table("from a.b exports c\n").is_none());
    }

    #[test]
    fn reimported_name_takes_last_module() {
        let text = "from a.b import f\nfrom c.d import f\n";
        let table = build_import_table(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("f"), Some("c.d"));
    }

    #[test]
    fn multi_line_mode_ends_with_closing_bracket() {
        let text = "from a.b import (\n    one,\n    two\n)\nfunc after():\n    return ()\nend\n";
        let table = build_import_table(text).unwrap();
        assert_eq!(
            modules_of(&table),
            vec![("one", "a.b"), ("two", "a.b")]
        );
        assert!(table.get("after").is_none());
    }
}
