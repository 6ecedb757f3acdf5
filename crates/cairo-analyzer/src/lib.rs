// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Cairo Analyzer - Analysis engines for the Cairo LSP
//!
//! Cairo has no embeddable compiler frontend, so everything here is a
//! heuristic, single-pass, line-oriented text scan:
//! - Word extraction: the identifier under the caret
//! - Context classification: what syntax surrounds the caret
//! - Import table: `from <module> import <names>` statements
//! - Module resolution: dotted names against the package search paths
//! - Definition lookup: declarations in the current file and imported modules
//! - Diagnostics: wraps the `cairo-compile`/`starknet-compile` toolchain and
//!   decodes its error output, including quick-fix suggestions

pub mod context;
pub mod definition;
pub mod diagnostics;
pub mod imports;
pub mod resolver;
pub mod word;

pub use context::{classify, SyntaxContext};
pub use definition::{list_declarations, locate_definition};
pub use diagnostics::{
    build_quick_fixes, extract_diagnostics, CompileError, CompileOutput, CompilerConfig,
    CompilerEngine, ErrorLocation, QuickFix, Toolchain,
};
pub use imports::{build_import_table, ImportEntry, ImportTable};
pub use resolver::{
    append_source_dir, default_package_root, detect_package_root, detect_source_dir,
    find_completions, resolve_module, SearchPathSet,
};
pub use word::{extract_word, starts_with_word, word_pair};
