// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Compiler invocation and error-output decoding.
//!
//! The Cairo toolchain is an external collaborator: we hand it a source
//! snapshot and get back an exit status plus text. [`extract_diagnostics`] is
//! a small dedicated decoder for that text. Its grammar is contractually tied
//! to the toolchain's message shape:
//!
//! ```text
//! Command failed: cd /tmp/cairo-ls-5PZ7P0 && cairo-compile temp.cairo --output temp_compiled.json
//! temp.cairo:2:15: Unexpected token Token(IDENTIFIER, 'aa0'). Expected one of: ".", ";", "[", operator.
//!     [ap] = 100aa0; ap++
//!               ^*^
//! ```
//!
//! The first line is process framing and is discarded; the second carries
//! `path:line:col: message`; an optional caret row gives the problem width.
//! If the toolchain's output format changes, only this decoder changes.

use std::path::Path;

use lsp_types::{Position, Range};
use thiserror::Error;

/// Sentinel end line/column for diagnostics spanning the whole document.
const DOCUMENT_END: u32 = 9999;

const MULTI_SUGGESTION_PREFIX: &str = "Expected one of: ";
const SINGLE_SUGGESTION_PREFIX: &str = "Expected: ";

/// One decoded compiler error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub range: Range,
    pub message: String,
    /// Replacement tokens offered by the compiler, in its order.
    pub suggestions: Option<Vec<String>>,
}

/// Decode compiler output into structured errors.
///
/// Yields at most one element: the decoder recognizes the first error
/// occurrence per invocation. When no `path:line:col:` shape can be found the
/// error degenerates to a whole-document range so the user still sees that
/// compilation failed.
pub fn extract_diagnostics(raw: &str) -> Vec<ErrorLocation> {
    // Everything from the first newline on; the first line is framing.
    let Some(newline) = raw.find('\n') else {
        return Vec::new();
    };
    let body = &raw[newline..];

    // The fourth line is the caret pointer row, when present; its trimmed
    // width is the problem length.
    let lines: Vec<&str> = body.split('\n').collect();
    let problem_length = if lines.len() < 4 {
        tracing::debug!("could not determine problem length");
        None
    } else {
        Some(lines[3].trim().len())
    };

    let tokens: Vec<&str> = body.split(':').collect();
    let line_pos = tokens.get(1).and_then(|t| t.trim().parse::<u32>().ok());
    let char_pos = tokens.get(2).and_then(|t| t.trim().parse::<u32>().ok());

    let location = match (line_pos, char_pos) {
        (Some(line_pos), Some(char_pos)) => {
            // The actual message is everything after path, line and column.
            let message = tokens[3..].join(":");
            let suggestions = parse_suggestions(&message);

            // Compiler positions start at 1.
            let start = Position {
                line: line_pos.saturating_sub(1),
                character: char_pos.saturating_sub(1),
            };
            let end = match problem_length {
                Some(len) => Position {
                    line: line_pos.saturating_sub(1),
                    character: char_pos.saturating_sub(1) + len as u32,
                },
                None => Position {
                    line: line_pos,
                    character: 0,
                },
            };

            ErrorLocation {
                range: Range { start, end },
                message,
                suggestions,
            }
        }
        _ => {
            // No position found; a generic error highlights everything.
            let message = if tokens.len() > 1 {
                tokens[1..].join(":")
            } else {
                String::new()
            };
            ErrorLocation {
                range: Range {
                    start: Position {
                        line: 0,
                        character: 0,
                    },
                    end: Position {
                        line: DOCUMENT_END,
                        character: DOCUMENT_END,
                    },
                },
                message,
                suggestions: None,
            }
        }
    };

    vec![location]
}

/// Pull the compiler's replacement suggestions out of an error message.
///
/// `Expected one of: "a", "b", "c", operator.` yields `["a", "b", "c"]`; the
/// list runs to the last comma, which drops the closing `operator` catch-all.
/// `Expected: foo.` yields `["foo"]`. Surrounding quotes and the sentence's
/// trailing period are stripped.
fn parse_suggestions(message: &str) -> Option<Vec<String>> {
    let raw: &str = if let Some(index) = message.find(MULTI_SUGGESTION_PREFIX) {
        let list_start = index + MULTI_SUGGESTION_PREFIX.len();
        let list_end = message.rfind(',').filter(|&end| end > list_start)?;
        &message[list_start..list_end]
    } else if let Some(index) = message.find(SINGLE_SUGGESTION_PREFIX) {
        let start = index + SINGLE_SUGGESTION_PREFIX.len();
        let end = message[start..]
            .find('\n')
            .map(|n| start + n)
            .unwrap_or(message.len());
        &message[start..end]
    } else {
        return None;
    };

    let raw = raw.trim().trim_end_matches('.');
    let suggestions: Vec<String> = raw
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(token)
                .to_string()
        })
        .filter(|token| !token.is_empty())
        .collect();

    if suggestions.is_empty() {
        None
    } else {
        Some(suggestions)
    }
}

/// A candidate replacement edit derived from a diagnostic's suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickFix {
    pub title: String,
    pub range: Range,
    pub replacement: String,
}

/// One quick fix per suggestion per diagnostic.
pub fn build_quick_fixes(locations: &[ErrorLocation]) -> Vec<QuickFix> {
    let mut fixes = Vec::new();
    for location in locations {
        let Some(suggestions) = &location.suggestions else {
            continue;
        };
        for suggestion in suggestions {
            fixes.push(QuickFix {
                title: format!("Replace with {suggestion}"),
                range: location.range,
                replacement: suggestion.clone(),
            });
        }
    }
    fixes
}

/// Which toolchain compiles the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Cairo,
    Starknet,
}

impl Toolchain {
    pub fn command(self) -> &'static str {
        match self {
            Toolchain::Cairo => "cairo-compile",
            Toolchain::Starknet => "starknet-compile",
        }
    }
}

/// Settings slice the compiler engine needs.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// `"cairo"`, `"starknet"` or `"autodetect"`.
    pub highlighting_compiler: String,
    pub use_venv: bool,
    pub venv_command: String,
    pub nile_use_venv: bool,
    pub nile_venv_command: String,
}

/// Captured result of one compile run.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// The full shell command, for the failure blob's framing line.
    pub command: String,
}

impl CompileOutput {
    /// The text handed to [`extract_diagnostics`] on failure. The framing
    /// line mirrors what a failed shell invocation reports.
    pub fn failure_blob(&self) -> String {
        format!("Command failed: {}\n{}", self.command, self.stderr)
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to run compile shell: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Wraps the `cairo-compile`/`starknet-compile` toolchain.
pub struct CompilerEngine;

impl CompilerEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pick the toolchain: explicit setting, or sniff the directive block at
    /// the top of the document for `%lang starknet`.
    pub fn select_toolchain(config: &CompilerConfig, source: &str) -> Toolchain {
        match config.highlighting_compiler.as_str() {
            "starknet" => return Toolchain::Starknet,
            "cairo" => return Toolchain::Cairo,
            _ => {}
        }

        let mut directives_found = false;
        for raw in source.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('%') {
                directives_found = true;
                if line == "%lang starknet" {
                    return Toolchain::Starknet;
                }
            } else if directives_found {
                // End of directives.
                break;
            }
        }
        Toolchain::Cairo
    }

    /// The venv activation prefix, `<command> && ` or empty.
    ///
    /// The nile venv is probed first; when activating it fails we fall back
    /// to the plain cairo venv command without probing.
    pub async fn command_prefix(&self, config: &CompilerConfig) -> String {
        if config.nile_use_venv && !config.nile_venv_command.is_empty() {
            if shell_succeeds(&config.nile_venv_command).await {
                return format!("{} && ", config.nile_venv_command);
            }
            tracing::debug!("could not source nile venv");
        }
        if config.use_venv && !config.venv_command.is_empty() {
            return format!("{} && ", config.venv_command);
        }
        String::new()
    }

    /// Assemble the compile command for a snapshot inside the temp folder.
    pub fn compile_command(
        toolchain: Toolchain,
        cairo_path: &[std::path::PathBuf],
        source_name: &str,
        output_name: &str,
    ) -> String {
        let mut cairo_path_param = String::new();
        if !cairo_path.is_empty() {
            let joined = cairo_path
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(":");
            cairo_path_param = format!("--cairo_path={joined} ");
        }
        format!(
            "{} {cairo_path_param}{source_name} --output {output_name}",
            toolchain.command()
        )
    }

    /// Run a compile of `source_name` inside `work_dir`.
    ///
    /// `source` is the snapshot's content, used only for toolchain
    /// autodetection; the file itself must already exist in `work_dir`.
    pub async fn compile(
        &self,
        config: &CompilerConfig,
        work_dir: &Path,
        source_name: &str,
        output_name: &str,
        cairo_path: &[std::path::PathBuf],
        source: &str,
    ) -> Result<CompileOutput, CompileError> {
        let toolchain = Self::select_toolchain(config, source);
        tracing::debug!("running {} compile", toolchain.command());

        let prefix = self.command_prefix(config).await;
        let compile = Self::compile_command(toolchain, cairo_path, source_name, output_name);
        let command = format!("{prefix}cd {} && {compile}", work_dir.display());

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .await?;

        Ok(CompileOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command,
        })
    }
}

impl Default for CompilerEngine {
    fn default() -> Self {
        Self::new()
    }
}

async fn shell_succeeds(command: &str) -> bool {
    match tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PARSE_ERROR: &str = "Command failed: cd /tmp/cairo-ls-5PZ7P0 && cairo-compile temp.cairo --output temp_compiled.json\ntemp.cairo:2:15: Unexpected token Token(IDENTIFIER, 'aa0'). Expected one of: \"a\", \"b\", \"c\", operator.\n    [ap]=x\n      ^^^\n";

    #[test]
    fn positioned_error_with_suggestions() {
        let locations = extract_diagnostics(PARSE_ERROR);
        assert_eq!(locations.len(), 1);
        let location = &locations[0];

        assert_eq!(location.range.start, Position { line: 1, character: 14 });
        assert_eq!(location.range.end, Position { line: 1, character: 17 });
        assert!(location.message.contains("Unexpected token"));
        assert_eq!(
            location.suggestions,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn missing_pointer_row_spans_to_next_line() {
        let raw = "Command failed: cairo-compile\ntemp.cairo:4:3: mismatch between actual and declared return type";
        let locations = extract_diagnostics(raw);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].range.start, Position { line: 3, character: 2 });
        assert_eq!(locations[0].range.end, Position { line: 4, character: 0 });
        assert!(locations[0].suggestions.is_none());
    }

    #[test]
    fn single_suggestion_form() {
        let raw = "Command failed: cairo-compile\ntemp.cairo:7:1: Unexpected token. Expected: \"end\".\n    foo\n    ^^^\n";
        let locations = extract_diagnostics(raw);
        assert_eq!(locations[0].suggestions, Some(vec!["end".to_string()]));
    }

    #[test]
    fn unparseable_output_becomes_generic_error() {
        let raw = "Command failed: cairo-compile\nTraceback (most recent call last); something broke";
        let locations = extract_diagnostics(raw);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].range.start, Position { line: 0, character: 0 });
        assert_eq!(
            locations[0].range.end,
            Position { line: 9999, character: 9999 }
        );
    }

    #[test]
    fn output_without_newline_yields_nothing() {
        assert!(extract_diagnostics("no newline here").is_empty());
    }

    #[test]
    fn quick_fix_per_suggestion() {
        let locations = extract_diagnostics(PARSE_ERROR);
        let fixes = build_quick_fixes(&locations);
        assert_eq!(fixes.len(), 3);
        assert_eq!(fixes[0].title, "Replace with a");
        assert_eq!(fixes[0].replacement, "a");
        assert_eq!(fixes[0].range, locations[0].range);
        assert_eq!(fixes[2].replacement, "c");
    }

    #[test]
    fn quick_fixes_skip_diagnostics_without_suggestions() {
        let raw = "Command failed: cairo-compile\ntemp.cairo:1:1: something else entirely\n";
        let fixes = build_quick_fixes(&extract_diagnostics(raw));
        assert!(fixes.is_empty());
    }

    fn config(compiler: &str) -> CompilerConfig {
        CompilerConfig {
            highlighting_compiler: compiler.to_string(),
            use_venv: false,
            venv_command: String::new(),
            nile_use_venv: false,
            nile_venv_command: String::new(),
        }
    }

    #[test]
    fn toolchain_autodetects_starknet_directive() {
        let source = "# contract\n%builtins pedersen\n%lang starknet\nfunc f():\nend\n";
        assert_eq!(
            CompilerEngine::select_toolchain(&config("autodetect"), source),
            Toolchain::Starknet
        );
    }

    #[test]
    fn toolchain_defaults_to_cairo() {
        let source = "%builtins output\n\nfunc main():\n    ret\nend\n";
        assert_eq!(
            CompilerEngine::select_toolchain(&config("autodetect"), source),
            Toolchain::Cairo
        );
    }

    #[test]
    fn toolchain_setting_overrides_detection() {
        let source = "%lang starknet\n";
        assert_eq!(
            CompilerEngine::select_toolchain(&config("cairo"), source),
            Toolchain::Cairo
        );
        assert_eq!(
            CompilerEngine::select_toolchain(&config("starknet"), ""),
            Toolchain::Starknet
        );
    }

    #[test]
    fn compile_command_includes_cairo_path() {
        let roots = vec![PathBuf::from("/ws/contracts"), PathBuf::from("/ws/lib")];
        let command =
            CompilerEngine::compile_command(Toolchain::Cairo, &roots, "temp0.cairo", "out0.json");
        assert_eq!(
            command,
            "cairo-compile --cairo_path=/ws/contracts:/ws/lib temp0.cairo --output out0.json"
        );
    }

    #[test]
    fn compile_command_without_roots() {
        let command =
            CompilerEngine::compile_command(Toolchain::Starknet, &[], "temp1.cairo", "out1.json");
        assert_eq!(command, "starknet-compile temp1.cairo --output out1.json");
    }

    #[tokio::test]
    async fn venv_prefix_without_venv_is_empty() {
        let engine = CompilerEngine::new();
        assert_eq!(engine.command_prefix(&config("cairo")).await, "");
    }

    #[tokio::test]
    async fn plain_venv_prefix_is_not_probed() {
        let engine = CompilerEngine::new();
        let mut config = config("cairo");
        config.use_venv = true;
        config.venv_command = ". ~/cairo_venv/bin/activate".to_string();
        assert_eq!(
            engine.command_prefix(&config).await,
            ". ~/cairo_venv/bin/activate && "
        );
    }

    #[test]
    fn failure_blob_has_framing_line() {
        let output = CompileOutput {
            success: false,
            stdout: String::new(),
            stderr: "temp.cairo:1:1: boom\n".to_string(),
            command: "cd /tmp && cairo-compile temp.cairo --output o.json".to_string(),
        };
        let blob = output.failure_blob();
        assert!(blob.starts_with("Command failed: cd /tmp"));
        let locations = extract_diagnostics(&blob);
        assert_eq!(locations[0].range.start, Position { line: 0, character: 0 });
        assert_eq!(locations[0].message, " boom\n");
    }
}
