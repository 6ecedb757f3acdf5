//! The main Language Server implementation.
//!
//! # LSP Lifecycle
//!
//! 1. Editor starts our binary and sends `initialize` request
//! 2. We respond with our capabilities (what features we support)
//! 3. Editor sends `initialized` notification (handshake complete)
//! 4. Normal operation: file events, requests flow both directions
//! 5. Editor sends `shutdown` request, we respond, then `exit` notification

mod keywords;
mod settings;
mod state;

pub use settings::CairoLsSettings;
pub use state::Document;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use cairo_analyzer::{
    build_import_table, build_quick_fixes, classify, extract_diagnostics, find_completions,
    list_declarations, locate_definition, resolve_module, resolver, word_pair, CompilerEngine,
    ErrorLocation, SearchPathSet, SyntaxContext,
};
use dashmap::DashMap;
use lsp_types::*;
use ropey::Rope;
use tempfile::TempDir;
use tower_lsp::jsonrpc::Result;
use tower_lsp::{Client, LanguageServer};

/// Diagnostic source name shown in the editor.
const NAME: &str = "Cairo LS";

/// Diagnostic code prefix; pending quick-fix suggestions are appended to it
/// so the code-action pass can decode them without extra state.
const DIAGNOSTIC_TYPE_COMPILE_ERROR: &str = "CompileError";

/// How long to let the user keep typing before a compile is kicked off.
const VALIDATION_DEBOUNCE: Duration = Duration::from_millis(500);

const TEMP_FILE_PREFIX: &str = "temp";
const TEMP_FILE_SUFFIX: &str = ".cairo";

/// The Cairo Language Server.
pub struct CairoLanguageServer {
    /// The LSP client - used to send messages TO the editor (e.g., diagnostics).
    client: Client,

    /// Everything shared with spawned validation tasks.
    state: Arc<ServerState>,
}

/// Server-side state, shared between request handlers and background
/// validation tasks.
pub(crate) struct ServerState {
    /// Open documents, keyed by their URI.
    documents: DashMap<String, Document>,

    /// The engine wrapping the cairo-compile/starknet-compile toolchain.
    compiler: CompilerEngine,

    /// Current `cairols` settings.
    settings: RwLock<CairoLsSettings>,

    /// Workspace roots (as filesystem paths, captured at initialize).
    workspace_folders: Mutex<Vec<PathBuf>>,

    /// Lazily computed package search paths. `None` means "recompute on next
    /// use"; configuration and workspace-folder changes reset it.
    search_paths: Mutex<Option<SearchPathSet>>,

    /// Lifetime temp folder for compile snapshots. `None` when creating it
    /// failed at startup; diagnostics are then unavailable.
    temp_dir: Option<TempDir>,

    /// Pending debounced validation tasks, keyed by URI.
    pending_validations: DashMap<String, tokio::task::JoinHandle<()>>,

    /// Whether the client understands diagnostic related information.
    related_information: AtomicBool,
}

impl CairoLanguageServer {
    /// Create a new language server instance.
    pub fn new(client: Client) -> Self {
        let temp_dir = match tempfile::Builder::new().prefix("cairo-ls-").tempdir() {
            Ok(dir) => {
                tracing::info!("temp folder: {}", dir.path().display());
                Some(dir)
            }
            Err(e) => {
                tracing::error!("failed to create temp folder, diagnostics disabled: {e}");
                None
            }
        };

        Self {
            client,
            state: Arc::new(ServerState {
                documents: DashMap::new(),
                compiler: CompilerEngine::new(),
                settings: RwLock::new(CairoLsSettings::default()),
                workspace_folders: Mutex::new(Vec::new()),
                search_paths: Mutex::new(None),
                temp_dir,
                pending_validations: DashMap::new(),
                related_information: AtomicBool::new(false),
            }),
        }
    }

    /// Queue a validation of `uri`, replacing any pending one.
    ///
    /// The generation captured here decides whether the compile result is
    /// still current when it arrives.
    fn spawn_validation(&self, uri: Url, generation: u64, delay: Duration) {
        let uri_string = uri.to_string();
        if let Some((_, handle)) = self.state.pending_validations.remove(&uri_string) {
            handle.abort();
        }

        let client = self.client.clone();
        let state = self.state.clone();
        let pending_key = uri_string.clone();

        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            validate_document(client, state.clone(), uri, generation).await;
            state.pending_validations.remove(&pending_key);
        });
        self.state.pending_validations.insert(uri_string, handle);
    }
}

impl ServerState {
    /// Workspace roots extended with their source sub-directory; this is the
    /// compiler's `--cairo_path`.
    fn compile_roots(&self, settings: &CairoLsSettings) -> Vec<PathBuf> {
        self.workspace_folders
            .lock()
            .unwrap()
            .iter()
            .map(|folder| resolver::append_source_dir(folder, settings.source_dir.as_deref()))
            .collect()
    }

    /// The package search paths, computed on first use and cached until a
    /// configuration or workspace change invalidates them.
    async fn search_paths(&self) -> SearchPathSet {
        if let Some(paths) = self.search_paths.lock().unwrap().clone() {
            return paths;
        }

        let settings = self.settings.read().unwrap().clone();
        let prefix = self
            .compiler
            .command_prefix(&settings.compiler_config())
            .await;
        let package_root = resolver::detect_package_root(&prefix).await;

        let mut roots = self.compile_roots(&settings);
        roots.push(package_root);
        let paths = SearchPathSet::new(roots);
        tracing::info!("package search paths: {}", paths.join());

        *self.search_paths.lock().unwrap() = Some(paths.clone());
        paths
    }

    fn invalidate_search_paths(&self) {
        *self.search_paths.lock().unwrap() = None;
    }

    /// Convert a decoded compiler error into an LSP diagnostic.
    fn to_diagnostic(&self, uri: &Url, location: ErrorLocation) -> Diagnostic {
        let code = match &location.suggestions {
            Some(suggestions) => {
                format!("{DIAGNOSTIC_TYPE_COMPILE_ERROR}{}", suggestions.join(","))
            }
            None => DIAGNOSTIC_TYPE_COMPILE_ERROR.to_string(),
        };

        let related_information = self
            .related_information
            .load(Ordering::Relaxed)
            .then(|| {
                vec![DiagnosticRelatedInformation {
                    location: Location {
                        uri: uri.clone(),
                        range: location.range,
                    },
                    message: "Cairo compilation encountered an error.".to_string(),
                }]
            });

        Diagnostic {
            range: location.range,
            severity: Some(DiagnosticSeverity::ERROR),
            code: Some(NumberOrString::String(code)),
            source: Some(NAME.to_string()),
            message: location.message,
            related_information,
            ..Default::default()
        }
    }
}

/// Compile the document's current content and publish the diagnostics.
///
/// The snapshot is written into the server's temp folder, compiled there, and
/// cleaned up afterwards; cleanup failures are logged and ignored. A result
/// whose generation no longer matches the document is dropped: a newer edit
/// has superseded it and its diagnostics would be misleading.
async fn validate_document(client: Client, state: Arc<ServerState>, uri: Url, generation: u64) {
    let uri_string = uri.to_string();
    let Some(content) = state
        .documents
        .get(&uri_string)
        .map(|doc| doc.content.to_string())
    else {
        return;
    };

    let settings = state.settings.read().unwrap().clone();
    let Some(temp_dir) = state.temp_dir.as_ref() else {
        tracing::warn!("no temp folder, skipping diagnostics for {uri_string}");
        return;
    };

    let source_name = format!("{TEMP_FILE_PREFIX}{generation}{TEMP_FILE_SUFFIX}");
    let output_name = format!("temp_compiled{generation}.json");
    let source_path = temp_dir.path().join(&source_name);

    if let Err(e) = tokio::fs::write(&source_path, &content).await {
        tracing::error!("failed to write temp source file: {e}");
        return;
    }

    let cairo_path = state.compile_roots(&settings);
    let result = state
        .compiler
        .compile(
            &settings.compiler_config(),
            temp_dir.path(),
            &source_name,
            &output_name,
            &cairo_path,
            &content,
        )
        .await;

    // Cleanup must never block diagnostic delivery.
    if let Err(e) = std::fs::remove_file(&source_path) {
        tracing::debug!("could not delete temp file {}: {e}", source_path.display());
    }
    let output_path = temp_dir.path().join(&output_name);
    if let Err(e) = std::fs::remove_file(&output_path) {
        tracing::trace!("could not delete temp file {}: {e}", output_path.display());
    }

    let current = state.documents.get(&uri_string).map(|doc| doc.generation);
    if current != Some(generation) {
        tracing::debug!(
            "got compile result for generation {generation} but document is at {current:?}"
        );
        return;
    }

    let mut diagnostics = Vec::new();
    match result {
        Ok(output) if !output.success => {
            let blob = output.failure_blob();
            tracing::debug!("found compile error: {blob}");
            for location in extract_diagnostics(&blob)
                .into_iter()
                .take(settings.max_number_of_problems)
            {
                diagnostics.push(state.to_diagnostic(&uri, location));
            }
        }
        Ok(output) => {
            tracing::trace!("compiler output: {}", output.stdout);
        }
        Err(e) => {
            tracing::error!("failed to run compiler: {e}");
        }
    }

    client.publish_diagnostics(uri, diagnostics, None).await;
}

/// Line `line` of the rope, including its trailing newline.
fn line_text(rope: &Rope, line: u32) -> Option<String> {
    let line = line as usize;
    if line >= rope.len_lines() {
        return None;
    }
    Some(rope.line(line).to_string())
}

/// The caret's line from its start up to the caret.
fn line_prefix(rope: &Rope, position: Position) -> Option<String> {
    let text = line_text(rope, position.line)?;
    let chars: Vec<char> = text.chars().collect();
    let cut = (position.character as usize).min(chars.len());
    Some(chars[..cut].iter().collect())
}

/// Document text from the start up to the caret.
fn text_up_to(rope: &Rope, position: Position) -> String {
    let line = (position.line as usize).min(rope.len_lines().saturating_sub(1));
    let index = (rope.line_to_char(line) + position.character as usize).min(rope.len_chars());
    rope.slice(..index).to_string()
}

/// The whitespace-delimited token fragments just before and after the caret.
fn around_cursor(rope: &Rope, position: Position) -> Option<(String, String)> {
    let text = line_text(rope, position.line)?;
    let chars: Vec<char> = text.chars().collect();
    let cut = (position.character as usize).min(chars.len());

    let prefix: String = chars[..cut].iter().collect();
    let suffix: String = chars[cut..].iter().collect();

    // a trailing separator must yield an empty fragment, so no
    // split_whitespace here
    let before = prefix
        .split(|c: char| c.is_whitespace())
        .last()
        .unwrap_or("")
        .to_string();
    let after = suffix
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_string();
    Some((before, after))
}

/// A completion item that replaces the word fragments around the caret.
fn replacement_item(
    position: Position,
    new_text: &str,
    label: &str,
    before: &str,
    after: &str,
) -> CompletionItem {
    let start = Position {
        line: position.line,
        character: position.character.saturating_sub(before.chars().count() as u32),
    };
    let end = Position {
        line: position.line,
        character: position.character + after.chars().count() as u32,
    };
    CompletionItem {
        label: label.to_string(),
        kind: Some(CompletionItemKind::MODULE),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: Range { start, end },
            new_text: new_text.to_string(),
        })),
        sort_text: Some("0".to_string()),
        ..Default::default()
    }
}

/// Module named by the nearest `from <module> import (` statement above the
/// caret whose parenthesis is still open.
fn open_import_module(text_up_to_cursor: &str) -> Option<String> {
    let import_open = regex::Regex::new(r"(?m)^from[ \t]+([A-Za-z0-9._]+)[ \t]+import[ \t]*\(")
        .ok()?;
    for captures in import_open.captures_iter(text_up_to_cursor) {
        let whole = captures.get(0)?;
        if !text_up_to_cursor[whole.end()..].contains(')') {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// Markdown documentation for the hovered keyword, if we have any.
fn keyword_markdown(word: &str) -> Option<String> {
    let body = match word {
        "func" => {
            "A function is a reusable unit of code that receives arguments and returns a value. \
             The compiler supports high-level syntax for calls and returns: `foo(...)` and \
             `return (...)`."
        }
        "felt" => {
            "The field element is Cairo's native numeric type: an integer modulo a large prime. \
             Arithmetic wraps around the prime rather than a power of two."
        }
        "namespace" => {
            "A named scope for functions and constants. Members are referenced as \
             `Namespace.member` and become importable through the enclosing module."
        }
        "with_attr" => {
            "Attaches an error message to a block; when an assert inside the block fails, the \
             message is reported.\n\n```cairo\nwith_attr error_message(\"balance too low\"):\n    \
             assert_le(amount, balance)\nend\n```"
        }
        _ => return None,
    };
    Some(format!("### {word}\n{body}"))
}

/// Implementation of the Language Server Protocol.
#[tower_lsp::async_trait]
impl LanguageServer for CairoLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("received initialize request");

        let mut folders: Vec<PathBuf> = Vec::new();
        if let Some(workspace_folders) = &params.workspace_folders {
            for folder in workspace_folders {
                if let Ok(path) = folder.uri.to_file_path() {
                    folders.push(path);
                }
            }
        }
        if folders.is_empty() {
            #[allow(deprecated)]
            if let Some(root) = &params.root_uri {
                if let Ok(path) = root.to_file_path() {
                    folders.push(path);
                }
            }
        }
        tracing::info!("workspace folders: {folders:?}");
        *self.state.workspace_folders.lock().unwrap() = folders;

        let related_information = params
            .capabilities
            .text_document
            .as_ref()
            .and_then(|text_document| text_document.publish_diagnostics.as_ref())
            .and_then(|publish| publish.related_information)
            .unwrap_or(false);
        self.state
            .related_information
            .store(related_information, Ordering::Relaxed);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..Default::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(true),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                        ..Default::default()
                    },
                )),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "cairo-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("server initialized - handshake complete");
        self.client
            .log_message(MessageType::INFO, "Cairo LS ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutdown requested");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("document opened: {uri}");

        let rope = Rope::from_str(&params.text_document.text);
        self.state.documents.insert(
            uri.to_string(),
            Document {
                content: rope,
                version: params.text_document.version,
                generation: 0,
            },
        );

        self.spawn_validation(uri, 0, Duration::ZERO);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let uri_string = uri.to_string();

        let mut generation = 0;
        if let Some(mut doc) = self.state.documents.get_mut(&uri_string) {
            for change in params.content_changes {
                if let Some(range) = change.range {
                    let start_line = range.start.line as usize;
                    let start_char = range.start.character as usize;
                    let end_line = range.end.line as usize;
                    let end_char = range.end.character as usize;

                    let start_idx = doc.content.line_to_char(start_line) + start_char;
                    let end_idx = doc.content.line_to_char(end_line) + end_char;

                    doc.content.remove(start_idx..end_idx);
                    doc.content.insert(start_idx, &change.text);
                } else {
                    doc.content = Rope::from_str(&change.text);
                }
            }
            doc.version = params.text_document.version;
            doc.generation += 1;
            generation = doc.generation;
        } else {
            return;
        }

        self.spawn_validation(uri, generation, VALIDATION_DEBOUNCE);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let generation = match self.state.documents.get(&uri.to_string()) {
            Some(doc) => doc.generation,
            None => return,
        };
        self.spawn_validation(uri, generation, Duration::ZERO);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let uri_string = uri.to_string();

        if let Some((_, handle)) = self.state.pending_validations.remove(&uri_string) {
            handle.abort();
        }
        self.state.documents.remove(&uri_string);

        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings = CairoLsSettings::from_notification(&params.settings);
        tracing::info!("configuration changed");
        *self.state.settings.write().unwrap() = settings;
        self.state.invalidate_search_paths();

        // Revalidate all open text documents.
        let open: Vec<(Url, u64)> = self
            .state
            .documents
            .iter()
            .filter_map(|entry| {
                Url::parse(entry.key())
                    .ok()
                    .map(|uri| (uri, entry.value().generation))
            })
            .collect();
        for (uri, generation) in open {
            self.spawn_validation(uri, generation, Duration::ZERO);
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        tracing::info!("workspace folder change event received");
        {
            let mut folders = self.state.workspace_folders.lock().unwrap();
            for removed in &params.event.removed {
                if let Ok(path) = removed.uri.to_file_path() {
                    folders.retain(|folder| folder != &path);
                }
            }
            for added in &params.event.added {
                if let Ok(path) = added.uri.to_file_path() {
                    if !folders.contains(&path) {
                        folders.push(path);
                    }
                }
            }
        }
        self.state.invalidate_search_paths();
    }

    async fn did_change_watched_files(&self, _params: DidChangeWatchedFilesParams) {
        tracing::debug!("received a watched-file change event");
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;

        let rope = match self.state.documents.get(&uri.to_string()) {
            Some(doc) => doc.content.clone(),
            None => return Ok(None),
        };

        let settings = self.state.settings.read().unwrap().clone();
        let compiler = if settings.highlighting_compiler == "autodetect" {
            let first_line = line_text(&rope, 0).unwrap_or_default();
            if first_line.starts_with("%lang starknet") {
                "starknet".to_string()
            } else {
                "cairo".to_string()
            }
        } else {
            settings.highlighting_compiler.clone()
        };

        let text_up_to_cursor = text_up_to(&rope, position);
        let line_up_to_cursor = line_prefix(&rope, position).unwrap_or_default();
        let context = classify(&text_up_to_cursor, &line_up_to_cursor);
        tracing::debug!("completion context: {context:?}");

        let mut items: Vec<CompletionItem> = Vec::new();
        match context {
            SyntaxContext::Base => {
                items.extend(keywords::base_keywords());
                if compiler == "starknet" {
                    items.extend(keywords::starknet_keywords());
                }
            }

            SyntaxContext::Function => items.extend(keywords::function_keywords()),

            SyntaxContext::FunctionDecl | SyntaxContext::WithAttr => {}

            SyntaxContext::ImportModule => {
                if let Some((before, after)) = around_cursor(&rope, position) {
                    let paths = self.state.search_paths().await;
                    for package in find_completions(&before, &paths) {
                        items.push(replacement_item(position, &package, &package, &before, &after));
                    }
                }
            }

            SyntaxContext::ImportKeyword => {
                if let Some((before, after)) = around_cursor(&rope, position) {
                    items.push(replacement_item(position, "import", "import", &before, &after));
                }
            }

            SyntaxContext::ImportFunction => {
                if let Some((before, after)) = around_cursor(&rope, position) {
                    let module = line_up_to_cursor
                        .split_whitespace()
                        .nth(1)
                        .map(str::to_string);
                    tracing::debug!("module: {module:?}");
                    if let Some(module) = module {
                        let paths = self.state.search_paths().await;
                        if let Some((_url, path)) = resolve_module(&module, &paths) {
                            match std::fs::read_to_string(&path) {
                                Ok(contents) => {
                                    for name in list_declarations(&contents) {
                                        items.push(replacement_item(
                                            position, &name, &name, &before, &after,
                                        ));
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        "could not read module {}: {e}",
                                        path.display()
                                    );
                                }
                            }
                        }
                    }
                }
            }

            SyntaxContext::ImportFunctionParenthesized => {
                match open_import_module(&text_up_to_cursor) {
                    Some(module) => {
                        let paths = self.state.search_paths().await;
                        if let Some((_url, path)) = resolve_module(&module, &paths) {
                            if let Ok(contents) = std::fs::read_to_string(&path) {
                                for name in list_declarations(&contents) {
                                    // Replacement bounds are unreliable across
                                    // multiple lines; plain items are enough.
                                    items.push(CompletionItem {
                                        label: name,
                                        kind: Some(CompletionItemKind::MODULE),
                                        sort_text: Some("0".to_string()),
                                        ..Default::default()
                                    });
                                }
                            }
                        }
                    }
                    None => tracing::debug!("couldn't find module of open import list"),
                }
            }
        }

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn completion_resolve(&self, mut item: CompletionItem) -> Result<CompletionItem> {
        if item.documentation.is_none() {
            if let Some(CompletionTextEdit::Edit(edit)) = &item.text_edit {
                item.documentation = Some(Documentation::String(edit.new_text.clone()));
            }
        }
        Ok(item)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;

        let rope = match self.state.documents.get(&uri.to_string()) {
            Some(doc) => doc.content.clone(),
            None => return Ok(None),
        };
        let Some(text) = line_text(&rope, position.line) else {
            return Ok(None);
        };
        let index = (position.character as usize).min(text.chars().count());

        let (word_with_dot, word) = word_pair(&text, index);
        for candidate in [word_with_dot, word] {
            if let Some(markdown) = keyword_markdown(&candidate) {
                return Ok(Some(Hover {
                    contents: HoverContents::Markup(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value: markdown,
                    }),
                    range: None,
                }));
            }
        }
        Ok(None)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;

        let rope = match self.state.documents.get(&uri.to_string()) {
            Some(doc) => doc.content.clone(),
            None => return Ok(None),
        };
        let Some(line) = line_text(&rope, position.line) else {
            return Ok(None);
        };
        let index = (position.character as usize).min(line.chars().count());
        let (word_with_dot, word) = word_pair(&line, index);
        if word_with_dot.is_empty() {
            return Ok(None);
        }

        let content = rope.to_string();
        let paths = self.state.search_paths().await;
        // A malformed import line yields an empty table; the same-file pass
        // still runs.
        let imports = build_import_table(&content).unwrap_or_default();
        tracing::debug!("imports map size: {}", imports.len());

        let links = locate_definition(&content, &uri, &word_with_dot, &word, &imports, &paths);
        if links.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GotoDefinitionResponse::Link(links)))
        }
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let mut actions: CodeActionResponse = Vec::new();

        for diagnostic in &params.context.diagnostics {
            let Some(NumberOrString::String(code)) = &diagnostic.code else {
                continue;
            };
            let Some(encoded) = code.strip_prefix(DIAGNOSTIC_TYPE_COMPILE_ERROR) else {
                continue;
            };
            if encoded.is_empty() {
                continue;
            }

            let location = ErrorLocation {
                range: diagnostic.range,
                message: diagnostic.message.clone(),
                suggestions: Some(
                    encoded
                        .split(',')
                        .map(|suggestion| suggestion.trim().to_string())
                        .filter(|suggestion| !suggestion.is_empty())
                        .collect(),
                ),
            };

            for fix in build_quick_fixes(&[location]) {
                let mut changes = HashMap::new();
                changes.insert(
                    uri.clone(),
                    vec![TextEdit {
                        range: fix.range,
                        new_text: fix.replacement,
                    }],
                );
                actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                    title: fix.title,
                    kind: Some(CodeActionKind::QUICKFIX),
                    diagnostics: Some(vec![diagnostic.clone()]),
                    edit: Some(WorkspaceEdit {
                        changes: Some(changes),
                        ..Default::default()
                    }),
                    ..Default::default()
                }));
            }
        }

        Ok(Some(actions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn around_cursor_splits_fragments() {
        let rope = Rope::from_str("from starkware.ca import x\n");
        let (before, after) = around_cursor(
            &rope,
            Position {
                line: 0,
                character: 17,
            },
        )
        .unwrap();
        assert_eq!(before, "starkware.ca");
        assert_eq!(after, "");

        let (before, after) = around_cursor(
            &rope,
            Position {
                line: 0,
                character: 7,
            },
        )
        .unwrap();
        assert_eq!(before, "st");
        assert_eq!(after, "arkware.ca");
    }

    #[test]
    fn around_cursor_after_space_is_empty() {
        let rope = Rope::from_str("from \n");
        let (before, after) = around_cursor(
            &rope,
            Position {
                line: 0,
                character: 5,
            },
        )
        .unwrap();
        assert_eq!(before, "");
        assert_eq!(after, "");
    }

    #[test]
    fn replacement_item_spans_word() {
        let item = replacement_item(
            Position {
                line: 3,
                character: 10,
            },
            "starkware.cairo",
            "starkware.cairo",
            "starkw",
            "are",
        );
        let Some(CompletionTextEdit::Edit(edit)) = item.text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.range.start.character, 4);
        assert_eq!(edit.range.end.character, 13);
        assert_eq!(edit.new_text, "starkware.cairo");
    }

    #[test]
    fn open_import_module_finds_unclosed_list() {
        let text = "from a.b import (x)\nfrom c.d import (\n    one,\n    ";
        assert_eq!(open_import_module(text), Some("c.d".to_string()));
    }

    #[test]
    fn open_import_module_ignores_closed_lists() {
        let text = "from a.b import (\n    x,\n)\nfunc f():\n";
        assert_eq!(open_import_module(text), None);
    }

    #[test]
    fn text_up_to_clamps_positions() {
        let rope = Rope::from_str("abc\ndef\n");
        assert_eq!(
            text_up_to(
                &rope,
                Position {
                    line: 1,
                    character: 2
                }
            ),
            "abc\nde"
        );
        assert_eq!(
            text_up_to(
                &rope,
                Position {
                    line: 99,
                    character: 99
                }
            ),
            "abc\ndef\n"
        );
    }
}
