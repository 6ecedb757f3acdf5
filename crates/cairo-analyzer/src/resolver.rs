// This file is part of cairo-lsp.
// SPDX-License-Identifier: Apache-2.0

//! Dotted module name resolution against the package search paths.
//!
//! A dotted name like `starkware.cairo.common.math` maps to
//! `starkware/cairo/common/math.cairo` under one of an ordered list of search
//! roots: every workspace folder (optionally extended by its source
//! sub-directory) plus the installed `cairo-lang` package location.

use std::path::{Path, PathBuf};

use lsp_types::Url;
use walkdir::WalkDir;

/// Source file extension, without the dot.
const SOURCE_EXTENSION: &str = "cairo";

/// Vendored scaffolding that must never show up as an import candidate.
const NILE_BASE_PROJECT: &str = "site-packages/nile/base_project";

/// Ordered set of directories dotted module names are resolved against.
///
/// The wire form is a single `;`-joined string (directory paths therefore must
/// not contain `;`). The set is a plain value: the server owns one per
/// session in an invalidatable slot and passes it into each request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPathSet {
    roots: Vec<PathBuf>,
}

impl SearchPathSet {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Parse the `;`-joined form. Empty segments are dropped.
    pub fn parse(joined: &str) -> Self {
        Self {
            roots: joined
                .split(';')
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
        }
    }

    /// The `;`-joined form.
    pub fn join(&self) -> String {
        self.roots
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Resolve a dotted module name to the first matching file on the search path.
///
/// Returns the file URI alongside the path; `None` when no root contains the
/// module, which downstream features treat as "no match", not an error.
pub fn resolve_module(dotted: &str, paths: &SearchPathSet) -> Option<(Url, PathBuf)> {
    let mut relative = PathBuf::new();
    for segment in dotted.split('.') {
        relative.push(segment);
    }
    relative.set_extension(SOURCE_EXTENSION);

    for root in paths.roots() {
        let candidate = root.join(&relative);
        tracing::trace!("possible module path: {}", candidate.display());
        if candidate.exists() {
            let url = Url::from_file_path(&candidate).ok()?;
            tracing::debug!("module {dotted} resolved to {}", candidate.display());
            return Some((url, candidate));
        }
    }
    None
}

/// Enumerate dotted-name completion candidates for a module prefix.
///
/// The prefix's parent portion (text up to its last dot) selects the folder to
/// walk; every `.cairo` file found beneath it is converted back to a dotted
/// name relative to its search root. Three kinds of matches are dropped:
/// relative paths that still contain a `.` (they traverse an unrelated nested
/// package, e.g. a venv checked into the workspace), files better explained by
/// a more specific search root also present in the set, and the vendored nile
/// base project. Result order follows the walk and is not part of the
/// contract.
pub fn find_completions(prefix: &str, paths: &SearchPathSet) -> Vec<String> {
    let parent = prefix.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
    let parent_as_path: PathBuf = parent.split('.').filter(|s| !s.is_empty()).collect();

    let mut result = Vec::new();
    for root in paths.roots() {
        let folder = root.join(&parent_as_path);
        tracing::trace!("possible import folder: {}", folder.display());

        for entry in WalkDir::new(&folder).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().map_or(true, |e| e != SOURCE_EXTENSION) {
                continue;
            }

            let without_extension = path.with_extension("");
            let Ok(relative) = without_extension.strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");

            if shadowed_by_other_root(path, root, paths.roots()) {
                tracing::trace!("skipping path owned by another search root: {relative}");
            } else if relative.contains('.') {
                tracing::trace!("skipping path that is not a valid cairo path: {relative}");
            } else if path.to_string_lossy().contains(NILE_BASE_PROJECT) {
                tracing::trace!("skipping nile base project: {relative}");
            } else {
                result.push(relative.replace('/', "."));
            }
        }
    }

    tracing::debug!("found {} cairo files for prefix {prefix}", result.len());
    result
}

/// True when `file` also lives under a more specific search root nested
/// inside `root`; that other root is the one that should report it.
fn shadowed_by_other_root(file: &Path, root: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|other| {
        other != root && other.starts_with(root) && file.starts_with(other)
    })
}

/// Extend a workspace root with its source sub-directory, when one is
/// configured or can be detected from the project's Python config.
pub fn append_source_dir(root: &Path, configured: Option<&str>) -> PathBuf {
    let dir = configured
        .map(str::to_string)
        .or_else(|| detect_source_dir(root));
    match dir {
        Some(dir) if !dir.is_empty() => root.join(dir),
        _ => root.to_path_buf(),
    }
}

/// Read the package source directory from `setup.cfg`:
///
/// ```text
/// [options.packages.find]
/// where = src
/// ```
///
/// A blank line ends the section.
pub fn detect_source_dir(root: &Path) -> Option<String> {
    let setup_file = root.join("setup.cfg");
    let contents = match std::fs::read_to_string(&setup_file) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::trace!("could not read {}: {e}", setup_file.display());
            return None;
        }
    };

    let mut in_packages_find = false;
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() {
            if in_packages_find {
                break;
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        if line == "[options.packages.find]" {
            in_packages_find = true;
            continue;
        }
        if in_packages_find && line.starts_with("where") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() == 3 {
                tracing::debug!("using source directory {} from {}", parts[2], setup_file.display());
                return Some(parts[2].to_string());
            }
            tracing::warn!("failed to parse source directory from {}", setup_file.display());
        }
    }
    None
}

/// Fallback location of the `cairo-lang` package when pip cannot tell us.
pub fn default_package_root() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join("cairo_venv/lib/python3.7/site-packages"),
        Err(_) => PathBuf::from("."),
    }
}

/// Ask pip where the `cairo-lang` package is installed.
///
/// `command_prefix` carries the venv activation command, if any. Falls back to
/// [`default_package_root`] when pip is unavailable or its output has no
/// `Location:` line.
pub async fn detect_package_root(command_prefix: &str) -> PathBuf {
    const LOCATION_PREFIX: &str = "Location: ";

    let command = format!("{command_prefix}pip show cairo-lang");
    let output = match tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&command)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("could not run pip to locate cairo-lang: {e}");
            return default_package_root();
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(location) = line.strip_prefix(LOCATION_PREFIX) {
            let location = location.trim();
            tracing::info!("package location: {location}");
            return PathBuf::from(location);
        }
    }

    let fallback = default_package_root();
    tracing::debug!(
        "could not parse cairo-lang package location, defaulting to {}",
        fallback.display()
    );
    fallback
}
