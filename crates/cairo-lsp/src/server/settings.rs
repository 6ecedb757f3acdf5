//! Server settings, delivered by the editor under the `cairols` section.

use cairo_analyzer::CompilerConfig;
use serde::Deserialize;

/// User-facing configuration. Field names follow the host protocol's
/// camelCase spelling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CairoLsSettings {
    /// `"cairo"`, `"starknet"` or `"autodetect"`.
    pub highlighting_compiler: String,
    pub max_number_of_problems: usize,
    pub use_venv: bool,
    pub venv_command: String,
    pub nile_use_venv: bool,
    pub nile_venv_command: String,
    /// Source sub-directory under each workspace root; detected from
    /// `setup.cfg` when unset.
    pub source_dir: Option<String>,
}

impl Default for CairoLsSettings {
    fn default() -> Self {
        Self {
            highlighting_compiler: "autodetect".to_string(),
            max_number_of_problems: 100,
            use_venv: true,
            venv_command: ". ~/cairo_venv/bin/activate".to_string(),
            nile_use_venv: true,
            nile_venv_command: ". env/bin/activate".to_string(),
            source_dir: None,
        }
    }
}

impl CairoLsSettings {
    /// The slice of settings the compiler engine cares about.
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            highlighting_compiler: self.highlighting_compiler.clone(),
            use_venv: self.use_venv,
            venv_command: self.venv_command.clone(),
            nile_use_venv: self.nile_use_venv,
            nile_venv_command: self.nile_venv_command.clone(),
        }
    }

    /// Parse the `cairols` section from a configuration notification,
    /// falling back to defaults on anything unexpected.
    pub fn from_notification(settings: &serde_json::Value) -> Self {
        settings
            .get("cairols")
            .cloned()
            .and_then(|section| serde_json::from_value(section).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let settings = CairoLsSettings::default();
        assert_eq!(settings.highlighting_compiler, "autodetect");
        assert_eq!(settings.max_number_of_problems, 100);
        assert!(settings.use_venv);
        assert!(settings.nile_use_venv);
        assert!(settings.source_dir.is_none());
    }

    #[test]
    fn partial_section_fills_in_defaults() {
        let value = json!({
            "cairols": {
                "highlightingCompiler": "starknet",
                "sourceDir": "contracts"
            }
        });
        let settings = CairoLsSettings::from_notification(&value);
        assert_eq!(settings.highlighting_compiler, "starknet");
        assert_eq!(settings.source_dir.as_deref(), Some("contracts"));
        assert_eq!(settings.max_number_of_problems, 100);
    }

    #[test]
    fn missing_section_means_defaults() {
        let settings = CairoLsSettings::from_notification(&json!({}));
        assert_eq!(settings, CairoLsSettings::default());
    }
}
