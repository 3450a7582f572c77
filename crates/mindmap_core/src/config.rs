//! Core configuration.
//!
//! # Responsibility
//! - Collect tunables for layout, sync debounce, editor defaults and logging.
//! - Parse configuration supplied by the UI shell as JSON.
//!
//! # Invariants
//! - Every section falls back to defaults when omitted.
//! - Spacing values are finite and positive after `validate()`.

use crate::layout::LayoutConfig;
use crate::sync::gateway::SyncConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Label given to nodes created by Add Child / Add Sibling.
pub const DEFAULT_NODE_LABEL: &str = "New Topic";
/// Template for the seeded session root; `{theme}` is substituted.
pub const DEFAULT_ROOT_LABEL_TEMPLATE: &str = "1on1 Theme: {theme}";
/// Theme used when a session starts without one.
pub const DEFAULT_THEME: &str = "General Check-in";

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Input is not valid configuration JSON.
    Parse(serde_json::Error),
    /// A value is outside its allowed range.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration: {err}"),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Editor-facing defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub default_label: String,
    pub root_label_template: String,
    pub default_theme: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_label: DEFAULT_NODE_LABEL.to_string(),
            root_label_template: DEFAULT_ROOT_LABEL_TEMPLATE.to_string(),
            default_theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl EditorConfig {
    /// Renders the root label for `theme`, falling back to the default theme
    /// when `theme` is blank.
    pub fn root_label(&self, theme: Option<&str>) -> String {
        let theme = theme
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.default_theme.as_str());
        self.root_label_template.replace("{theme}", theme)
    }
}

/// Top-level configuration for one embedding UI shell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub layout: LayoutConfig,
    pub sync: SyncConfig,
    pub editor: EditorConfig,
    /// `trace|debug|info|warn|error`; `None` uses the build-mode default.
    pub log_level: Option<String>,
}

impl CoreConfig {
    /// Parses and validates configuration JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("layout.layer_spacing", self.layout.layer_spacing),
            ("layout.node_spacing", self.layout.node_spacing),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "`{name}` must be a positive number, got {value}"
                )));
            }
        }
        if self.editor.default_label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`editor.default_label` must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the configured log level or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or_else(|| crate::logging::default_log_level())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, EditorConfig};
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("defaults should parse");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.sync.debounce(), Duration::from_millis(1000));
        assert_eq!(config.editor.default_label, "New Topic");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = CoreConfig::from_json_str(
            r#"{ "layout": { "node_spacing": 40 }, "sync": { "debounce_ms": 250 } }"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.layout.node_spacing, 40.0);
        assert_eq!(config.layout.layer_spacing, 250.0);
        assert_eq!(config.sync.debounce(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_non_positive_spacing() {
        let err = CoreConfig::from_json_str(r#"{ "layout": { "layer_spacing": 0 } }"#)
            .expect_err("zero spacing must be rejected");
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("layer_spacing")));
    }

    #[test]
    fn log_level_falls_back_to_build_default() {
        let config = CoreConfig::from_json_str("{}").expect("defaults should parse");
        assert_eq!(
            config.effective_log_level(),
            crate::logging::default_log_level()
        );

        let config = CoreConfig::from_json_str(r#"{ "log_level": "warn" }"#)
            .expect("log level should parse");
        assert_eq!(config.effective_log_level(), "warn");
    }

    #[test]
    fn root_label_uses_theme_or_default() {
        let editor = EditorConfig::default();
        assert_eq!(editor.root_label(Some("Project A")), "1on1 Theme: Project A");
        assert_eq!(editor.root_label(Some("  ")), "1on1 Theme: General Check-in");
        assert_eq!(editor.root_label(None), "1on1 Theme: General Check-in");
    }
}
