//! Server configuration: the two resolution profiles and the SQL schema
//! map.
//!
//! Values layer in order: built-in defaults, then `deepkeys.toml` from
//! the user config directory, then LSP `initializationOptions`. Every
//! layer is optional and partial; anything unparseable logs a warning and
//! leaves the previous layer in place.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};

use crate::session::Limits;

/// Ceilings of one named resolution profile.
///
/// Field defaults are the interactive values; the background profile gets
/// its own defaults through [`Settings::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveProfile {
    pub max_expressions: u32,
    pub max_depth: u16,
    pub timeout_ms: u64,
}

impl Default for ResolveProfile {
    fn default() -> Self {
        ResolveProfile {
            max_expressions: 7500,
            max_depth: 55,
            timeout_ms: 4000,
        }
    }
}

impl ResolveProfile {
    fn background() -> Self {
        ResolveProfile {
            max_expressions: 1500,
            max_depth: 5,
            timeout_ms: 100,
        }
    }

    pub fn to_limits(self) -> Limits {
        Limits {
            max_expressions: self.max_expressions,
            max_depth: self.max_depth,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Used when the user explicitly requests completion.
    pub interactive: ResolveProfile,
    /// Used for auto-popup while typing; must never block.
    pub background: ResolveProfile,
    /// Table name → ordered column list, consumed by the `SELECT *`
    /// expansion of the query builtin.
    pub schema: HashMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            interactive: ResolveProfile::default(),
            background: ResolveProfile::background(),
            schema: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Settings {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Settings::default(),
        }
    }

    /// Load from a specific TOML file; a missing file is the normal case
    /// and yields defaults silently, a malformed one logs a warning.
    pub fn load_from(path: &std::path::Path) -> Settings {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Settings::default();
        };
        match toml::from_str(&text) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "ignoring malformed config");
                Settings::default()
            }
        }
    }

    /// Overlay LSP `initializationOptions` on top of the current values.
    /// Missing fields fall back to serde defaults; junk keeps what we had.
    pub fn apply_initialization_options(&mut self, options: &serde_json::Value) {
        if options.is_null() {
            return;
        }
        match serde_json::from_value::<Settings>(options.clone()) {
            Ok(overridden) => *self = overridden,
            Err(error) => {
                tracing::warn!(%error, "ignoring malformed initializationOptions");
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("deepkeys_lsp").join("deepkeys.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_differ_per_profile() {
        let settings = Settings::default();
        assert!(settings.interactive.max_depth > settings.background.max_depth);
        assert!(settings.background.timeout_ms < settings.interactive.timeout_ms);
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let text = r#"
            [background]
            max_depth = 3

            [schema]
            users = ["id", "name"]
        "#;
        let settings: Settings = toml::from_str(text).unwrap();
        assert_eq!(settings.background.max_depth, 3);
        assert_eq!(
            settings.interactive.max_expressions,
            ResolveProfile::default().max_expressions
        );
        assert_eq!(settings.schema["users"], ["id", "name"]);
    }

    #[test]
    fn initialization_options_overlay() {
        let mut settings = Settings::default();
        settings.apply_initialization_options(&serde_json::json!({
            "interactive": { "max_expressions": 99 }
        }));
        assert_eq!(settings.interactive.max_expressions, 99);
        // Junk input keeps the previous values.
        settings.apply_initialization_options(&serde_json::json!("nonsense"));
        assert_eq!(settings.interactive.max_expressions, 99);
    }
}
