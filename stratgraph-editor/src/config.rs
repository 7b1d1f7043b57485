//! Editor session settings, loadable from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratgraph_core::history::MAX_HISTORY;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed editor config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid editor config: {0}")]
    Invalid(String),
}

/// Debounce and history settings for an [`EditorSession`](crate::EditorSession).
///
/// Every key is optional in the TOML form; missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before a history snapshot is pushed.
    pub history_debounce_ms: u64,
    /// Quiet period before a validate-then-persist round trip.
    pub autosave_debounce_ms: u64,
    /// Bound on the undo stack.
    pub max_history: usize,
    /// When off, only `save_now` persists.
    pub autosave_enabled: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_debounce_ms: 400,
            autosave_debounce_ms: 2000,
            max_history: MAX_HISTORY,
            autosave_enabled: true,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history == 0 {
            return Err(ConfigError::Invalid("max_history must be at least 1".into()));
        }
        if self.autosave_debounce_ms < self.history_debounce_ms {
            return Err(ConfigError::Invalid(format!(
                "autosave_debounce_ms ({}) must not be shorter than history_debounce_ms ({})",
                self.autosave_debounce_ms, self.history_debounce_ms
            )));
        }
        Ok(())
    }

    pub fn history_debounce(&self) -> Duration {
        Duration::from_millis(self.history_debounce_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_history, 50);
        assert_eq!(config.history_debounce(), Duration::from_millis(400));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = EditorConfig::from_toml_str("autosave_debounce_ms = 5000\n").unwrap();
        assert_eq!(config.autosave_debounce_ms, 5000);
        assert_eq!(config.history_debounce_ms, 400);
        assert!(config.autosave_enabled);
    }

    #[test]
    fn rejects_zero_history() {
        let err = EditorConfig::from_toml_str("max_history = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_autosave_faster_than_history() {
        let err = EditorConfig::from_toml_str(
            "history_debounce_ms = 1000\nautosave_debounce_ms = 500",
        )
        .unwrap_err();
        assert!(err.to_string().contains("autosave_debounce_ms (500)"));
    }

    #[test]
    fn rejects_wrong_types() {
        let err = EditorConfig::from_toml_str("max_history = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(&dir.path().join("editor.toml")).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        std::fs::write(&path, "autosave_enabled = false\nmax_history = 10\n").unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert!(!config.autosave_enabled);
        assert_eq!(config.max_history, 10);
    }
}
