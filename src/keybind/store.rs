//! Keybind persistence and validation

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::model::{Action, KeybindConfig};
use crate::hotkey::ModifierState;

/// Errors from validating or saving a keybind configuration
#[derive(Debug, thiserror::Error)]
pub enum KeybindError {
    #[error("no key specified for {action}")]
    EmptyKey { action: Action },

    #[error("duplicate keybind {combo} used by both {first} and {second}")]
    Conflict {
        combo: String,
        first: Action,
        second: Action,
    },

    #[error("failed to serialize keybinds: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write keybind config {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Loads and saves the keybind document
#[derive(Debug, Clone)]
pub struct KeybindStore {
    path: PathBuf,
}

impl KeybindStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults
    ///
    /// A missing or unreadable document is not an error for the caller.
    pub fn load(&self) -> KeybindConfig {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no keybind config, using defaults");
                return KeybindConfig::default();
            }
            Err(e) => {
                warn!(path = ?self.path, ?e, "failed to read keybind config, using defaults");
                return KeybindConfig::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => {
                info!(path = ?self.path, "keybind config loaded");
                config
            }
            Err(e) => {
                warn!(path = ?self.path, ?e, "failed to parse keybind config, using defaults");
                KeybindConfig::default()
            }
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, config: &KeybindConfig) -> Result<(), KeybindError> {
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json).map_err(|source| KeybindError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        info!(path = ?self.path, "keybind config saved");
        Ok(())
    }
}

/// Normalize and check a candidate configuration
///
/// Keys are trimmed and lower-cased. Every action needs a key and no two
/// actions may share the same modifiers and key.
pub fn validate(mut candidate: KeybindConfig) -> Result<KeybindConfig, KeybindError> {
    for action in Action::ALL {
        let bind = candidate.get_mut(action);
        bind.key = bind.key.trim().to_lowercase();
        if bind.key.is_empty() {
            return Err(KeybindError::EmptyKey { action });
        }
    }

    {
        let mut seen: HashMap<(ModifierState, &str), Action> = HashMap::new();
        for (action, bind) in candidate.entries() {
            let combo = (ModifierState::from(&bind.modifiers), bind.key.as_str());
            if let Some(first) = seen.insert(combo, action) {
                return Err(KeybindError::Conflict {
                    combo: bind.to_string(),
                    first,
                    second: action,
                });
            }
        }
    }

    Ok(candidate)
}
