//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::dispatch::DEFAULT_DEBOUNCE;

/// Keybind document, relative to the working directory
pub const KEYBIND_FILE: &str = "keybind_config.json";
/// Guide loaded at startup, relative to the working directory
pub const GUIDE_FILE: &str = "sample_guide.json";
/// Guide used when [`GUIDE_FILE`] is absent; the sample guide is written here
pub const FALLBACK_GUIDE_FILE: &str = "speedrun_guide.json";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that relative template paths resolve against
    pub working_dir: PathBuf,

    pub keybind_path: PathBuf,

    pub guide_path: PathBuf,

    pub fallback_guide_path: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Minimum time between two accepted hotkey actions
    pub debounce: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    ///
    /// `VTASK_WORKDIR` overrides the working directory and `VTASK_SOCKET`
    /// the socket path.
    pub fn load() -> Result<Self> {
        let working_dir = match std::env::var_os("VTASK_WORKDIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().context("failed to resolve working directory")?,
        };

        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("vtask-tracker");

        let socket_path = std::env::var_os("VTASK_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("overlay.sock"));

        Ok(Self::new(working_dir, data_dir, socket_path))
    }

    /// Build a configuration rooted at `working_dir`
    pub fn new(working_dir: PathBuf, data_dir: PathBuf, socket_path: PathBuf) -> Self {
        Self {
            keybind_path: working_dir.join(KEYBIND_FILE),
            guide_path: working_dir.join(GUIDE_FILE),
            fallback_guide_path: working_dir.join(FALLBACK_GUIDE_FILE),
            working_dir,
            socket_path,
            data_dir,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Resolve a user-supplied path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.working_dir.join(path)
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load().unwrap();
        assert!(config.data_dir.to_string_lossy().contains("vtask-tracker"));
        assert!(config.keybind_path.ends_with(KEYBIND_FILE));
    }

    #[test]
    fn test_paths_relative_to_working_dir() {
        let config = Config::new(
            PathBuf::from("/srv/guides"),
            PathBuf::from("/tmp/data"),
            PathBuf::from("/tmp/data/overlay.sock"),
        );
        assert_eq!(config.keybind_path, Path::new("/srv/guides/keybind_config.json"));
        assert_eq!(config.guide_path, Path::new("/srv/guides/sample_guide.json"));
        assert_eq!(
            config.fallback_guide_path,
            Path::new("/srv/guides/speedrun_guide.json")
        );
        assert_eq!(config.debounce, Duration::from_millis(200));
    }

    #[test]
    fn test_resolve() {
        let config = Config::new(
            PathBuf::from("/srv/guides"),
            PathBuf::from("/tmp/data"),
            PathBuf::from("/tmp/data/overlay.sock"),
        );
        assert_eq!(config.resolve(Path::new("route.json")), Path::new("/srv/guides/route.json"));
        assert_eq!(config.resolve(Path::new("/abs/route.json")), Path::new("/abs/route.json"));
    }
}
