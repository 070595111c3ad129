//! User configuration.
//!
//! Read once at startup from `--config <path>` or
//! `$XDG_CONFIG_HOME/vigil/config.toml`. Every field has a default, so an
//! empty or missing file is valid.
//!
//! ```toml
//! poll_interval_secs = 5
//! start_dir = "/var/log"
//! show_hidden = false
//! start_view = "processes"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vigil_engine::ViewKind;

use crate::error::{Result, TuiError};

/// Which view is shown first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartView {
    #[default]
    Files,
    Processes,
}

impl From<StartView> for ViewKind {
    fn from(view: StartView) -> Self {
        match view {
            StartView::Files => ViewKind::Files,
            StartView::Processes => ViewKind::Processes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Seconds between process table polls.
    pub poll_interval_secs: u64,
    /// Directory shown on startup; the working directory when unset.
    pub start_dir: Option<PathBuf>,
    /// Include dot-files in directory listings.
    pub show_hidden: bool,
    /// Where bookmarks are persisted; the state directory when unset.
    pub bookmarks_file: Option<PathBuf>,
    pub start_view: StartView,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            start_dir: None,
            show_hidden: true,
            bookmarks_file: None,
            start_view: StartView::Files,
        }
    }
}

impl VigilConfig {
    /// Loads the config from `path`, or from the default location.
    ///
    /// A missing file yields defaults; a file that exists but does not
    /// parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => {
                debug!("No config directory available, using defaults");
                return Ok(Self::default());
            }
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self =
            toml::from_str(&text).map_err(|source| TuiError::Config { path: path.clone(), source })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Poll period, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Bookmarks file, falling back to the state directory.
    pub fn bookmarks_path(&self) -> Option<PathBuf> {
        self.bookmarks_file
            .clone()
            .or_else(|| state_dir().map(|dir| dir.join("bookmarks.json")))
    }
}

/// `$XDG_CONFIG_HOME/vigil/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vigil").join("config.toml"))
}

/// `$XDG_STATE_HOME/vigil`, or `~/.local/state/vigil` where the platform
/// has no state directory.
pub fn state_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
        .map(|dir| dir.join("vigil"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Per CLAUDE.md: Tests CAN use .unwrap()

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = VigilConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config, VigilConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_secs = 5\nstart_view = \"processes\"\n").unwrap();

        let config = VigilConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.start_view, StartView::Processes);
        assert!(config.show_hidden);
        assert!(config.start_dir.is_none());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_secs = \"often\"").unwrap();

        let err = VigilConfig::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, TuiError::Config { .. }));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = VigilConfig {
            poll_interval_secs: 0,
            ..VigilConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_explicit_bookmarks_file_wins() {
        let config = VigilConfig {
            bookmarks_file: Some(PathBuf::from("/tmp/marks.json")),
            ..VigilConfig::default()
        };
        assert_eq!(config.bookmarks_path(), Some(PathBuf::from("/tmp/marks.json")));
    }

    #[test]
    fn test_start_view_maps_to_view_kind() {
        assert_eq!(ViewKind::from(StartView::Files), ViewKind::Files);
        assert_eq!(ViewKind::from(StartView::Processes), ViewKind::Processes);
    }
}
