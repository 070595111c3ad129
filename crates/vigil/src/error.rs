//! Error types for the vigil TUI.
//!
//! This module defines TUI-specific errors that can occur during terminal
//! initialization, configuration loading and bookmark persistence.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// TUI Error Type
// ============================================================================

/// TUI application errors.
///
/// Engine failures (unreadable directories, failed kills) are not here:
/// they arrive as `ViewEvent::Error` notifications and end up in the
/// status bar. `TuiError` covers what the front end itself can get wrong.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize the terminal.
    ///
    /// This occurs when the TUI cannot set up raw mode or the alternate
    /// screen. Common causes include running in a non-TTY environment.
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// Failed to cleanup/restore the terminal.
    ///
    /// The terminal may be left in an inconsistent state; running `reset`
    /// can help recover.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    /// The configuration file exists but is not valid TOML for `VigilConfig`.
    #[error("Invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Reading or writing the bookmarks file failed.
    #[error("Bookmark file {}: {source}", path.display())]
    Bookmarks {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parse error passthrough.
    ///
    /// The bookmarks file is not a JSON array of paths.
    #[error("Failed to parse bookmarks: {0}")]
    ParseError(#[from] serde_json::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for TUI operations.
pub type Result<T> = std::result::Result<T, TuiError>;

// ============================================================================
// Tests
// ============================================================================
