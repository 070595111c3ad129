//! vigil TUI - Library modules
//!
//! Terminal front end over `vigil-engine`: a lazily expanded directory tree
//! and a polled process table, both kept in sync with the system by
//! snapshot diffing.
//!
//! # Architecture
//!
//! The binary runs three things:
//!
//! 1. **Keyboard Task**: Polls for keyboard input and sends events to the main loop
//! 2. **Engine Channel**: Carries snapshot acquisitions, ticks and mutation results
//! 3. **Main Event Loop**: Feeds both into [`App`], then renders
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.

pub mod app;
pub mod bookmarks;
pub mod config;
pub mod error;
pub mod input;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use bookmarks::JsonBookmarkStore;
pub use config::VigilConfig;
pub use error::{Result, TuiError};
