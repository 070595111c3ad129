//! vigil - live file tree and process table
//!
//! # Usage
//!
//! ```text
//! vigil                    # browse the current directory
//! vigil /var/log           # browse /var/log
//! vigil --view processes   # start on the process table
//! vigil --config my.toml   # use a specific config file
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use vigil_core::{BookmarkSet, BookmarkStore};
use vigil_engine::{Engine, EngineConfig, EngineMessage, SystemExecutor, SystemSource, ViewKind};
use vigil_tui::app::App;
use vigil_tui::bookmarks::JsonBookmarkStore;
use vigil_tui::config::{self, StartView, VigilConfig};
use vigil_tui::error::{Result as TuiResult, TuiError};
use vigil_tui::input::{handle_key_event, Action, Event};
use vigil_tui::ui;

// ============================================================================
// CLI Arguments
// ============================================================================

/// vigil - live file tree and process table
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(about = "Browse files and processes with views that stay in sync")]
#[command(version)]
struct Args {
    /// Directory to open (defaults to the config's start_dir, then the
    /// current directory)
    path: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/vigil/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// View to show first
    #[arg(long, value_enum)]
    view: Option<ViewArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ViewArg {
    Files,
    Processes,
}

impl From<ViewArg> for StartView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Files => StartView::Files,
            ViewArg::Processes => StartView::Processes,
        }
    }
}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Background Tasks
// ============================================================================

fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

/// Forwards engine messages into the main loop's event channel.
fn spawn_engine_forwarder(
    mut engine_rx: mpsc::UnboundedReceiver<EngineMessage>,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => break,

                message = engine_rx.recv() => {
                    let Some(message) = message else {
                        debug!("Engine channel closed");
                        break;
                    };
                    if event_tx.send(Event::Engine(message)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let event = tokio::time::timeout(tick_rate, event_rx.recv()).await;

        match event {
            Ok(Some(Event::Key(key))) => {
                if handle_key_event(key, app) == Action::Quit {
                    info!("User requested quit");
                    cancel_token.cancel();
                    break;
                }
            }
            Ok(Some(Event::Resize(width, height))) => {
                debug!(width, height, "Terminal resized");
            }
            Ok(Some(Event::Engine(message))) => {
                app.handle_message(message);
            }
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => {}
        }

        if app.should_quit || cancel_token.is_cancelled() {
            cancel_token.cancel();
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

fn create_log_file() -> Option<std::fs::File> {
    let log_dir = config::state_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("vigil.log");

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

fn init_logging() {
    match create_log_file() {
        Some(file) => {
            let filter = EnvFilter::from_default_env().add_directive(
                "vigil=info".parse().unwrap_or_else(|_| {
                    tracing_subscriber::filter::Directive::from(tracing::Level::INFO)
                }),
            );

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn load_bookmarks(store: Option<&JsonBookmarkStore>) -> BookmarkSet {
    let Some(store) = store else {
        return BookmarkSet::new();
    };
    match store.load() {
        Ok(bookmarks) => bookmarks,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable bookmarks file");
            BookmarkSet::new()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging();

    let config = VigilConfig::load(args.config.as_deref()).context("Failed to load config")?;

    let start_dir = match args.path.or_else(|| config.start_dir.clone()) {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let start_dir = start_dir
        .canonicalize()
        .with_context(|| format!("Cannot open {}", start_dir.display()))?;
    let start_view = args.view.map(StartView::from).unwrap_or(config.start_view);

    info!(
        start_dir = %start_dir.display(),
        view = ?start_view,
        poll_secs = config.poll_interval().as_secs(),
        "vigil starting..."
    );

    let bookmark_store = config.bookmarks_path().map(JsonBookmarkStore::new);
    let bookmarks = load_bookmarks(bookmark_store.as_ref());

    let (mut engine, engine_rx) = Engine::new(
        EngineConfig {
            root: start_dir.clone(),
            poll_interval: config.poll_interval(),
        },
        Arc::new(SystemSource::new(config.show_hidden)),
        Arc::new(SystemExecutor),
        bookmarks,
    );
    engine.navigate(start_dir);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let mut app = App::new(engine, ViewKind::from(start_view), bookmark_store);

    let forwarder_handle =
        spawn_engine_forwarder(engine_rx, event_tx.clone(), cancel_token.clone());
    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(&mut terminal, &mut app, &mut event_rx, &cancel_token).await;

    cancel_token.cancel();
    app.quit();

    let _ = tokio::time::timeout(Duration::from_millis(100), forwarder_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("vigil stopped");

    result
}
