//! Acquisition scheduling.
//!
//! The scheduler owns two things:
//! - per-resource sequence numbers, so stale completions can be discarded
//! - per-view state (`Idle | Running | Paused`) and the periodic ticker
//!
//! Acquisitions run on the blocking pool and report back as
//! [`EngineMessage::Acquired`]. The ticker only sends
//! [`EngineMessage::Tick`]; the foreground decides whether to act on it, so
//! a tick already queued when a view is paused is simply ignored.
//!
//! # Panic-Free Guarantees
//!
//! Channel send failures mean the engine is gone; they end the sending task
//! instead of panicking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use vigil_core::ResourceId;

use crate::adapter::SnapshotSource;
use crate::events::{Acquisition, EngineMessage, ViewKind};

/// Default period of the process table refresh.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Scheduling state of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Never started.
    Idle,
    Running,
    Paused,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// Drives periodic and on-demand snapshot acquisition.
pub struct Scheduler {
    source: Arc<dyn SnapshotSource>,
    sender: mpsc::UnboundedSender<EngineMessage>,
    sequences: HashMap<ResourceId, u64>,
    files: SchedulerState,
    processes: SchedulerState,
    period: Duration,
    paused_tx: watch::Sender<bool>,
    ticker: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        sender: mpsc::UnboundedSender<EngineMessage>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (paused_tx, _) = watch::channel(true);
        Self {
            source,
            sender,
            sequences: HashMap::new(),
            files: SchedulerState::Running,
            processes: SchedulerState::Idle,
            period,
            paused_tx,
            ticker: None,
            cancel,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self, view: ViewKind) -> SchedulerState {
        match view {
            ViewKind::Files => self.files,
            ViewKind::Processes => self.processes,
        }
    }

    fn set_state(&mut self, view: ViewKind, state: SchedulerState) {
        match view {
            ViewKind::Files => self.files = state,
            ViewKind::Processes => self.processes = state,
        }
    }

    /// Starts a one-shot acquisition of `resource` and returns its sequence
    /// number.
    ///
    /// The result arrives later as [`EngineMessage::Acquired`].
    pub fn acquire(&mut self, resource: ResourceId) -> u64 {
        let seq = self.next_seq(&resource);
        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();

        trace!(resource = %resource, seq, "Dispatching acquisition");
        tokio::task::spawn_blocking(move || {
            let result = source.acquire(&resource);
            // Ignore send error - engine may have shut down
            let _ = sender.send(EngineMessage::Acquired(Acquisition {
                resource,
                seq,
                result,
            }));
        });

        seq
    }

    fn next_seq(&mut self, resource: &ResourceId) -> u64 {
        let seq = self.sequences.entry(resource.clone()).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Stops scheduling further polls for `view`.
    ///
    /// An acquisition already in flight still completes and is applied.
    pub fn pause(&mut self, view: ViewKind) {
        self.set_state(view, SchedulerState::Paused);
        if view == ViewKind::Processes {
            self.paused_tx.send_replace(true);
        }
        info!(view = %view, "View paused");
    }

    /// Resumes `view`, starting its periodic ticker on first use.
    ///
    /// Returns `true` when the view was not already running, in which case
    /// the caller should refresh it immediately.
    pub fn resume(&mut self, view: ViewKind) -> bool {
        let was = self.state(view);
        self.set_state(view, SchedulerState::Running);
        if view == ViewKind::Processes {
            self.paused_tx.send_replace(false);
            if self.ticker.is_none() {
                self.ticker = Some(self.spawn_ticker(view));
            }
        }
        if was != SchedulerState::Running {
            info!(view = %view, from = %was, "View resumed");
        }
        was != SchedulerState::Running
    }

    /// Spawns the periodic trigger for `view`.
    ///
    /// The first tick fires one period after start; `resume` refreshes
    /// immediately on its own.
    fn spawn_ticker(&self, view: ViewKind) -> JoinHandle<()> {
        let period = self.period;
        let sender = self.sender.clone();
        let cancel = self.cancel.clone();
        let mut paused = self.paused_tx.subscribe();

        tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            debug!(view = %view, period_secs = period.as_secs(), "Ticker started");

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!(view = %view, "Ticker shutting down");
                        break;
                    }

                    _ = tick.tick() => {
                        if *paused.borrow_and_update() {
                            continue;
                        }
                        if sender.send(EngineMessage::Tick(view)).is_err() {
                            debug!(view = %view, "Ticker stopping: engine channel closed");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// True when a tick for `view` should trigger a refresh.
    pub fn should_poll(&self, view: ViewKind) -> bool {
        self.state(view) == SchedulerState::Running
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("files", &self.files)
            .field("processes", &self.processes)
            .field("period", &self.period)
            .field("ticker_running", &self.ticker.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
