//! Progress reporting.
//!
//! Stages report through a [`ProgressReporter`]. Per-unit progress of a stage
//! is tracked by a [`StageProgress`], which advances its counter and notifies
//! the reporter under one lock so percentages never go backwards.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Observer for pipeline progress.
pub trait ProgressReporter: Send + Sync {
    /// `percent` is in `0..=100`; `done` is only set once the whole run finished.
    fn report(&self, message: &str, percent: u8, done: bool);
}

pub type SharedReporter = Arc<dyn ProgressReporter>;

/// Reporter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _message: &str, _percent: u8, _done: bool) {}
}

pub fn noop_reporter() -> SharedReporter {
    Arc::new(NoopReporter)
}

/// A progress event as delivered by [`ChannelReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub message: String,
    pub percent: u8,
    pub done: bool,
    pub updated_at: DateTime<Utc>,
}

/// Forwards progress events into a bounded channel.
///
/// Events are dropped when the channel is full or the receiver is gone.
#[derive(Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ProgressUpdate>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx }
    }

    /// Create a reporter together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, message: &str, percent: u8, done: bool) {
        let _ = self.tx.try_send(ProgressUpdate {
            message: message.to_string(),
            percent,
            done,
            updated_at: Utc::now(),
        });
    }
}

/// Point-in-time view of a stage's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// `completed / total * 100`, truncated. An empty stage counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let percent = self.completed.min(self.total) * 100 / self.total;
        percent as u8
    }

    /// `elapsed * remaining / completed`; unknown until something completed.
    pub fn eta(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let factor = self.remaining() as f64 / self.completed as f64;
        Some(self.elapsed.mul_f64(factor))
    }
}

/// Human-readable ETA, rounded to whole seconds.
pub fn format_eta(eta: Option<Duration>) -> String {
    match eta {
        Some(eta) => {
            let secs = eta.as_secs_f64().round() as u64;
            humantime::format_duration(Duration::from_secs(secs)).to_string()
        }
        None => "unknown".to_string(),
    }
}

struct StageState {
    completed: usize,
    total: usize,
    started_at: Instant,
}

/// Completion counter for one stage.
pub struct StageProgress {
    state: Mutex<StageState>,
    reporter: SharedReporter,
}

impl StageProgress {
    /// Start tracking a stage of `total` units; the clock starts now.
    pub fn new(total: usize, reporter: SharedReporter) -> Self {
        Self {
            state: Mutex::new(StageState {
                completed: 0,
                total,
                started_at: Instant::now(),
            }),
            reporter,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        ProgressSnapshot {
            completed: state.completed,
            total: state.total,
            elapsed: state.started_at.elapsed(),
        }
    }

    /// Mark one unit complete and report it.
    pub fn advance<F>(&self, message: F) -> ProgressSnapshot
    where
        F: FnOnce(&ProgressSnapshot) -> String,
    {
        let mut state = self.state.lock();
        state.completed = (state.completed + 1).min(state.total);
        let snapshot = ProgressSnapshot {
            completed: state.completed,
            total: state.total,
            elapsed: state.started_at.elapsed(),
        };
        // Reported while holding the lock to keep events ordered.
        self.reporter
            .report(&message(&snapshot), snapshot.percent(), false);
        snapshot
    }
}
