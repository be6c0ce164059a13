//! Progress event types and callback interface.
//!
//! Events arrive in phase order: ip, ping, download, upload, then either
//! `Complete` or a single `Error`. Nothing follows either of those.

use crate::results::SessionReport;
use std::fmt;

/// Stage discriminator carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ip,
    Ping,
    Download,
    Upload,
    Complete,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ip => "ip",
            Stage::Ping => "ping",
            Stage::Download => "download",
            Stage::Upload => "upload",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a throughput phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub fn stage(&self) -> Stage {
        match self {
            Direction::Download => Stage::Download,
            Direction::Upload => Stage::Upload,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.stage().as_str()
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A phase is about to start.
    PhaseStarted(Stage),
    /// One latency sample was taken.
    LatencySample {
        value_ms: f64,
        /// 1-indexed
        current: usize,
        total: usize,
        simulated: bool,
    },
    /// One throughput round finished.
    Round {
        direction: Direction,
        /// 1-indexed
        round: usize,
        mbps: f64,
        bytes: u64,
        /// Consecutive rounds within tolerance so far
        stable_rounds: usize,
        simulated: bool,
    },
    /// A phase finished, with a human-readable status.
    PhaseCompleted { stage: Stage, message: String },
    /// Every phase finished.
    Complete(Box<SessionReport>),
    /// The run failed. Always the last event.
    Error(String),
}

impl ProgressEvent {
    pub fn stage(&self) -> Stage {
        match self {
            ProgressEvent::PhaseStarted(stage) => *stage,
            ProgressEvent::LatencySample { .. } => Stage::Ping,
            ProgressEvent::Round { direction, .. } => direction.stage(),
            ProgressEvent::PhaseCompleted { stage, .. } => *stage,
            ProgressEvent::Complete(_) => Stage::Complete,
            ProgressEvent::Error(_) => Stage::Error,
        }
    }

    /// Display message, if the event carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            ProgressEvent::PhaseCompleted { message, .. } => Some(message),
            ProgressEvent::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Callback interface for progress updates.
///
/// Implementations must be non-blocking to avoid affecting measurement
/// accuracy.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressCallback for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}
