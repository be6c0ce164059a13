//! Per-round throughput measurements and the bookkeeping built on them.

use std::time::Duration;

/// One round of a throughput phase: everything the round's streams moved
/// and how long the round took on the wall clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl Measurement {
    pub const fn new(bytes: u64, elapsed: Duration) -> Self {
        Self { bytes, elapsed }
    }

    /// Throughput in bits per second, or 0.0 for a zero-length round.
    pub fn throughput_bps(&self) -> f64 {
        calculate_bandwidth_bps(self.bytes, self.elapsed)
    }

    pub fn mbps(&self) -> f64 {
        calculate_speed_mbps(self.throughput_bps())
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

pub fn calculate_bandwidth_bps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }

    (bytes as f64 * 8.0) / secs
}

pub fn calculate_speed_mbps(bps: f64) -> f64 {
    bps / 1_000_000.0
}

/// Overall throughput across rounds: total bits over total round time.
pub fn aggregate_mbps(measurements: &[Measurement]) -> f64 {
    let bytes: u64 = measurements.iter().map(|m| m.bytes).sum();
    let elapsed: Duration = measurements.iter().map(|m| m.elapsed).sum();

    calculate_speed_mbps(calculate_bandwidth_bps(bytes, elapsed))
}

/// Mean absolute difference between consecutive samples.
/// Needs at least two samples.
pub fn jitter_f64(measurements: &[f64]) -> Option<f64> {
    if measurements.len() < 2 {
        return None;
    }

    let jitters: Vec<f64> = measurements
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).abs())
        .collect();

    Some(jitters.iter().sum::<f64>() / jitters.len() as f64)
}

/// Tracks how many consecutive rounds stayed within `tolerance` of the
/// round before them.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    tolerance: f64,
    window: usize,
    previous: Option<f64>,
    consecutive: usize,
}

impl StabilityTracker {
    pub fn new(tolerance: f64, window: usize) -> Self {
        Self { tolerance, window, previous: None, consecutive: 0 }
    }

    /// Record a round's throughput and return the current streak.
    ///
    /// The first round only sets the baseline. A previous round of zero
    /// cannot be compared relatively and resets the streak.
    pub fn observe(&mut self, mbps: f64) -> usize {
        match self.previous {
            Some(previous) if previous > 0.0 => {
                let variation = (mbps - previous).abs() / previous;
                if variation < self.tolerance {
                    self.consecutive += 1;
                } else {
                    self.consecutive = 0;
                }
            }
            Some(_) => self.consecutive = 0,
            None => {}
        }

        self.previous = Some(mbps);
        self.consecutive
    }

    pub fn consecutive(&self) -> usize {
        self.consecutive
    }

    /// Stable once the streak fills the window and the phase has run for
    /// at least `min_duration`.
    pub fn is_stable(&self, elapsed: Duration, min_duration: Duration) -> bool {
        self.consecutive >= self.window && elapsed >= min_duration
    }
}

/// Exponential smoothing of latency across runs. Large readings are
/// trusted less so that one spike does not swing the synthetic brackets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencySmoother {
    value: Option<f64>,
}

pub const SPIKE_THRESHOLD_MS: f64 = 500.0;
const SPIKE_ALPHA: f64 = 0.2;
const NORMAL_ALPHA: f64 = 0.5;

impl LatencySmoother {
    pub fn update(&mut self, latency_ms: f64) -> f64 {
        let smoothed = match self.value {
            None => latency_ms,
            Some(previous) => {
                let alpha = if latency_ms > SPIKE_THRESHOLD_MS {
                    SPIKE_ALPHA
                } else {
                    NORMAL_ALPHA
                };
                alpha * latency_ms + (1.0 - alpha) * previous
            }
        };

        self.value = Some(smoothed);
        smoothed
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
