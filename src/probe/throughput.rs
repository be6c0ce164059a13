use crate::errors::ProbeError;
use crate::fallback::first_success;
use crate::measurements::{aggregate_mbps, Measurement, StabilityTracker};
use crate::network::requests::download::Download;
use crate::network::requests::send;
use crate::network::requests::upload::Upload;
use crate::network::Transport;
use crate::probe::config::ThroughputConfig;
use crate::probe::engine::SpeedProbe;
use crate::probe::simulated;
use crate::progress::{Direction, ProgressCallback, ProgressEvent};
use crate::results::ThroughputResult;
use crate::stats::trimmed_mean;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

/// What a network stream does once per round.
#[derive(Clone, Copy)]
enum Transfer<'a> {
    Download,
    Upload(&'a Upload),
}

/// Where a phase's rounds get their bytes from.
#[derive(Clone, Copy)]
enum Source<'a> {
    Network(Transfer<'a>),
    Synthetic { latency_ms: f64 },
}

impl Source<'_> {
    fn is_synthetic(&self) -> bool {
        matches!(self, Source::Synthetic { .. })
    }
}

impl<T: Transport> SpeedProbe<T> {
    /// Run one throughput phase. When the network cannot move a single
    /// byte and fallback is enabled, the phase restarts on the synthetic
    /// model before any round has been reported.
    pub(crate) async fn measure_throughput(
        &self,
        direction: Direction,
        progress: &dyn ProgressCallback,
    ) -> Result<ThroughputResult, ProbeError> {
        let config = self.config.throughput(direction);

        if self.is_simulated_only() {
            return self
                .measure_rounds(direction, self.synthetic_source(), progress)
                .await;
        }

        let payload = match direction {
            Direction::Upload => Some(self.with_rng(|rng| {
                Upload::random(rng, config.transfer_bytes as usize)
            })),
            Direction::Download => None,
        };
        let transfer = match payload {
            Some(ref upload) => Transfer::Upload(upload),
            None => Transfer::Download,
        };

        match self
            .measure_rounds(direction, Source::Network(transfer), progress)
            .await
        {
            Ok(result) => Ok(result),
            Err(e) if self.config.allow_fallback => {
                warn!("{}; using simulated {} rounds", e.message, direction.as_str());
                self.measure_rounds(direction, self.synthetic_source(), progress)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    fn synthetic_source(&self) -> Source<'static> {
        Source::Synthetic {
            latency_ms: self
                .smoothed_latency()
                .unwrap_or(simulated::DEFAULT_LATENCY_MS),
        }
    }

    /// Warm up, then measure rounds until the phase is stable, runs out of
    /// time, or hits the round cap.
    async fn measure_rounds(
        &self,
        direction: Direction,
        source: Source<'_>,
        progress: &dyn ProgressCallback,
    ) -> Result<ThroughputResult, ProbeError> {
        let config = self.config.throughput(direction);

        if source.is_synthetic() {
            sleep(config.warmup).await;
        } else if !config.warmup.is_zero() {
            let warmup_start = Instant::now();
            let mut warmup_rounds = 0;
            while warmup_start.elapsed() < config.warmup {
                let (round, error) = self.round(direction, config, source).await;
                if round.bytes == 0 {
                    return Err(unavailable(direction, error));
                }
                warmup_rounds += 1;
            }
            debug!(
                "{}: {} warm-up rounds discarded",
                direction.as_str(),
                warmup_rounds
            );
        }

        let start = Instant::now();
        let mut tracker = StabilityTracker::new(
            config.stability_tolerance,
            config.stability_window,
        );
        let mut rounds = Vec::with_capacity(config.max_rounds);
        let mut stable = false;

        while rounds.len() < config.max_rounds && start.elapsed() < config.max_duration
        {
            let (round, error) = self.round(direction, config, source).await;

            if rounds.is_empty() && round.bytes == 0 {
                return Err(unavailable(direction, error));
            }
            if let Some(e) = error {
                debug!("{}: stream failed: {}", direction.as_str(), e.message);
            }

            let mbps = round.mbps();
            let stable_rounds = tracker.observe(mbps);
            rounds.push(round);

            progress.on_progress(ProgressEvent::Round {
                direction,
                round: rounds.len(),
                mbps,
                bytes: round.bytes,
                stable_rounds,
                simulated: source.is_synthetic(),
            });

            if tracker.is_stable(start.elapsed(), config.min_duration) {
                stable = true;
                break;
            }
        }

        let result =
            summarize(&rounds, config.trim_fraction, stable, source.is_synthetic());

        info!(
            "{}: {:.2} Mbps over {} rounds (stable: {}, simulated: {})",
            direction.as_str(),
            result.mbps,
            result.rounds,
            result.stable,
            result.simulated
        );

        Ok(result)
    }

    async fn round(
        &self,
        direction: Direction,
        config: &ThroughputConfig,
        source: Source<'_>,
    ) -> (Measurement, Option<ProbeError>) {
        match source {
            Source::Network(transfer) => self.network_round(config, transfer).await,
            Source::Synthetic { latency_ms } => {
                (self.synthetic_round(direction, config, latency_ms).await, None)
            }
        }
    }

    /// All streams run concurrently; a failed stream moves zero bytes. The
    /// last stream error, if any, comes back alongside the measurement.
    async fn network_round(
        &self,
        config: &ThroughputConfig,
        transfer: Transfer<'_>,
    ) -> (Measurement, Option<ProbeError>) {
        let start = Instant::now();
        let streams = (0..config.parallel_streams)
            .map(|_| self.transfer_once(transfer));
        let outcomes = join_all(streams).await;
        let elapsed = start.elapsed();

        let mut bytes = 0;
        let mut last_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(moved) => bytes += moved,
                Err(e) => last_error = Some(e),
            }
        }

        (Measurement::new(bytes, elapsed), last_error)
    }

    async fn transfer_once(&self, transfer: Transfer<'_>) -> Result<u64, ProbeError> {
        let timeout = self.config.transfer_timeout;

        match transfer {
            Transfer::Download => {
                first_success("download", &self.config.endpoints.download, |endpoint| {
                    let request = Download { size_hint: endpoint.size_hint };
                    async move {
                        send(&self.transport, &endpoint.url, &request, timeout).await
                    }
                })
                .await
                .into_result("download")
            }
            Transfer::Upload(payload) => {
                first_success("upload", &self.config.endpoints.upload, |url| {
                    send(&self.transport, url, payload, timeout)
                })
                .await
                .into_result("upload")
            }
        }
    }

    /// One jittered target rate per round, split evenly across the streams.
    async fn synthetic_round(
        &self,
        direction: Direction,
        config: &ThroughputConfig,
        latency_ms: f64,
    ) -> Measurement {
        let streams = config.parallel_streams.max(1);
        let transfers: Vec<(u64, std::time::Duration)> = self.with_rng(|rng| {
            let per_stream =
                simulated::sample_mbps(rng, direction, latency_ms) / streams as f64;
            (0..streams)
                .map(|_| {
                    simulated::synthetic_transfer(
                        per_stream,
                        config.transfer_bytes,
                        self.config.simulated_delay_cap,
                    )
                })
                .collect()
        });

        let start = Instant::now();
        join_all(transfers.iter().map(|(_, duration)| sleep(*duration))).await;

        Measurement::new(
            transfers.iter().map(|(bytes, _)| bytes).sum(),
            start.elapsed(),
        )
    }
}

fn unavailable(direction: Direction, error: Option<ProbeError>) -> ProbeError {
    match error {
        Some(e) => e,
        None => ProbeError::measurement(format!(
            "{}: no bytes transferred",
            direction.as_str()
        )),
    }
}

/// Overall rate is total bits over total round time; the stable estimate
/// is the trimmed mean of the per-round rates.
fn summarize(
    rounds: &[Measurement],
    trim_fraction: f64,
    stable: bool,
    simulated: bool,
) -> ThroughputResult {
    let mbps = aggregate_mbps(rounds);
    let per_round: Vec<f64> = rounds.iter().map(Measurement::mbps).collect();

    ThroughputResult {
        mbps,
        stable_mbps: trimmed_mean(&per_round, trim_fraction).unwrap_or(mbps),
        stable,
        rounds: rounds.len(),
        bytes: rounds.iter().map(|r| r.bytes).sum(),
        duration_ms: rounds.iter().map(Measurement::elapsed_ms).sum(),
        simulated,
    }
}
