use crate::errors::ProbeError;
use crate::measurements::LatencySmoother;
use crate::network::{HttpTransport, Transport};
use crate::probe::config::{ProbeConfig, ProbeMode};
use crate::progress::{Direction, ProgressCallback, ProgressEvent, Stage};
use crate::results::{IpInfo, LatencyResult, SessionReport, ThroughputResult};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Mutex, PoisonError};

/// Drives the four measurement phases and assembles the report.
///
/// A probe is cheap to build and holds no connections of its own; the
/// transport decides how requests reach the network. The only state that
/// outlives a run is the smoothed latency, which keys the synthetic
/// throughput model on later runs.
///
/// # Example
/// ```no_run
/// use speed_probe::probe::{ProbeConfig, SpeedProbe};
/// use speed_probe::progress::NoProgress;
///
/// #[tokio::main]
/// async fn main() {
///     let probe = SpeedProbe::new(ProbeConfig::default());
///     let report = probe.run(&NoProgress).await.unwrap();
///     println!("Download: {:.2} Mbps", report.download.mbps);
///     println!("Upload: {:.2} Mbps", report.upload.mbps);
/// }
/// ```
pub struct SpeedProbe<T: Transport = HttpTransport> {
    pub(crate) config: ProbeConfig,
    pub(crate) transport: T,
    rng: Mutex<StdRng>,
    smoother: Mutex<LatencySmoother>,
}

impl SpeedProbe<HttpTransport> {
    /// Create a probe that talks to the network through reqwest.
    pub fn new(config: ProbeConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }
}

impl<T: Transport> SpeedProbe<T> {
    pub fn with_transport(config: ProbeConfig, transport: T) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            transport,
            rng: Mutex::new(rng),
            smoother: Mutex::new(LatencySmoother::default()),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Latency smoothed over every run of this probe so far.
    pub fn smoothed_latency(&self) -> Option<f64> {
        self.smoother.lock().unwrap_or_else(PoisonError::into_inner).value()
    }

    pub(crate) fn record_latency(&self, latency_ms: f64) -> f64 {
        self.smoother
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(latency_ms)
    }

    /// Run `f` with the probe's random source. Never hold this across an
    /// await.
    pub(crate) fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Run the complete sequence: network info, latency, download, upload.
    ///
    /// Every phase reports through `progress`. The sequence ends with a
    /// `Complete` event carrying the report, or with a single `Error`
    /// event whose failure is also returned.
    pub async fn run(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<SessionReport, ProbeError> {
        match self.run_phases(progress).await {
            Ok(report) => {
                progress.on_progress(ProgressEvent::Complete(Box::new(
                    report.clone(),
                )));
                Ok(report)
            }
            Err(e) => {
                warn!("Speed probe failed: {}", e.message);
                progress.on_progress(ProgressEvent::Error(format!(
                    "{}: {}",
                    e.kind.description(),
                    e.message
                )));
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<SessionReport, ProbeError> {
        self.config.validate()?;

        info!(
            "Starting speed probe (mode: {:?}, fallback: {})",
            self.config.mode, self.config.allow_fallback
        );

        progress.on_progress(ProgressEvent::PhaseStarted(Stage::Ip));
        let ip = self.lookup_network_info().await?;
        progress.on_progress(ProgressEvent::PhaseCompleted {
            stage: Stage::Ip,
            message: describe_ip(&ip),
        });

        progress.on_progress(ProgressEvent::PhaseStarted(Stage::Ping));
        let ping = self.measure_latency(progress).await?;
        progress.on_progress(ProgressEvent::PhaseCompleted {
            stage: Stage::Ping,
            message: describe_latency(&ping),
        });

        let mut throughput = Vec::with_capacity(2);
        for direction in [Direction::Download, Direction::Upload] {
            progress.on_progress(ProgressEvent::PhaseStarted(direction.stage()));
            let result = self.measure_throughput(direction, progress).await?;
            progress.on_progress(ProgressEvent::PhaseCompleted {
                stage: direction.stage(),
                message: describe_throughput(&result),
            });
            throughput.push(result);
        }

        let upload = throughput.pop().ok_or_else(|| {
            ProbeError::measurement("upload phase produced no result")
        })?;
        let download = throughput.pop().ok_or_else(|| {
            ProbeError::measurement("download phase produced no result")
        })?;

        let report = SessionReport::new(ip, ping, download, upload);

        info!(
            "Speed probe complete: ping={:.1} ms, download={:.2} Mbps, upload={:.2} Mbps",
            report.ping.avg_ms, report.download.mbps, report.upload.mbps
        );
        if report.has_simulated_values() {
            debug!("Report contains simulated values");
        }

        Ok(report)
    }

    pub(crate) fn is_simulated_only(&self) -> bool {
        self.config.mode == ProbeMode::SimulatedOnly
    }
}

fn simulated_suffix(simulated: bool) -> &'static str {
    if simulated {
        " [simulated]"
    } else {
        ""
    }
}

pub(crate) fn describe_ip(ip: &IpInfo) -> String {
    if ip.is_placeholder() {
        return "lookup failed, using placeholder address".to_string();
    }

    let mut description = format!("{} ({})", ip.ip, ip.country);
    if let Some(ref isp) = ip.isp {
        description.push_str(&format!(" via {}", isp));
    }
    description
}

pub(crate) fn describe_latency(ping: &LatencyResult) -> String {
    format!(
        "{:.1} ms average (min {:.1}, max {:.1}){}",
        ping.avg_ms,
        ping.min_ms,
        ping.max_ms,
        simulated_suffix(ping.simulated)
    )
}

pub(crate) fn describe_throughput(result: &ThroughputResult) -> String {
    format!(
        "{:.2} Mbps (stable estimate {:.2} Mbps, {} rounds{}){}",
        result.mbps,
        result.stable_mbps,
        result.rounds,
        if result.stable { ", stable" } else { "" },
        simulated_suffix(result.simulated)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::network::RawResponse;
    use crate::probe::testing::{fast_config, Recorder, ScriptedTransport};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_total_network_failure() {
        let probe = SpeedProbe::with_transport(
            ProbeConfig { seed: Some(3), ..ProbeConfig::default() },
            ScriptedTransport::failing(),
        );
        let recorder = Recorder::default();

        let report = probe.run(&recorder).await.unwrap();

        assert!(report.ip.is_placeholder());
        assert!(report.ping.avg_ms >= 50.0 && report.ping.avg_ms <= 150.0);
        assert!(report.ping.simulated);
        assert_eq!(report.ping.simulated_samples, report.ping.samples);
        assert!(report.download.mbps > 0.0);
        assert!(report.upload.mbps > 0.0);
        assert!(report.download.simulated && report.upload.simulated);
        assert!(report.download.rounds >= 1);
        assert!(report.download.stable_mbps > 0.0);

        let stages = recorder.phase_boundaries();
        assert_eq!(
            stages,
            vec![
                "start:ip",
                "done:ip",
                "start:ping",
                "done:ping",
                "start:download",
                "done:download",
                "start:upload",
                "done:upload",
                "complete",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_event_carries_report() {
        let probe = SpeedProbe::with_transport(
            fast_config(),
            ScriptedTransport::failing(),
        );
        let recorder = Recorder::default();

        let report = probe.run(&recorder).await.unwrap();

        let events = recorder.events();
        match events.last() {
            Some(ProgressEvent::Complete(carried)) => {
                assert_eq!(**carried, report)
            }
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_healthy_network() {
        let transport = ScriptedTransport::new(|request| {
            let url = request.url.as_str();
            if url.contains("ip") {
                Ok(RawResponse::ok(
                    r#"{"ip":"203.0.113.5","country_code":"SG"}"#,
                ))
            } else if url.contains("down") {
                Ok(RawResponse {
                    status: 200,
                    content_length: Some(500_000),
                    body: Vec::new(),
                })
            } else {
                Ok(RawResponse::ok("{}"))
            }
        })
        .with_delay(Duration::from_millis(20));

        let mut config = fast_config();
        config.endpoints = crate::probe::testing::endpoints(
            &["https://ip.test/json"],
            &["https://ping.test/"],
            &["https://down.test/blob"],
            &["https://up.test/post"],
        );

        let probe = SpeedProbe::with_transport(config, transport);
        let report = probe.run(&Recorder::default()).await.unwrap();

        assert_eq!(report.ip.ip, "203.0.113.5");
        assert!(!report.has_simulated_values());
        assert!((report.ping.avg_ms - 20.0).abs() < 1.0);
        // 2 streams x 500 kB every 20 ms = 400 Mbps.
        assert!((report.download.mbps - 400.0).abs() < 1e-6);
        assert!(report.download.stable);
        assert_eq!(probe.smoothed_latency(), Some(report.ping.avg_ms));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_reports_single_error_event() {
        let mut config = fast_config();
        config.download.parallel_streams = 0;
        let probe =
            SpeedProbe::with_transport(config, ScriptedTransport::failing());
        let recorder = Recorder::default();

        let error = probe.run(&recorder).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Config);
        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage(), Stage::Error);
        assert!(events[0].message().unwrap().contains("parallel_streams"));
        assert!(probe.transport().requested_urls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fallback_surfaces_failure_and_stops() {
        let mut config = fast_config();
        config.allow_fallback = false;
        let probe =
            SpeedProbe::with_transport(config, ScriptedTransport::failing());
        let recorder = Recorder::default();

        let error = probe.run(&recorder).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Network);
        assert!(error.message.contains("ip lookup"));
        assert_eq!(
            recorder.phase_boundaries(),
            vec!["start:ip", "error"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_only_never_touches_the_network() {
        let mut config = fast_config();
        config.mode = ProbeMode::SimulatedOnly;
        let probe =
            SpeedProbe::with_transport(config, ScriptedTransport::failing());

        let report = probe.run(&Recorder::default()).await.unwrap();

        assert!(probe.transport().requested_urls().is_empty());
        assert!(report.ip.is_placeholder());
        assert!(report.download.simulated);
        assert!(report.download.mbps > 0.0);
    }

    #[test]
    fn test_describe_throughput_marks_simulated() {
        let result = ThroughputResult {
            mbps: 12.5,
            stable_mbps: 12.0,
            stable: true,
            rounds: 5,
            bytes: 1,
            duration_ms: 1.0,
            simulated: true,
        };
        assert_eq!(
            describe_throughput(&result),
            "12.50 Mbps (stable estimate 12.00 Mbps, 5 rounds, stable) [simulated]"
        );
    }
}
