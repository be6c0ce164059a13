//! Scripted transport and progress recorder shared by the probe tests.

use crate::errors::ProbeError;
use crate::network::{RawRequest, RawResponse, Transport};
use crate::probe::config::{
    parse_urls, DownloadEndpoint, Endpoints, ProbeConfig,
};
use crate::progress::{ProgressCallback, ProgressEvent};
use std::sync::Mutex;
use std::time::Duration;

type Handler =
    Box<dyn Fn(&RawRequest) -> Result<RawResponse, ProbeError> + Send + Sync>;

/// Answers every request with `handler` after `delay`, recording the URL.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    delay: Duration,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&RawRequest) -> Result<RawResponse, ProbeError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Every request is refused.
    pub(crate) fn failing() -> Self {
        Self::new(|_| Err(ProbeError::network("connection refused")))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: RawRequest,
    ) -> Result<RawResponse, ProbeError> {
        self.requested.lock().unwrap().push(request.url.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        (self.handler)(&request)
    }
}

/// Keeps every event it is given.
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<ProgressEvent>>,
}

impl Recorder {
    pub(crate) fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Phase starts and ends plus the terminal event, e.g. `start:ip`,
    /// `done:ip`, `complete`.
    pub(crate) fn phase_boundaries(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::PhaseStarted(stage) => {
                    Some(format!("start:{}", stage))
                }
                ProgressEvent::PhaseCompleted { stage, .. } => {
                    Some(format!("done:{}", stage))
                }
                ProgressEvent::Complete(_) => Some("complete".to_string()),
                ProgressEvent::Error(_) => Some("error".to_string()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub(crate) fn endpoints(
    ip: &[&str],
    ping: &[&str],
    download: &[&str],
    upload: &[&str],
) -> Endpoints {
    Endpoints {
        ip: parse_urls(ip).unwrap(),
        ping: parse_urls(ping).unwrap(),
        download: parse_urls(download)
            .unwrap()
            .into_iter()
            .map(|url| DownloadEndpoint::new(url, None))
            .collect(),
        upload: parse_urls(upload).unwrap(),
    }
}

/// Short phases and a fixed seed.
pub(crate) fn fast_config() -> ProbeConfig {
    let mut config = ProbeConfig {
        seed: Some(7),
        ..ProbeConfig::default()
    };

    config.latency.samples = 3;
    config.latency.interval = Duration::from_millis(10);

    for throughput in [&mut config.download, &mut config.upload] {
        throughput.parallel_streams = 2;
        throughput.warmup = Duration::from_millis(100);
        throughput.min_duration = Duration::from_millis(100);
        throughput.max_duration = Duration::from_secs(1);
        throughput.max_rounds = 10;
        throughput.stability_window = 2;
        throughput.stability_tolerance = 0.15;
        throughput.trim_fraction = 0.1;
        throughput.transfer_bytes = 100_000;
    }

    config
}
