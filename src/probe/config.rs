use crate::errors::ProbeError;
use crate::progress::Direction;
use std::ops::RangeInclusive;
use std::time::Duration;
use url::Url;

/// Where measurements come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    /// Try the configured endpoints, fall back to synthetic values.
    #[default]
    RealNetworkFirst,
    /// Never touch the network.
    SimulatedOnly,
}

/// A download candidate and the payload size it is known to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEndpoint {
    pub url: Url,
    pub size_hint: Option<u64>,
}

impl DownloadEndpoint {
    pub fn new(url: Url, size_hint: Option<u64>) -> Self {
        Self { url, size_hint }
    }
}

/// Candidate endpoints per phase, in trial order.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub ip: Vec<Url>,
    pub ping: Vec<Url>,
    pub download: Vec<DownloadEndpoint>,
    pub upload: Vec<Url>,
}

const DEFAULT_IP_ENDPOINTS: &[&str] = &[
    "https://api.ipify.org?format=json",
    "https://ipapi.co/json/",
    "https://ipinfo.io/json",
];

const DEFAULT_PING_ENDPOINTS: &[&str] = &[
    "https://httpbin.org/get",
    "https://jsonplaceholder.typicode.com/posts/1",
    "https://api.github.com",
];

const DEFAULT_DOWNLOAD_ENDPOINTS: &[(&str, Option<u64>)] = &[
    ("https://httpbin.org/bytes/102400", Some(102_400)),
    ("https://httpbin.org/stream-bytes/102400", Some(102_400)),
    ("https://jsonplaceholder.typicode.com/photos", None),
];

const DEFAULT_UPLOAD_ENDPOINTS: &[&str] = &[
    "https://httpbin.org/post",
    "https://jsonplaceholder.typicode.com/posts",
];

/// Parse a list of endpoint URLs.
pub fn parse_urls<S: AsRef<str>>(urls: &[S]) -> Result<Vec<Url>, ProbeError> {
    urls.iter()
        .map(|url| {
            Url::parse(url.as_ref())
                .map_err(|e| ProbeError::from(e).context(url.as_ref()))
        })
        .collect()
}

impl Default for Endpoints {
    fn default() -> Self {
        // Literals, checked by test_default_endpoints_all_parse.
        let parse = |url: &str| Url::parse(url).ok();

        Self {
            ip: DEFAULT_IP_ENDPOINTS.iter().filter_map(|u| parse(*u)).collect(),
            ping: DEFAULT_PING_ENDPOINTS
                .iter()
                .filter_map(|u| parse(*u))
                .collect(),
            download: DEFAULT_DOWNLOAD_ENDPOINTS
                .iter()
                .filter_map(|(u, hint)| {
                    parse(*u).map(|url| DownloadEndpoint::new(url, *hint))
                })
                .collect(),
            upload: DEFAULT_UPLOAD_ENDPOINTS
                .iter()
                .filter_map(|u| parse(*u))
                .collect(),
        }
    }
}

/// Configuration for the latency phase.
#[derive(Debug, Clone)]
pub struct LatencyConfig {
    /// Number of samples.
    /// Default: 10
    pub samples: usize,
    /// Pause between samples.
    /// Default: 50ms
    pub interval: Duration,
    /// Range a synthesized sample is drawn from, in ms.
    /// Default: 50..=150
    pub fallback_range_ms: RangeInclusive<f64>,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            samples: 10,
            interval: Duration::from_millis(50),
            fallback_range_ms: 50.0..=150.0,
        }
    }
}

/// Configuration for one throughput phase.
#[derive(Debug, Clone)]
pub struct ThroughputConfig {
    /// Concurrent transfers per round.
    pub parallel_streams: usize,
    /// Time spent before measuring; results are discarded.
    pub warmup: Duration,
    /// Stability is not declared before this.
    pub min_duration: Duration,
    /// No round starts after this.
    pub max_duration: Duration,
    /// Round cap.
    pub max_rounds: usize,
    /// Consecutive in-tolerance rounds needed for stability.
    pub stability_window: usize,
    /// Relative round-to-round variation still counted as stable.
    pub stability_tolerance: f64,
    /// Fraction trimmed from each end for the stable estimate.
    pub trim_fraction: f64,
    /// Bytes per stream: upload payload size, and the simulated transfer
    /// size in both directions.
    pub transfer_bytes: u64,
}

impl ThroughputConfig {
    pub fn download() -> Self {
        Self {
            parallel_streams: 4,
            warmup: Duration::from_millis(1000),
            min_duration: Duration::from_millis(3000),
            max_duration: Duration::from_millis(10_000),
            max_rounds: 20,
            stability_window: 3,
            stability_tolerance: 0.15,
            trim_fraction: 0.1,
            transfer_bytes: 1_000_000,
        }
    }

    pub fn upload() -> Self {
        Self {
            parallel_streams: 2,
            warmup: Duration::from_millis(500),
            min_duration: Duration::from_millis(3000),
            max_duration: Duration::from_millis(10_000),
            max_rounds: 15,
            stability_window: 3,
            stability_tolerance: 0.25,
            trim_fraction: 0.1,
            transfer_bytes: 262_144,
        }
    }

    fn validate(&self, direction: Direction) -> Result<(), ProbeError> {
        let name = direction.as_str();

        if self.parallel_streams == 0 {
            return Err(ProbeError::config(format!(
                "{}: parallel_streams must be at least 1",
                name
            )));
        }
        if self.max_rounds == 0 {
            return Err(ProbeError::config(format!(
                "{}: max_rounds must be at least 1",
                name
            )));
        }
        if !(self.stability_tolerance > 0.0 && self.stability_tolerance < 1.0)
        {
            return Err(ProbeError::config(format!(
                "{}: stability_tolerance must be between 0 and 1, got {}",
                name, self.stability_tolerance
            )));
        }
        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(ProbeError::config(format!(
                "{}: trim_fraction must be in [0, 0.5), got {}",
                name, self.trim_fraction
            )));
        }
        if self.max_duration.is_zero() {
            return Err(ProbeError::config(format!(
                "{}: max_duration must be greater than zero",
                name
            )));
        }
        if self.min_duration > self.max_duration {
            return Err(ProbeError::config(format!(
                "{}: min_duration ({:?}) exceeds max_duration ({:?})",
                name, self.min_duration, self.max_duration
            )));
        }
        if self.transfer_bytes == 0 {
            return Err(ProbeError::config(format!(
                "{}: transfer_bytes must be at least 1",
                name
            )));
        }

        Ok(())
    }
}

/// Everything a `SpeedProbe` needs to know.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub mode: ProbeMode,
    /// Replace failed measurements with synthetic values.
    /// Default: true
    pub allow_fallback: bool,
    pub endpoints: Endpoints,
    /// Timeout for IP lookup and ping requests.
    /// Default: 5s
    pub lookup_timeout: Duration,
    /// Timeout for download and upload requests.
    /// Default: 10s
    pub transfer_timeout: Duration,
    pub latency: LatencyConfig,
    pub download: ThroughputConfig,
    pub upload: ThroughputConfig,
    /// Longest a single simulated stream may sleep.
    /// Default: 2s
    pub simulated_delay_cap: Duration,
    /// Seed for the synthetic model; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            mode: ProbeMode::default(),
            allow_fallback: true,
            endpoints: Endpoints::default(),
            lookup_timeout: Duration::from_secs(5),
            transfer_timeout: Duration::from_secs(10),
            latency: LatencyConfig::default(),
            download: ThroughputConfig::download(),
            upload: ThroughputConfig::upload(),
            simulated_delay_cap: Duration::from_secs(2),
            seed: None,
        }
    }
}

impl ProbeConfig {
    pub fn throughput(&self, direction: Direction) -> &ThroughputConfig {
        match direction {
            Direction::Download => &self.download,
            Direction::Upload => &self.upload,
        }
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.latency.samples == 0 {
            return Err(ProbeError::config(
                "ping: samples must be at least 1",
            ));
        }

        for (name, timeout) in [
            ("lookup_timeout", self.lookup_timeout),
            ("transfer_timeout", self.transfer_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ProbeError::config(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        let range = &self.latency.fallback_range_ms;
        if !(*range.start() >= 0.0 && range.start() <= range.end()) {
            return Err(ProbeError::config(format!(
                "ping: invalid fallback range {:?}",
                range
            )));
        }

        self.download.validate(Direction::Download)?;
        self.upload.validate(Direction::Upload)?;

        if self.mode == ProbeMode::RealNetworkFirst && !self.allow_fallback {
            let empty = [
                ("ip", self.endpoints.ip.is_empty()),
                ("ping", self.endpoints.ping.is_empty()),
                ("download", self.endpoints.download.is_empty()),
                ("upload", self.endpoints.upload.is_empty()),
            ];

            if let Some((phase, _)) = empty.iter().find(|(_, empty)| *empty) {
                return Err(ProbeError::config(format!(
                    "{}: no endpoints configured and fallback is disabled",
                    phase
                )));
            }
        }

        Ok(())
    }
}
