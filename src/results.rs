//! Result data structures for probe output.
//!
//! Every structure serializes to the JSON shape consumers of the report
//! rely on (camelCase keys, optional fields omitted). Each phase result
//! says whether it came from the network or from the synthetic model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Address placeholder used when no lookup endpoint answered.
pub const PLACEHOLDER_IP: &str = "0.0.0.0";
/// Country placeholder used when no lookup endpoint answered.
pub const PLACEHOLDER_COUNTRY: &str = "XX";

/// Public address and rough location of the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpInfo {
    pub ip: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    /// True when this is the placeholder rather than a lookup answer.
    pub simulated: bool,
}

impl IpInfo {
    pub fn new(ip: String, country: String) -> Self {
        Self { ip, country, city: None, isp: None, simulated: false }
    }

    /// The recognizable stand-in returned when every lookup failed.
    pub fn placeholder() -> Self {
        Self {
            ip: PLACEHOLDER_IP.to_string(),
            country: PLACEHOLDER_COUNTRY.to_string(),
            city: None,
            isp: None,
            simulated: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.simulated
            && self.ip == PLACEHOLDER_IP
            && self.country == PLACEHOLDER_COUNTRY
    }
}

/// Summary of the latency phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyResult {
    /// Arithmetic mean of all samples in milliseconds
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Mean absolute difference between consecutive samples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<f64>,
    /// Number of samples taken
    pub samples: usize,
    /// How many of those were synthesized
    pub simulated_samples: usize,
    /// True when any sample was synthesized
    pub simulated: bool,
}

/// Summary of a download or upload phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputResult {
    /// Total bits over total round time, in Mbps
    pub mbps: f64,
    /// Trimmed mean of per-round Mbps
    pub stable_mbps: f64,
    /// Whether the stability window was reached
    pub stable: bool,
    pub rounds: usize,
    pub bytes: u64,
    pub duration_ms: f64,
    /// True when the synthetic model produced these numbers
    pub simulated: bool,
}

/// Everything a run produced. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub ip: IpInfo,
    pub ping: LatencyResult,
    pub download: ThroughputResult,
    pub upload: ThroughputResult,
    /// When the run completed
    pub timestamp: DateTime<Utc>,
}

impl SessionReport {
    /// Assemble a report stamped with the current time.
    pub fn new(
        ip: IpInfo,
        ping: LatencyResult,
        download: ThroughputResult,
        upload: ThroughputResult,
    ) -> Self {
        Self { ip, ping, download, upload, timestamp: Utc::now() }
    }

    /// True when any part of the report came from the synthetic model.
    pub fn has_simulated_values(&self) -> bool {
        self.ip.simulated
            || self.ping.simulated
            || self.download.simulated
            || self.upload.simulated
    }
}
