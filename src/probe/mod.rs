//! The measurement sequence: network info, latency, download, upload.

pub mod config;
pub mod engine;
mod latency;
mod network_info;
pub mod simulated;
mod throughput;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{
    DownloadEndpoint, Endpoints, LatencyConfig, ProbeConfig, ProbeMode,
    ThroughputConfig,
};
pub use engine::SpeedProbe;
