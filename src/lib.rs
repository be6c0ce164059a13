//! Measure latency, download and upload throughput against public HTTP
//! endpoints.
//!
//! A [`probe::SpeedProbe`] runs four phases in order (network info,
//! latency, download, upload) and reports each through a
//! [`progress::ProgressCallback`]. When the network cannot provide a
//! measurement, the probe substitutes a synthetic one and flags it as
//! `simulated` in the [`results::SessionReport`], unless fallback is
//! disabled.

pub mod console;
pub mod errors;
pub mod fallback;
pub mod measurements;
pub mod network;
pub mod probe;
pub mod progress;
pub mod results;
pub mod stats;
