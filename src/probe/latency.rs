use crate::errors::ProbeError;
use crate::fallback::first_success;
use crate::measurements::jitter_f64;
use crate::network::requests::ping::Ping;
use crate::network::requests::send;
use crate::network::Transport;
use crate::probe::engine::SpeedProbe;
use crate::probe::simulated;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::results::LatencyResult;
use crate::stats::{mean, min_max};
use log::debug;
use tokio::time::{sleep, Instant};

impl<T: Transport> SpeedProbe<T> {
    /// Take the configured number of latency samples. A sample no endpoint
    /// answers is drawn from the fallback range when fallback is enabled.
    pub(crate) async fn measure_latency(
        &self,
        progress: &dyn ProgressCallback,
    ) -> Result<LatencyResult, ProbeError> {
        let config = &self.config.latency;
        let total = config.samples;
        let mut samples = Vec::with_capacity(total);
        let mut simulated_samples = 0;

        for current in 1..=total {
            if current > 1 && !config.interval.is_zero() {
                sleep(config.interval).await;
            }

            let (value_ms, simulated) = if self.is_simulated_only() {
                (self.synthetic_latency(), true)
            } else {
                match self.ping_once().await {
                    Ok(value_ms) => (value_ms, false),
                    Err(e) if self.config.allow_fallback => {
                        debug!("ping sample {}/{}: {}", current, total, e.message);
                        (self.synthetic_latency(), true)
                    }
                    Err(e) => return Err(e),
                }
            };

            if simulated {
                simulated_samples += 1;
            }
            samples.push(value_ms);

            progress.on_progress(ProgressEvent::LatencySample {
                value_ms,
                current,
                total,
                simulated,
            });
        }

        let avg_ms = mean(&samples)
            .ok_or_else(|| ProbeError::measurement("ping: no samples taken"))?;
        let (min_ms, max_ms) = min_max(&samples).unwrap_or((avg_ms, avg_ms));
        let smoothed = self.record_latency(avg_ms);

        debug!(
            "Latency {:.1} ms over {} samples ({} simulated), smoothed {:.1} ms",
            avg_ms, total, simulated_samples, smoothed
        );

        Ok(LatencyResult {
            avg_ms,
            min_ms,
            max_ms,
            jitter_ms: jitter_f64(&samples),
            samples: samples.len(),
            simulated_samples,
            simulated: simulated_samples > 0,
        })
    }

    /// Time a single request against the first ping endpoint that answers.
    /// Only the successful request is timed.
    async fn ping_once(&self) -> Result<f64, ProbeError> {
        let timeout = self.config.lookup_timeout;

        first_success("ping", &self.config.endpoints.ping, |url| async move {
            let start = Instant::now();
            send(&self.transport, url, &Ping, timeout).await?;
            Ok(start.elapsed().as_secs_f64() * 1000.0)
        })
        .await
        .into_result("ping")
    }

    fn synthetic_latency(&self) -> f64 {
        let range = &self.config.latency.fallback_range_ms;
        self.with_rng(|rng| simulated::sample_latency_ms(rng, range))
    }
}
