//! Synthetic values used when the network cannot provide real ones.
//!
//! Throughput is drawn from a bracket chosen by latency, nudged by a small
//! jitter, and turned into a (bytes, duration) pair that is consistent with
//! the drawn rate so downstream arithmetic cannot tell it apart.

use crate::progress::Direction;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Latency assumed when nothing has been measured yet.
pub const DEFAULT_LATENCY_MS: f64 = 100.0;

/// Multiplicative jitter applied to every drawn rate.
pub const JITTER: f64 = 0.05;

/// Throughput range for connections below a latency bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Exclusive upper latency bound in ms.
    pub below_latency_ms: f64,
    pub min_mbps: f64,
    pub max_mbps: f64,
}

const fn bracket(below_latency_ms: f64, min_mbps: f64, max_mbps: f64) -> Bracket {
    Bracket { below_latency_ms, min_mbps, max_mbps }
}

pub const DOWNLOAD_BRACKETS: [Bracket; 5] = [
    bracket(20.0, 150.0, 500.0),
    bracket(50.0, 50.0, 150.0),
    bracket(100.0, 20.0, 50.0),
    bracket(200.0, 5.0, 20.0),
    bracket(f64::INFINITY, 1.0, 5.0),
];

pub const UPLOAD_BRACKETS: [Bracket; 5] = [
    bracket(20.0, 50.0, 200.0),
    bracket(50.0, 20.0, 50.0),
    bracket(100.0, 5.0, 20.0),
    bracket(200.0, 2.0, 5.0),
    bracket(f64::INFINITY, 0.5, 2.0),
];

/// The bracket a connection with `latency_ms` falls into.
pub fn bracket_for(direction: Direction, latency_ms: f64) -> Bracket {
    let brackets = match direction {
        Direction::Download => &DOWNLOAD_BRACKETS,
        Direction::Upload => &UPLOAD_BRACKETS,
    };

    let latency_ms = if latency_ms.is_finite() && latency_ms >= 0.0 {
        latency_ms
    } else {
        DEFAULT_LATENCY_MS
    };

    brackets
        .iter()
        .copied()
        .find(|b| latency_ms < b.below_latency_ms)
        .unwrap_or(brackets[brackets.len() - 1])
}

/// Draw a rate from the bracket and apply jitter.
pub fn sample_mbps<R: Rng>(
    rng: &mut R,
    direction: Direction,
    latency_ms: f64,
) -> f64 {
    let bracket = bracket_for(direction, latency_ms);
    let base = rng.gen_range(bracket.min_mbps..=bracket.max_mbps);

    apply_jitter(rng, base)
}

fn apply_jitter<R: Rng>(rng: &mut R, mbps: f64) -> f64 {
    mbps * (1.0 + rng.gen_range(-JITTER..=JITTER))
}

/// A latency sample from the fallback range.
pub fn sample_latency_ms<R: Rng>(
    rng: &mut R,
    range: &RangeInclusive<f64>,
) -> f64 {
    rng.gen_range(range.clone())
}

/// How long "transferring" `bytes` at `mbps` takes, capped at `cap`. When
/// the cap applies, the byte count shrinks so that bytes over duration
/// still equals `mbps`.
pub fn synthetic_transfer(mbps: f64, bytes: u64, cap: Duration) -> (u64, Duration) {
    if mbps <= 0.0 || bytes == 0 {
        return (0, Duration::ZERO);
    }

    let bits_per_sec = mbps * 1_000_000.0;
    let secs = bytes as f64 * 8.0 / bits_per_sec;

    if secs <= cap.as_secs_f64() {
        return (bytes, Duration::from_secs_f64(secs));
    }

    let capped_bytes = (bits_per_sec * cap.as_secs_f64() / 8.0).floor() as u64;
    let secs = capped_bytes as f64 * 8.0 / bits_per_sec;

    (capped_bytes, Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bracket_selection() {
        assert_eq!(bracket_for(Direction::Download, 5.0).min_mbps, 150.0);
        assert_eq!(bracket_for(Direction::Download, 20.0).min_mbps, 50.0);
        assert_eq!(bracket_for(Direction::Download, 120.0).max_mbps, 20.0);
        assert_eq!(bracket_for(Direction::Download, 900.0).max_mbps, 5.0);
        assert_eq!(bracket_for(Direction::Upload, 30.0).max_mbps, 50.0);
    }

    #[test]
    fn test_nonsense_latency_uses_default_bracket() {
        let default = bracket_for(Direction::Download, DEFAULT_LATENCY_MS);
        assert_eq!(bracket_for(Direction::Download, f64::NAN), default);
        assert_eq!(bracket_for(Direction::Download, -3.0), default);
    }

    #[test]
    fn test_uncapped_transfer() {
        // 1 MB at 80 Mbps takes 100ms.
        let (bytes, duration) =
            synthetic_transfer(80.0, 1_000_000, Duration::from_secs(2));
        assert_eq!(bytes, 1_000_000);
        assert!((duration.as_secs_f64() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_capped_transfer_shrinks_bytes() {
        // 1 MB at 1 Mbps would take 8s.
        let (bytes, duration) =
            synthetic_transfer(1.0, 1_000_000, Duration::from_secs(2));
        assert_eq!(bytes, 250_000);
        assert!((duration.as_secs_f64() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(
            sample_mbps(&mut a, Direction::Upload, 60.0),
            sample_mbps(&mut b, Direction::Upload, 60.0)
        );
    }

    proptest! {
        #[test]
        fn sampled_rate_stays_in_jittered_bracket(
            seed in any::<u64>(),
            latency in 0.0f64..2000.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            for direction in [Direction::Download, Direction::Upload] {
                let bracket = bracket_for(direction, latency);
                let mbps = sample_mbps(&mut rng, direction, latency);
                prop_assert!(mbps >= bracket.min_mbps * (1.0 - JITTER) - 1e-9);
                prop_assert!(mbps <= bracket.max_mbps * (1.0 + JITTER) + 1e-9);
            }
        }

        #[test]
        fn synthetic_transfer_is_self_consistent(
            mbps in 0.1f64..1000.0,
            bytes in 1_000u64..50_000_000,
        ) {
            let (moved, duration) =
                synthetic_transfer(mbps, bytes, Duration::from_secs(2));
            prop_assert!(moved <= bytes);
            prop_assert!(duration <= Duration::from_secs(2));
            let measured = moved as f64 * 8.0 / duration.as_secs_f64() / 1e6;
            prop_assert!((measured - mbps).abs() <= mbps * 1e-3);
        }

        #[test]
        fn synthetic_latency_stays_in_range(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let value = sample_latency_ms(&mut rng, &(50.0..=150.0));
            prop_assert!((50.0..=150.0).contains(&value));
        }
    }
}
