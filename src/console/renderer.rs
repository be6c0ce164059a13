//! Text rendering of progress events and the final report.

use crate::progress::{ProgressEvent, Stage};
use crate::results::{LatencyResult, SessionReport, ThroughputResult};
use colored::{Color, Colorize};

/// Get color for speed value based on thresholds.
///
/// - Green: >= 100 Mbps (fast)
/// - Yellow: 25-100 Mbps (moderate)
/// - Red: < 25 Mbps (slow)
pub fn speed_color(speed_mbps: f64) -> Color {
    if speed_mbps >= 100.0 {
        Color::Green
    } else if speed_mbps >= 25.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

pub fn format_speed(speed_mbps: f64) -> String {
    format!("{:.2} Mbps", speed_mbps)
}

pub fn format_latency(latency_ms: f64) -> String {
    format!("{:.2} ms", latency_ms)
}

/// Format a byte count for display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1000;
    const MB: u64 = 1000 * KB;
    const GB: u64 = 1000 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} kB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn simulated_tag(simulated: bool) -> String {
    if simulated {
        format!(" {}", "(simulated)".dimmed())
    } else {
        String::new()
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Ip => "Network info",
        Stage::Ping => "Latency",
        Stage::Download => "Download",
        Stage::Upload => "Upload",
        Stage::Complete => "Complete",
        Stage::Error => "Error",
    }
}

/// One progress line, or `None` for events that are not printed.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::PhaseStarted(stage) => {
            Some(format!("{}...", stage_label(*stage).bold().white()))
        }
        ProgressEvent::LatencySample { value_ms, current, total, simulated } => {
            Some(format!(
                "  sample {}/{}: {}{}",
                current,
                total,
                format_latency(*value_ms),
                simulated_tag(*simulated)
            ))
        }
        ProgressEvent::Round { round, mbps, bytes, stable_rounds, simulated, .. } => {
            Some(format!(
                "  round {}: {} ({}, {} stable){}",
                round,
                format_speed(*mbps).color(speed_color(*mbps)),
                format_bytes(*bytes),
                stable_rounds,
                simulated_tag(*simulated)
            ))
        }
        ProgressEvent::PhaseCompleted { stage, message } => Some(format!(
            "{} {}: {}",
            "✓".green(),
            stage_label(*stage),
            message
        )),
        ProgressEvent::Complete(_) => None,
        ProgressEvent::Error(message) => {
            Some(format!("{} {}", "✗".red(), message.red()))
        }
    }
}

fn render_latency(ping: &LatencyResult) -> String {
    let mut out = format!(
        "{} {} {}{}\n",
        "Latency:".bold().white(),
        format_latency(ping.avg_ms).bright_blue(),
        format!(
            "(min {}, max {})",
            format_latency(ping.min_ms),
            format_latency(ping.max_ms)
        )
        .bright_blue(),
        simulated_tag(ping.simulated)
    );

    if let Some(jitter) = ping.jitter_ms {
        out.push_str(&format!(
            "{} {}\n",
            "Jitter:".bold().white(),
            format_latency(jitter)
        ));
    }

    if ping.simulated_samples > 0 {
        out.push_str(&format!(
            "  {} of {} samples simulated\n",
            ping.simulated_samples, ping.samples
        ));
    }

    out
}

fn render_throughput(label: &str, result: &ThroughputResult) -> String {
    let stability = if result.stable { "stable" } else { "not stable" };

    format!(
        "{} {} {}{}\n",
        label.bold().white(),
        format_speed(result.mbps).color(speed_color(result.mbps)).bold(),
        format!(
            "(trimmed {}, {} rounds, {}, {})",
            format_speed(result.stable_mbps),
            result.rounds,
            format_bytes(result.bytes),
            stability
        )
        .bright_cyan(),
        simulated_tag(result.simulated)
    )
}

/// The final report as printed on stdout in text and silent modes.
pub fn render_report(report: &SessionReport) -> String {
    let ip = &report.ip;
    let mut location = ip.country.clone();
    if let Some(ref city) = ip.city {
        location = format!("{}, {}", city, location);
    }

    let mut out = format!(
        "{} {} {}{}\n",
        "Your IP:".bold().white(),
        ip.ip.bright_blue(),
        format!("({})", location).bright_blue(),
        simulated_tag(ip.simulated)
    );
    if let Some(ref isp) = ip.isp {
        out.push_str(&format!("{} {}\n", "Network:".bold().white(), isp));
    }

    out.push_str(&render_latency(&report.ping));
    out.push_str(&render_throughput("Download speed:", &report.download));
    out.push_str(&render_throughput("Upload speed:", &report.upload));

    if report.has_simulated_values() {
        out.push_str(&format!(
            "{}\n",
            "Some values are simulated because the network could not be measured."
                .yellow()
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Direction;
    use crate::results::IpInfo;

    fn report(simulated: bool) -> SessionReport {
        let throughput = ThroughputResult {
            mbps: 87.5,
            stable_mbps: 86.0,
            stable: true,
            rounds: 6,
            bytes: 24_000_000,
            duration_ms: 2194.0,
            simulated,
        };
        let mut ip = IpInfo::new("203.0.113.5".to_string(), "SG".to_string());
        ip.city = Some("Singapore".to_string());

        SessionReport::new(
            ip,
            LatencyResult {
                avg_ms: 12.0,
                min_ms: 10.0,
                max_ms: 15.5,
                jitter_ms: Some(1.25),
                samples: 10,
                simulated_samples: 0,
                simulated: false,
            },
            throughput.clone(),
            throughput,
        )
    }

    #[test]
    fn test_speed_color_thresholds() {
        assert_eq!(speed_color(250.0), Color::Green);
        assert_eq!(speed_color(100.0), Color::Green);
        assert_eq!(speed_color(25.0), Color::Yellow);
        assert_eq!(speed_color(24.9), Color::Red);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(102_400), "102.4 kB");
        assert_eq!(format_bytes(24_000_000), "24.0 MB");
        assert_eq!(format_bytes(3_500_000_000), "3.5 GB");
    }

    #[test]
    fn test_report_lists_every_phase() {
        colored::control::set_override(false);
        let text = render_report(&report(false));

        assert!(text.contains("Your IP: 203.0.113.5 (Singapore, SG)"));
        assert!(text.contains("Latency: 12.00 ms (min 10.00 ms, max 15.50 ms)"));
        assert!(text.contains("Jitter: 1.25 ms"));
        assert!(text.contains("Download speed: 87.50 Mbps"));
        assert!(text.contains("Upload speed: 87.50 Mbps"));
        assert!(!text.contains("simulated"));
    }

    #[test]
    fn test_report_flags_simulated_values() {
        colored::control::set_override(false);
        let text = render_report(&report(true));

        assert!(text.contains("87.50 Mbps (trimmed 86.00 Mbps, 6 rounds, 24.0 MB, stable) (simulated)"));
        assert!(text.contains("Some values are simulated"));
    }

    #[test]
    fn test_complete_event_is_not_printed() {
        colored::control::set_override(false);
        let complete = ProgressEvent::Complete(Box::new(report(false)));
        assert_eq!(format_event(&complete), None);

        let round = ProgressEvent::Round {
            direction: Direction::Upload,
            round: 2,
            mbps: 12.0,
            bytes: 524_288,
            stable_rounds: 1,
            simulated: false,
        };
        assert_eq!(
            format_event(&round).as_deref(),
            Some("  round 2: 12.00 Mbps (524.3 kB, 1 stable)")
        );
    }
}
