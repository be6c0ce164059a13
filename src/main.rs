extern crate clap;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::debug;
use speed_probe::console::{render_report, ConsoleProgress, DisplayMode};
use speed_probe::errors::{exit_codes, format_error_for_display, ProbeError};
use speed_probe::probe::config::parse_urls;
use speed_probe::probe::{DownloadEndpoint, ProbeConfig, ProbeMode, SpeedProbe};
use std::io::IsTerminal;
use std::process;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Do not touch the network; report synthetic values only
    #[arg(long)]
    simulated: bool,

    /// Fail instead of substituting synthetic values
    #[arg(long)]
    no_fallback: bool,

    /// Number of latency samples
    #[arg(long, value_name = "N")]
    ping_samples: Option<usize>,

    /// Concurrent transfers per round, both directions
    #[arg(long, value_name = "N")]
    streams: Option<usize>,

    /// Warm-up time before measuring, both directions
    #[arg(long, value_name = "MS")]
    warmup_ms: Option<u64>,

    /// Shortest measurement before a phase may be declared stable
    #[arg(long, value_name = "MS")]
    min_duration_ms: Option<u64>,

    /// Longest measurement per phase
    #[arg(long, value_name = "MS")]
    max_duration_ms: Option<u64>,

    /// Round cap per phase
    #[arg(long, value_name = "N")]
    max_rounds: Option<usize>,

    /// Simulated transfer size per download stream
    #[arg(long, value_name = "BYTES")]
    download_bytes: Option<u64>,

    /// Upload payload size per stream
    #[arg(long, value_name = "BYTES")]
    upload_bytes: Option<u64>,

    /// Timeout for every request
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Seed for the synthetic model
    #[arg(long)]
    seed: Option<u64>,

    /// IP lookup endpoint; repeat to build a fallback list
    #[arg(long = "ip-endpoint", value_name = "URL")]
    ip_endpoints: Vec<String>,

    /// Ping endpoint; repeat to build a fallback list
    #[arg(long = "ping-endpoint", value_name = "URL")]
    ping_endpoints: Vec<String>,

    /// Download endpoint; repeat to build a fallback list
    #[arg(long = "download-endpoint", value_name = "URL")]
    download_endpoints: Vec<String>,

    /// Upload endpoint; repeat to build a fallback list
    #[arg(long = "upload-endpoint", value_name = "URL")]
    upload_endpoints: Vec<String>,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    debug!(
        "speed-probe {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("SPEEDPROBE_BUILD_GIT_HASH").unwrap_or("unknown revision")
    );

    let code = match run(&cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("{}", format_error_for_display(&e));
            e.exit_code()
        }
    };

    process::exit(code);
}

async fn run(cli: &Cli) -> Result<(), ProbeError> {
    let mode = DisplayMode::detect(cli.json, std::io::stdout().is_terminal());
    let probe = SpeedProbe::new(build_config(cli)?);
    let progress = ConsoleProgress::new(mode);

    let report = tokio::select! {
        result = probe.run(&progress) => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            process::exit(exit_codes::INTERRUPTED);
        }
    };

    match mode {
        DisplayMode::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?)
        }
        DisplayMode::Text | DisplayMode::Silent => {
            print!("{}", render_report(&report))
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<ProbeConfig, ProbeError> {
    let mut config = ProbeConfig {
        seed: cli.seed,
        allow_fallback: !cli.no_fallback,
        ..ProbeConfig::default()
    };

    if cli.simulated {
        config.mode = ProbeMode::SimulatedOnly;
    }

    if let Some(samples) = cli.ping_samples {
        config.latency.samples = samples;
    }

    if let Some(secs) = cli.timeout_secs {
        config.lookup_timeout = Duration::from_secs(secs);
        config.transfer_timeout = Duration::from_secs(secs);
    }

    for throughput in [&mut config.download, &mut config.upload] {
        if let Some(streams) = cli.streams {
            throughput.parallel_streams = streams;
        }
        if let Some(ms) = cli.warmup_ms {
            throughput.warmup = Duration::from_millis(ms);
        }
        if let Some(ms) = cli.min_duration_ms {
            throughput.min_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = cli.max_duration_ms {
            throughput.max_duration = Duration::from_millis(ms);
        }
        if let Some(rounds) = cli.max_rounds {
            throughput.max_rounds = rounds;
        }
    }

    if let Some(bytes) = cli.download_bytes {
        config.download.transfer_bytes = bytes;
    }
    if let Some(bytes) = cli.upload_bytes {
        config.upload.transfer_bytes = bytes;
    }

    if !cli.ip_endpoints.is_empty() {
        config.endpoints.ip = parse_urls(&cli.ip_endpoints)?;
    }
    if !cli.ping_endpoints.is_empty() {
        config.endpoints.ping = parse_urls(&cli.ping_endpoints)?;
    }
    if !cli.download_endpoints.is_empty() {
        config.endpoints.download = parse_urls(&cli.download_endpoints)?
            .into_iter()
            .map(|url| DownloadEndpoint::new(url, None))
            .collect();
    }
    if !cli.upload_endpoints.is_empty() {
        config.endpoints.upload = parse_urls(&cli.upload_endpoints)?;
    }

    config.validate()?;

    Ok(config)
}
