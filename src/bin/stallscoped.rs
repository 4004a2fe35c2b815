//! stallscoped - CPU pressure sampling daemon.
//!
//! Periodically samples CPU utilization from /proc counters and keeps a
//! short in-memory history. On shutdown the recorded history is printed,
//! as plain text or JSON, for correlating CPU pressure with stalls.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use stallscope::sampler::{CpuSampler, SamplerConfig};
use stallscope::source::CounterSource;
#[cfg(not(target_os = "linux"))]
use stallscope::source::mock::SyntheticSource;
#[cfg(target_os = "linux")]
use stallscope::source::{CommandSource, DirectSource, RealFs, select_source};
use stallscope::ticker::Ticker;

/// How often the main thread logs the latest sample.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// CPU pressure sampling daemon.
#[derive(Parser)]
#[command(name = "stallscoped", about = "CPU pressure sampling daemon", version)]
struct Args {
    /// Sampling interval in milliseconds.
    #[arg(short, long, default_value = "1000")]
    interval_ms: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Keep only the most recent sample instead of the last ten.
    #[arg(long)]
    recent_only: bool,

    /// Counter acquisition strategy.
    #[arg(long, value_enum, default_value_t = Strategy::Auto)]
    strategy: Strategy,

    /// Append raw captured counter lines to this file (command strategy only).
    #[arg(long, value_name = "PATH")]
    dump_file: Option<PathBuf>,

    /// Stop after this many seconds. 0 runs until interrupted.
    #[arg(short, long, default_value = "0")]
    duration_secs: u64,

    /// Print the final sample history as JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum Strategy {
    /// Probe counter file readability once and pick automatically.
    Auto,
    /// Always read counter files directly.
    Direct,
    /// Always capture through a spawned reader process.
    Command,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("stallscoped={}", level).parse().unwrap())
        .add_directive(format!("stallscope={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(target_os = "linux")]
fn make_source(args: &Args) -> Box<dyn CounterSource> {
    match args.strategy {
        Strategy::Auto => select_source(&args.proc_path, args.dump_file.clone()),
        Strategy::Direct => Box::new(DirectSource::new(RealFs::new(), args.proc_path.clone())),
        Strategy::Command => {
            let mut source = CommandSource::new(args.proc_path.clone());
            if let Some(path) = args.dump_file.clone() {
                source = source.with_dump_file(path);
            }
            Box::new(source)
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn make_source(_args: &Args) -> Box<dyn CounterSource> {
    Box::new(SyntheticSource::new())
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let interval = Duration::from_millis(args.interval_ms);
    let max_entries = if args.recent_only { 1 } else { 10 };

    info!("stallscoped {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}ms, proc={}, strategy={:?}, history={} entries",
        args.interval_ms, args.proc_path, args.strategy, max_entries
    );

    let source = make_source(&args);
    info!("Counter source: {}", source.name());

    let config = SamplerConfig {
        sample_interval: interval,
        max_entries,
        pid: None,
    };
    let mut sampler = CpuSampler::new(config, source);
    sampler.start();
    let history = sampler.history();

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let ticker = match Ticker::spawn("stallscope-sampler", interval, move || sampler.sample()) {
        Ok(ticker) => ticker,
        Err(e) => {
            error!("Failed to spawn sampler thread: {}", e);
            return;
        }
    };

    info!("Sampling started");

    let deadline =
        (args.duration_secs > 0).then(|| Instant::now() + Duration::from_secs(args.duration_secs));
    let mut last_heartbeat = Instant::now();

    while running.load(Ordering::SeqCst) {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            info!("Configured run duration reached");
            break;
        }

        if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            last_heartbeat = Instant::now();
            match history.snapshot_all().last() {
                Some(entry) => {
                    info!("Latest sample: {} ({} entries)", entry.rates, history.len());
                }
                None => debug!("No samples recorded yet"),
            }
        }

        std::thread::sleep(Duration::from_millis(100));
    }

    // Graceful shutdown
    info!("Shutting down...");
    ticker.stop();

    let entries = history.snapshot_all();
    if entries.is_empty() {
        info!("No samples recorded");
    } else if args.json {
        match serde_json::to_string_pretty(&entries) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize sample history: {}", e),
        }
    } else {
        print!("{}", history.format_report());
    }

    info!("Shutdown complete");
}
