//! fpmstatd - php-fpm status polling daemon.
//!
//! Polls a php-fpm status page on a fixed interval and prints one JSON
//! object per poll on stdout, ready to be piped into a metrics pipeline.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use fpmstat::collector::{Format, StatusCollector};
use fpmstat::config::{CollectorConfig, DEFAULT_URL};
use fpmstat::metrics::Metrics;

/// php-fpm status polling daemon.
#[derive(Parser)]
#[command(name = "fpmstatd", about = "php-fpm status polling daemon", version)]
struct Args {
    /// Status page URL. Add `json` and/or `full` to the query to pick the page variant.
    #[arg(short, long, env = "FPMSTAT_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Request timeout in milliseconds.
    #[arg(short, long, env = "FPMSTAT_TIMEOUT_MS", default_value = "1000")]
    timeout_ms: u64,

    /// Force the body format (json or text) instead of deriving it from the URL.
    #[arg(short, long)]
    format: Option<Format>,

    /// Poll interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Poll once, print the result and exit.
    #[arg(long)]
    once: bool,

    /// Check that the endpoint yields metrics and exit with 0 or 1.
    #[arg(long, conflicts_with = "once")]
    check: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// One line of output.
#[derive(Serialize)]
struct Sample<'a> {
    timestamp: i64,
    url: &'a str,
    metrics: &'a Metrics,
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

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fpmstatd={},fpmstat={}", level, level)));

    // logs go to stderr, stdout carries the samples
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Serializes one sample as a JSON line.
fn render_sample(url: &str, metrics: &Metrics) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Sample {
        timestamp: Utc::now().timestamp(),
        url,
        metrics,
    })
}

/// Polls once and prints the sample. Returns whether metrics were produced.
fn poll_once<F: fpmstat::collector::Fetcher>(collector: &StatusCollector<F>) -> bool {
    let metrics = match collector.try_collect() {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!(url = %collector.url(), error = %e, "poll yielded no metrics");
            return false;
        }
    };

    debug!("Collected {} metrics", metrics.len());
    match render_sample(collector.url(), &metrics) {
        Ok(line) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{}", line).and_then(|_| stdout.flush()) {
                error!("Failed to write sample: {}", e);
            }
        }
        Err(e) => error!("Failed to serialize sample: {}", e),
    }
    true
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = CollectorConfig::new(args.url)
        .with_timeout(Duration::from_millis(args.timeout_ms))
        .with_format(args.format);

    let collector = match StatusCollector::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    info!("fpmstatd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: url={}, timeout={}ms, interval={}s, format={}, detail={:?}",
        collector.url(),
        args.timeout_ms,
        args.interval,
        collector.mode().format,
        collector.mode().detail
    );

    if args.check {
        let ok = collector.check();
        if ok {
            info!("Check passed: {} yields metrics", collector.url());
        } else {
            error!("Check failed: {} yields no metrics", collector.url());
        }
        std::process::exit(if ok { 0 } else { 1 });
    }

    if args.once {
        let ok = poll_once(&collector);
        std::process::exit(if ok { 0 } else { 1 });
    }

    let interval = Duration::from_secs(args.interval.max(1));

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting polling loop");

    let mut polls: u64 = 0;
    let mut failures: u64 = 0;

    while running.load(Ordering::SeqCst) {
        polls += 1;
        if !poll_once(&collector) {
            failures += 1;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete: {} polls, {} without metrics", polls, failures);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpmstat::collector::MockFetcher;

    #[test]
    fn render_sample_embeds_metric_keys() {
        let config = CollectorConfig::new("http://127.0.0.1/status?json");
        let collector = StatusCollector::new(MockFetcher::typical_pool(), &config);
        let metrics = collector.collect().unwrap();

        let line = render_sample(collector.url(), &metrics).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["url"], "http://127.0.0.1/status?json");
        assert_eq!(value["metrics"]["requests"], 21);
        assert_eq!(value["metrics"].as_object().unwrap().len(), 6);
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn poll_once_reports_failure() {
        let config = CollectorConfig::new("http://127.0.0.1/missing");
        let collector = StatusCollector::new(MockFetcher::new(), &config);
        assert!(!poll_once(&collector));
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::try_parse_from(["fpmstatd"]).unwrap();
        assert_eq!(args.url, DEFAULT_URL);
        assert_eq!(args.timeout_ms, 1000);
        assert_eq!(args.interval, 10);
        assert!(args.format.is_none());
    }

    #[test]
    fn args_parse_format() {
        let args = Args::try_parse_from(["fpmstatd", "--format", "json", "--once"]).unwrap();
        assert_eq!(args.format, Some(Format::Json));
        assert!(args.once);
    }
}
