use clap::Parser;
use pacer_core::{RunConfig, DEFAULT_RATE};
use std::path::{Path, PathBuf};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Open-loop HTTP load generator")]
pub struct Cli {
    /// Connection rate (req/s)
    #[arg(short, long, default_value_t = DEFAULT_RATE)]
    pub rate: f64,

    /// Test duration, either plain seconds (`10`) or a span (`1m30s`)
    #[arg(short, long, default_value = "10", value_parser = parse_duration)]
    pub duration: Duration,

    /// File storing URLs to test, one per line
    #[arg(short('f'), long)]
    pub url_file: Option<PathBuf>,

    /// Drop results with latency of at least this many seconds from the analysis (0 keeps all)
    #[arg(long, default_value_t = 0., value_parser = parse_cutoff)]
    pub analysis_cutoff: f64,

    /// File to dump all results to for later analysis
    #[arg(long)]
    pub results_dump: Option<PathBuf>,

    /// Seed for URL selection; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Deadline per request attempt; derived from the duration when omitted
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Cap on simultaneously open connections; unbounded when omitted
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// URLs to test
    pub urls: Vec<String>,
}

impl Cli {
    pub fn cutoff(&self) -> Option<Duration> {
        if self.analysis_cutoff > 0. {
            Duration::try_from_secs_f64(self.analysis_cutoff).ok()
        } else {
            None
        }
    }

    /// Builds the run configuration. URLs from `--url-file` come first, followed by positional
    /// ones. A file that cannot be read is logged and skipped.
    pub fn to_config(&self) -> RunConfig {
        let mut urls = vec![];
        if let Some(path) = &self.url_file {
            match load_urls(path) {
                Ok(loaded) => urls.extend(loaded),
                Err(err) => error!("Cannot load url file {}: {err}", path.display()),
            }
        }
        urls.extend(self.urls.iter().cloned());

        let mut config = RunConfig::new(urls).rate(self.rate).duration(self.duration);
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if let Some(timeout) = self.timeout {
            config = config.attempt_timeout(timeout);
        }
        if let Some(max) = self.max_in_flight {
            config = config.max_in_flight(max);
        }
        config
    }
}

/// Reads one URL per line, skipping blank lines.
pub fn load_urls(path: &Path) -> std::io::Result<Vec<String>> {
    let data = std::fs::read_to_string(path)?;
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn parse_cutoff(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|err| format!("{err}"))?;
    if secs < 0. || Duration::try_from_secs_f64(secs).is_err() {
        return Err(format!("`{s}` is not a usable number of seconds"));
    }
    Ok(secs)
}

fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    match s.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(s),
    }
}
