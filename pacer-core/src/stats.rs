use crate::RunResults;
use pdatastructs::tdigest::{TDigest, K1};
use std::fmt;
use std::time::Duration;
use tracing::{error, warn};

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Quantiles reported for every latency series.
pub const REPORTED_QUANTILES: [f64; 5] = [0.5, 0.9, 0.99, 0.999, 0.9999];

/// Descriptive statistics over one latency series.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    /// Samples excluded by the analysis cutoff.
    pub dropped: usize,
    pub mean: Duration,
    pub stddev: Duration,
    pub max: Duration,
    /// `(quantile, latency)` pairs, one per entry of [`REPORTED_QUANTILES`].
    pub percentiles: Vec<(f64, Duration)>,
}

impl LatencySummary {
    /// Summarizes `latencies`, ignoring samples at or above `cutoff` when one is given.
    pub fn from_latencies(latencies: &[Duration], cutoff: Option<Duration>) -> Self {
        let secs: Vec<f64> = latencies
            .iter()
            .filter(|l| cutoff.map_or(true, |c| **l < c))
            .map(Duration::as_secs_f64)
            .collect();

        let dropped = latencies.len() - secs.len();
        if dropped > 0 {
            warn!("Dropped {dropped} measurements due to cutoff");
        }

        if secs.is_empty() {
            return Self {
                count: 0,
                dropped,
                mean: Duration::ZERO,
                stddev: Duration::ZERO,
                max: Duration::ZERO,
                percentiles: REPORTED_QUANTILES
                    .iter()
                    .map(|q| (*q, Duration::ZERO))
                    .collect(),
            };
        }

        let mean = statistical::mean(&secs);
        let stddev = statistical::population_standard_deviation(&secs, Some(mean));
        let max = secs.iter().copied().fold(0., f64::max);

        let mut digest = default_tdigest();
        for s in &secs {
            digest.insert(*s);
        }

        let percentiles = REPORTED_QUANTILES
            .iter()
            .map(|q| (*q, quantile(&digest, *q)))
            .collect();

        Self {
            count: secs.len(),
            dropped,
            mean: to_duration(mean),
            stddev: to_duration(stddev),
            max: to_duration(max),
            percentiles,
        }
    }

    pub fn percentile(&self, quantile: f64) -> Option<Duration> {
        self.percentiles
            .iter()
            .find(|(q, _)| (*q - quantile).abs() < f64::EPSILON)
            .map(|(_, d)| *d)
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Average:      {:?}", self.mean)?;
        writeln!(f, "Stddev:       {:?}", self.stddev)?;
        writeln!(f, "Max:          {:?}", self.max)?;
        writeln!(f, "Percentiles:")?;
        for (q, latency) in &self.percentiles {
            let label = format!("{}%:", q * 100.);
            writeln!(f, "     {label:<8}{latency:?}")?;
        }
        Ok(())
    }
}

/// Run-level summary handed to reporting. Latency figures cover successful outcomes only.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub issued: u64,
    pub attempted: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub errored: u64,
    pub late_ticks: u64,
    pub shed_ticks: u64,
    /// Issued attempts per second of wall-clock run time.
    pub achieved_rate: f64,
    pub connect: LatencySummary,
    pub response: LatencySummary,
}

impl RunStatistics {
    pub fn from_results(results: &RunResults, cutoff: Option<Duration>) -> Self {
        let connect: Vec<Duration> = results.successes().map(|o| o.connect_latency).collect();
        let response: Vec<Duration> = results.successes().map(|o| o.response_latency).collect();

        let achieved_rate = if results.elapsed.is_zero() {
            0.
        } else {
            results.issued as f64 / results.elapsed.as_secs_f64()
        };

        Self {
            issued: results.issued,
            attempted: results.attempted(),
            succeeded: results.succeeded(),
            failed: results.failed(),
            errored: results.errored(),
            late_ticks: results.late_ticks,
            shed_ticks: results.shed_ticks,
            achieved_rate,
            connect: LatencySummary::from_latencies(&connect, cutoff),
            response: LatencySummary::from_latencies(&response, cutoff),
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Requests count:  {}", self.succeeded)?;
        writeln!(
            f,
            "Attempted={} Succeeded={} Failed={} Errored={} (issued {}, {:.2} req/s)",
            self.attempted,
            self.succeeded,
            self.failed,
            self.errored,
            self.issued,
            self.achieved_rate,
        )?;
        if self.late_ticks > 0 || self.shed_ticks > 0 {
            writeln!(f, "Late ticks={} Shed ticks={}", self.late_ticks, self.shed_ticks)?;
        }
        writeln!(f, "Connect latencies:")?;
        write!(f, "{}", self.connect)?;
        writeln!(f, "Request latencies:")?;
        write!(f, "{}", self.response)
    }
}

fn quantile(digest: &TDigest<K1>, quantile: f64) -> Duration {
    let secs = digest.quantile(quantile);

    // TDigest can hand back NaN on degenerate inputs.
    let secs = if secs.is_finite() {
        secs
    } else {
        error!("Non-finite quantile {quantile} computed; reporting zero.");
        0.
    };

    to_duration(secs)
}

fn to_duration(secs: f64) -> Duration {
    Duration::from_secs_f64(secs.max(0.))
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestOutcome;

    fn millis(range: std::ops::RangeInclusive<u64>) -> Vec<Duration> {
        range.map(Duration::from_millis).collect()
    }

    #[test]
    fn test_summary_uniform() {
        let summary = LatencySummary::from_latencies(&millis(1..=100), None);

        assert_eq!(summary.count, 100);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.max, Duration::from_millis(100));
        assert!((summary.mean.as_secs_f64() - 0.0505).abs() < 1e-6);
        // Population stddev of 1..=100 is ~28.87
        assert!((summary.stddev.as_secs_f64() - 0.028866).abs() < 1e-4);

        let p50 = summary.percentile(0.5).unwrap().as_secs_f64();
        assert!((0.035..=0.065).contains(&p50), "p50 = {p50}");
        let p90 = summary.percentile(0.9).unwrap().as_secs_f64();
        assert!((0.075..=0.1).contains(&p90), "p90 = {p90}");
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_summary_cutoff() {
        let summary =
            LatencySummary::from_latencies(&millis(1..=10), Some(Duration::from_millis(6)));
        assert_eq!(summary.count, 5);
        assert_eq!(summary.dropped, 5);
        assert_eq!(summary.max, Duration::from_millis(5));
        assert!(logs_contain("Dropped 5 measurements"));
    }

    #[test]
    fn test_summary_empty() {
        let summary = LatencySummary::from_latencies(&[], None);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, Duration::ZERO);
        assert_eq!(summary.percentiles.len(), REPORTED_QUANTILES.len());
    }

    #[test]
    fn test_run_statistics_excludes_failures() {
        let fast = Duration::from_millis(1);
        let slow = Duration::from_secs(5);
        let results = RunResults {
            outcomes: vec![
                RequestOutcome::new(0, fast, fast, 200),
                RequestOutcome::new(1, slow, slow, 500),
                RequestOutcome::new(0, fast, fast, 200),
            ],
            issued: 4,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };

        let stats = RunStatistics::from_results(&results, None);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.connect.count, 2);
        assert_eq!(stats.response.max, fast);
        assert!((stats.achieved_rate - 2.).abs() < f64::EPSILON);
    }
}
