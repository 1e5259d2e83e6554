use crate::{
    ConfigError, CAPACITY_FACTOR, DEFAULT_DURATION, DEFAULT_RATE, MAX_RATE, MIN_ATTEMPT_TIMEOUT,
};
use std::time::Duration;
use url::Url;

/// Immutable description of a single load run.
///
/// Built with chainable setters and checked with [`RunConfig::validate`] before anything is
/// launched.
///
/// # Example
/// ```
/// use pacer_core::RunConfig;
/// use std::time::Duration;
///
/// let config = RunConfig::new(["http://127.0.0.1:8080/"])
///     .rate(250.)
///     .duration(Duration::from_secs(30))
///     .seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub urls: Vec<String>,
    pub rate: f64,
    pub duration: Duration,
    pub seed: Option<u64>,
    pub attempt_timeout: Option<Duration>,
    pub max_in_flight: Option<usize>,
}

impl RunConfig {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            rate: DEFAULT_RATE,
            duration: DEFAULT_DURATION,
            seed: None,
            attempt_timeout: None,
            max_in_flight: None,
        }
    }

    /// Target connection rate in requests per second.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Seed for URL selection. Runs with the same seed pick the same URL sequence.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Deadline for a single attempt, from connect start to the last response byte.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Cap on simultaneously open sockets. Unset by default, which keeps the generator fully
    /// open-loop; when set, ticks arriving at the cap launch nothing and are counted as shed.
    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Checks the configuration and returns the parsed target URLs, in order.
    pub fn validate(&self) -> Result<Vec<Url>, ConfigError> {
        if self.urls.is_empty() {
            return Err(ConfigError::NoUrls);
        }

        if !self.rate.is_finite() || self.rate <= 0. || self.rate > MAX_RATE {
            return Err(ConfigError::InvalidRate(self.rate));
        }

        if self.duration.is_zero() {
            return Err(ConfigError::InvalidDuration);
        }

        if self.attempt_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidAttemptTimeout);
        }

        if self.max_in_flight == Some(0) {
            return Err(ConfigError::InvalidMaxInFlight);
        }

        self.urls.iter().map(|raw| parse_target(raw)).collect()
    }

    /// Average spacing between two issued requests.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1. / self.rate)
            .unwrap_or(Duration::MAX)
            .max(Duration::from_nanos(1))
    }

    /// Number of requests the run is expected to issue.
    pub fn expected_requests(&self) -> f64 {
        self.rate * self.duration.as_secs_f64()
    }

    /// Result slots reserved up front so the hot path never reallocates in the common case.
    pub fn planned_capacity(&self) -> usize {
        (CAPACITY_FACTOR * self.expected_requests()) as usize
    }

    pub fn effective_attempt_timeout(&self) -> Duration {
        self.attempt_timeout
            .unwrap_or_else(|| self.duration.max(MIN_ATTEMPT_TIMEOUT))
    }
}

fn parse_target(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    if url.scheme() != "http" {
        return Err(ConfigError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingHost {
            url: raw.to_string(),
        });
    }

    Ok(url)
}
