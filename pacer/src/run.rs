//! Run orchestration and the awaitable [`LoadTest`] builder.
use crate::aggregator::Aggregator;
use crate::error::RunError;
use crate::http::Target;
use crate::scheduler::Scheduler;
use crate::worker;
use pacer_core::{RunConfig, RunResults};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Load run handle. Configure with the builder methods, then `.await` it.
///
/// # Example
/// ```no_run
/// use pacer::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let results = LoadTest::new(["http://127.0.0.1:8080/a", "http://127.0.0.1:8080/b"])
///         .rate(50.)
///         .duration(Duration::from_secs(60))
///         .seed(1234)
///         .await
///         .unwrap();
///
///     println!("{} responses", results.count());
/// }
/// ```
#[derive(Clone, Debug)]
pub struct LoadTest {
    config: RunConfig,
}

impl LoadTest {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config: RunConfig::new(urls),
        }
    }

    /// Requests per second to issue.
    pub fn rate(mut self, rate: f64) -> Self {
        self.config = self.config.rate(rate);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.config = self.config.duration(duration);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config = self.config.seed(seed);
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.attempt_timeout(timeout);
        self
    }

    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config = self.config.max_in_flight(max);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

impl From<RunConfig> for LoadTest {
    fn from(config: RunConfig) -> Self {
        Self { config }
    }
}

impl IntoFuture for LoadTest {
    type Output = Result<RunResults, RunError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(run(self.config))
    }
}

/// Validates `config`, runs it to completion and returns the drained results.
///
/// URL selection is seeded from `config.seed` when present, otherwise from entropy.
pub async fn run(config: RunConfig) -> Result<RunResults, RunError> {
    let rng = match config.seed {
        Some(seed) => {
            debug!("Seeding URL selection with {seed}");
            SmallRng::seed_from_u64(seed)
        }
        None => SmallRng::from_entropy(),
    };
    run_with_rng(config, rng).await
}

/// [`run`] with a caller-supplied source for URL selection.
#[instrument(name = "run", skip_all, fields(rate = config.rate))]
pub async fn run_with_rng<R>(config: RunConfig, rng: R) -> Result<RunResults, RunError>
where
    R: Rng + Send,
{
    let urls = config.validate()?;
    info!(
        "Running {} URL(s) at {} req/s for {}",
        urls.len(),
        config.rate,
        humantime::format_duration(config.duration)
    );

    let targets: Vec<Arc<Target>> = urls
        .iter()
        .enumerate()
        .map(|(index, url)| Arc::new(Target::new(index, url)))
        .collect();
    let aggregator = Aggregator::with_capacity(config.planned_capacity());
    let deadline = config.effective_attempt_timeout();
    let max_in_flight = config.max_in_flight;

    let scheduler = Scheduler::new(config.interval(), config.duration, targets.len(), rng)?;
    let schedule = scheduler
        .run(|index| {
            if max_in_flight.is_some_and(|max| aggregator.in_flight() >= max) {
                return false;
            }

            let writer = aggregator.writer();
            let target = targets[index].clone();
            tokio::spawn(
                async move { worker::attempt(&target, writer, deadline).await }.in_current_span(),
            );
            true
        })
        .await;

    if schedule.late_ticks > 0 {
        warn!("Late requests: {}", schedule.late_ticks);
    }
    if schedule.shed_ticks > 0 {
        warn!(
            "Skipped {} ticks at the in-flight cap of {}",
            schedule.shed_ticks,
            max_in_flight.unwrap_or_default()
        );
    }

    let in_flight = aggregator.in_flight();
    if in_flight > 0 {
        info!("Waiting for {in_flight} in-flight requests to finish.");
    }
    let mut results = aggregator.finish().await?;

    results.issued = schedule.issued;
    results.late_ticks = schedule.late_ticks;
    results.shed_ticks = schedule.shed_ticks;
    results.elapsed = schedule.elapsed;

    info!(
        "Run complete: {} issued, {} responses, {} errors",
        results.issued,
        results.count(),
        results.errored()
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::ConfigError;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_empty_urls_refused() {
        let res = LoadTest::new(Vec::<String>::new())
            .rate(10.)
            .duration(Duration::from_millis(100))
            .await;
        assert!(matches!(res, Err(RunError::Config(ConfigError::NoUrls))));
    }

    #[tokio::test]
    async fn test_bad_rate_refused() {
        let res = LoadTest::new(["http://127.0.0.1/"]).rate(0.).await;
        assert!(matches!(
            res,
            Err(RunError::Config(ConfigError::InvalidRate(_)))
        ));
    }

    #[tracing_test::traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refused_connections_drain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let results = LoadTest::new([format!("http://{addr}/")])
            .rate(50.)
            .duration(Duration::from_millis(200))
            .seed(3)
            .await
            .unwrap();

        assert_eq!(results.issued, 10);
        assert_eq!(results.count(), 0);
        assert_eq!(results.errors.connect, 10);
        assert_eq!(results.attempted(), results.issued);
        assert_eq!(results.planned_capacity, 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_in_flight_cap_sheds_ticks() {
        // Accepts but never answers, so every attempt stays in flight until its deadline.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = vec![];
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let results = LoadTest::new([format!("http://{addr}/")])
            .rate(100.)
            .duration(Duration::from_millis(100))
            .attempt_timeout(Duration::from_millis(500))
            .max_in_flight(2)
            .await
            .unwrap();

        assert_eq!(results.issued, 2);
        assert_eq!(results.shed_ticks, 8);
        assert_eq!(results.errors.timeout, 2);
    }
}
