//! Open-loop pacing.
//!
//! Ticks are laid out on a fixed grid (`start + k × interval`) for the length of the run. Each
//! tick picks a target and hands it to a launch callback which must not wait for the request to
//! finish. When the loop falls behind the grid the tick counts as late and the loop proceeds
//! without sleeping; missed time is never made up with a burst.
use pacer_core::{ConfigError, MIN_SLEEP};
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleStats {
    pub ticks: u64,
    /// Ticks whose launch callback started an attempt.
    pub issued: u64,
    pub late_ticks: u64,
    pub shed_ticks: u64,
    pub elapsed: Duration,
}

pub struct Scheduler<R> {
    interval: Duration,
    duration: Duration,
    targets: usize,
    rng: R,
}

impl<R: Rng> Scheduler<R> {
    /// `targets` is the number of URLs to pick from.
    pub fn new(
        interval: Duration,
        duration: Duration,
        targets: usize,
        rng: R,
    ) -> Result<Self, ConfigError> {
        if targets == 0 {
            return Err(ConfigError::NoUrls);
        }
        Ok(Self {
            interval: interval.max(Duration::from_nanos(1)),
            duration,
            targets,
            rng,
        })
    }

    /// Runs the pacing loop. `launch` receives the chosen target index and returns whether an
    /// attempt was started (`false` marks the tick as shed).
    pub async fn run<F>(mut self, mut launch: F) -> ScheduleStats
    where
        F: FnMut(usize) -> bool,
    {
        let start = Instant::now();
        let end = start
            .checked_add(self.duration)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let mut next_tick = start;
        let mut stats = ScheduleStats::default();

        // NOTE: This loop is time-sensitive. Nothing in it may await except the pacing sleep.
        while next_tick < end {
            let index = self.rng.gen_range(0..self.targets);
            stats.ticks += 1;
            if launch(index) {
                stats.issued += 1;
            } else {
                stats.shed_ticks += 1;
            }

            next_tick += self.interval;
            let now = Instant::now();
            if next_tick <= now {
                stats.late_ticks += 1;
                tokio::task::yield_now().await;
            } else if next_tick - now > MIN_SLEEP {
                sleep_until(next_tick).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        stats.elapsed = start.elapsed();
        debug!(
            "Schedule finished: {} ticks in {:?}, {} late",
            stats.ticks, stats.elapsed, stats.late_ticks
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn scheduler(interval_ms: u64, duration_ms: u64, targets: usize) -> Scheduler<SmallRng> {
        Scheduler::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(duration_ms),
            targets,
            SmallRng::seed_from_u64(42),
        )
        .unwrap()
    }

    #[test]
    fn test_no_targets_refused() {
        let res = Scheduler::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
            0,
            SmallRng::seed_from_u64(1),
        );
        assert!(matches!(res, Err(ConfigError::NoUrls)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_count_matches_rate() {
        let mut launched = 0;
        let stats = scheduler(10, 500, 1)
            .run(|_| {
                launched += 1;
                true
            })
            .await;

        assert_eq!(stats.ticks, 50);
        assert_eq!(stats.issued, 50);
        assert_eq!(launched, 50);
        assert_eq!(stats.late_ticks, 0);
        assert_eq!(stats.shed_ticks, 0);
        assert!(stats.elapsed >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_uniform_selection() {
        let mut counts = [0usize; 3];
        let stats = scheduler(1, 600, 3)
            .run(|idx| {
                counts[idx] += 1;
                true
            })
            .await;

        assert_eq!(stats.ticks, 600);
        for count in counts {
            assert!(count > 100, "{counts:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_selection_is_repeatable() {
        let mut first = vec![];
        scheduler(5, 200, 7)
            .run(|idx| {
                first.push(idx);
                true
            })
            .await;

        let mut second = vec![];
        scheduler(5, 200, 7)
            .run(|idx| {
                second.push(idx);
                true
            })
            .await;

        assert_eq!(first.len(), 40);
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_launch_counts_late_ticks() {
        let stats = scheduler(10, 200, 2)
            .run(|_| {
                std::thread::sleep(Duration::from_millis(15));
                true
            })
            .await;

        assert_eq!(stats.ticks, 20);
        assert!(stats.late_ticks > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shed_ticks() {
        let stats = scheduler(10, 100, 1).run(|_| false).await;
        assert_eq!(stats.ticks, 10);
        assert_eq!(stats.issued, 0);
        assert_eq!(stats.shed_ticks, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_issues_nothing() {
        let stats = scheduler(10, 0, 1).run(|_| true).await;
        assert_eq!(stats, ScheduleStats::default());
    }
}
