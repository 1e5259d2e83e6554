use std::time::Duration;

/// Multiplier applied to `rate × duration` when pre-sizing result storage.
pub const CAPACITY_FACTOR: f64 = 2.0;

/// Sleeps shorter than this are skipped; the scheduler proceeds straight to the next tick.
pub const MIN_SLEEP: Duration = Duration::from_micros(20);

/// Highest accepted connection rate (requests/second).
pub const MAX_RATE: f64 = 1_000_000.;

/// Floor for the attempt deadline derived from the run duration.
pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Ceiling on result slots reserved up front. Larger runs grow storage as results arrive.
pub const MAX_PRESIZED_SLOTS: usize = 1 << 20;

pub const DEFAULT_RATE: f64 = 100.;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);
