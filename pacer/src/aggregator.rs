//! Shared results sink written by request workers.
//!
//! Outcomes land in a single mutex-guarded vector; the slot an outcome receives is its index in
//! that vector. Drain is tracked separately from the lock: every launched worker holds a
//! [`Writer`], and [`Aggregator::drain`] resolves only once all of them have been dropped.
use crate::error::RecordError;
use pacer_core::{ErrorCounts, ErrorKind, RequestOutcome, RunResults, MAX_PRESIZED_SLOTS};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};
use tokio::sync::Notify;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Clone)]
pub struct Aggregator {
    shared: Arc<Shared>,
}

struct Shared {
    slots: Mutex<Slots>,
    in_flight: AtomicUsize,
    idle: Notify,
}

struct Slots {
    outcomes: Vec<RequestOutcome>,
    errors: ErrorCounts,
    planned_capacity: usize,
    overflow: u64,
    closed: bool,
}

impl Aggregator {
    /// Creates a sink sized for `planned_capacity` outcomes. At most [`MAX_PRESIZED_SLOTS`] are
    /// reserved up front; overflow is still counted against the full planned figure.
    pub fn with_capacity(planned_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                slots: Mutex::new(Slots {
                    outcomes: Vec::with_capacity(planned_capacity.min(MAX_PRESIZED_SLOTS)),
                    errors: ErrorCounts::default(),
                    planned_capacity,
                    overflow: 0,
                    closed: false,
                }),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Appends an outcome and returns the slot it was assigned.
    ///
    /// Storage grows past the planned capacity rather than dropping; each record beyond it is
    /// counted as overflow.
    pub fn record(&self, outcome: RequestOutcome) -> Result<usize, RecordError> {
        let mut slots = self.shared.slots.lock()?;
        if slots.closed {
            return Err(RecordError::Closed);
        }

        let slot = slots.outcomes.len();
        if slot >= slots.planned_capacity {
            if slots.overflow == 0 {
                warn!(
                    "Results exceeded the planned capacity of {} slots; growing storage.",
                    slots.planned_capacity
                );
            }
            slots.overflow += 1;
        }
        slots.outcomes.push(outcome);

        Ok(slot)
    }

    /// Counts an attempt that ended before a response existed. No slot is consumed.
    pub fn record_error(&self, kind: ErrorKind) -> Result<(), RecordError> {
        let mut slots = self.shared.slots.lock()?;
        if slots.closed {
            return Err(RecordError::Closed);
        }
        slots.errors.increment(kind);
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .outcomes
            .len()
    }

    /// Registers a new concurrent writer. Drain waits until the returned handle is dropped.
    pub fn writer(&self) -> Writer {
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        Writer {
            aggregator: self.clone(),
        }
    }

    /// Writers currently alive.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Resolves once no writer is alive.
    pub async fn drain(&self) {
        loop {
            let idle = self.shared.idle.notified();
            tokio::pin!(idle);
            // Register before checking so a release between the check and the await is seen.
            idle.as_mut().enable();

            let remaining = self.in_flight();
            if remaining == 0 {
                return;
            }
            trace!("Waiting on {remaining} in-flight attempts.");
            idle.await;
        }
    }

    /// Waits for drain, then closes the sink and hands back everything recorded.
    ///
    /// Only `outcomes`, `errors`, `planned_capacity` and `overflow` are filled in; scheduling
    /// figures belong to the caller.
    pub async fn finish(&self) -> Result<RunResults, RecordError> {
        self.drain().await;

        let mut slots = self.shared.slots.lock()?;
        slots.closed = true;

        Ok(RunResults {
            outcomes: std::mem::take(&mut slots.outcomes),
            errors: slots.errors,
            planned_capacity: slots.planned_capacity,
            overflow: slots.overflow,
            ..Default::default()
        })
    }

    fn release(&self) {
        if self.shared.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.idle.notify_waiters();
        }
    }
}

/// Completion token held by one in-flight attempt.
pub struct Writer {
    aggregator: Aggregator,
}

impl Writer {
    pub fn record(&self, outcome: RequestOutcome) -> Result<usize, RecordError> {
        self.aggregator.record(outcome)
    }

    pub fn record_error(&self, kind: ErrorKind) -> Result<(), RecordError> {
        self.aggregator.record_error(kind)
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.aggregator.release();
    }
}
