use std::fmt;
use std::time::Duration;

/// One completed request attempt, i.e. one that got as far as a parsed HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Position of the target in [`crate::RunConfig::urls`].
    pub url_index: usize,
    pub connect_latency: Duration,
    pub response_latency: Duration,
    pub status: u16,
    pub success: bool,
}

impl RequestOutcome {
    pub fn new(
        url_index: usize,
        connect_latency: Duration,
        response_latency: Duration,
        status: u16,
    ) -> Self {
        Self {
            url_index,
            connect_latency,
            response_latency,
            status,
            success: status == 200,
        }
    }
}

/// Reasons an attempt was abandoned before a response existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connect,
    Write,
    Read,
    Malformed,
    Timeout,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Connect,
        ErrorKind::Write,
        ErrorKind::Read,
        ErrorKind::Malformed,
        ErrorKind::Timeout,
    ];
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Connect => "connect",
            ErrorKind::Write => "write",
            ErrorKind::Read => "read",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    pub connect: u64,
    pub write: u64,
    pub read: u64,
    pub malformed: u64,
    pub timeout: u64,
}

impl ErrorCounts {
    pub fn increment(&mut self, kind: ErrorKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: ErrorKind) -> u64 {
        match kind {
            ErrorKind::Connect => self.connect,
            ErrorKind::Write => self.write,
            ErrorKind::Read => self.read,
            ErrorKind::Malformed => self.malformed,
            ErrorKind::Timeout => self.timeout,
        }
    }

    pub fn total(&self) -> u64 {
        ErrorKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }

    fn slot(&mut self, kind: ErrorKind) -> &mut u64 {
        match kind {
            ErrorKind::Connect => &mut self.connect,
            ErrorKind::Write => &mut self.write,
            ErrorKind::Read => &mut self.read,
            ErrorKind::Malformed => &mut self.malformed,
            ErrorKind::Timeout => &mut self.timeout,
        }
    }
}

/// Everything a finished run produced. Outcomes are in completion order; an outcome's slot
/// index is its position in `outcomes`.
#[derive(Debug, Clone, Default)]
pub struct RunResults {
    pub outcomes: Vec<RequestOutcome>,
    /// Attempts that failed before a response was obtained. These hold no slot.
    pub errors: ErrorCounts,
    /// Attempts launched by the scheduler.
    pub issued: u64,
    pub late_ticks: u64,
    /// Ticks skipped because the in-flight cap was reached.
    pub shed_ticks: u64,
    pub planned_capacity: usize,
    /// Outcomes recorded past `planned_capacity`.
    pub overflow: u64,
    /// Wall-clock length of the pacing loop.
    pub elapsed: Duration,
}

impl RunResults {
    pub fn count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Attempts that got a response with a status other than 200.
    pub fn failed(&self) -> usize {
        self.count() - self.succeeded()
    }

    pub fn errored(&self) -> u64 {
        self.errors.total()
    }

    /// Attempts that finished one way or another.
    pub fn attempted(&self) -> u64 {
        self.count() as u64 + self.errored()
    }

    pub fn successes(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.outcomes.iter().filter(|o| o.success)
    }
}
