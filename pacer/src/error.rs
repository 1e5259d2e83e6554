use pacer_core::ErrorKind;
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// A request attempt that was abandoned before a response existed.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write request: {0}")]
    Write(#[source] std::io::Error),

    #[error("Cannot read response: {0}")]
    Read(#[source] std::io::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Attempt exceeded its {0:?} deadline")]
    Timeout(Duration),
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Connect { .. } => ErrorKind::Connect,
            RequestError::Write(_) => ErrorKind::Write,
            RequestError::Read(_) => ErrorKind::Read,
            RequestError::Malformed(_) => ErrorKind::Malformed,
            RequestError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Results are closed; the run has already drained")]
    Closed,

    #[error("Results mutex is poisoned.")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for RecordError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] pacer_core::ConfigError),

    #[error("Results could not be collected: {0}")]
    Results(#[from] RecordError),
}
