#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod aggregator;
mod error;
mod http;
pub mod run;
pub mod scheduler;
mod worker;

pub use error::{RecordError, RequestError, RunError};
pub use run::{run, run_with_rng, LoadTest};

pub mod prelude {
    pub use crate::{LoadTest, RunError};
    pub use pacer_core::{
        ConfigError, LatencySummary, RequestOutcome, RunConfig, RunResults, RunStatistics,
    };
}
