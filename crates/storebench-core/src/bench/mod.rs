//! Serial set/get benchmarks for both storage backends.

mod local_area;
mod object_db;
mod runner;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{area::AreaError, objectdb::DbError, timing::TimingError};

pub use local_area::LocalAreaBenchmark;
pub use object_db::{ObjectDbBenchmark, RunState};
pub use runner::{Timed, time_serial};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Set,
    Get,
}

/// Read-back half of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GetTiming {
    pub millis: f64,
    /// Keys that came back without a value.
    pub missing: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunTiming {
    pub record_count: usize,
    pub set_millis: f64,
    pub get: Option<GetTiming>,
}

impl RunTiming {
    pub fn phase(&self) -> Phase {
        if self.get.is_some() { Phase::Get } else { Phase::Set }
    }

    /// Duration of the last phase that ran.
    pub fn duration(&self) -> f64 {
        self.get.map_or(self.set_millis, |get| get.millis)
    }
}

/// Counts the reads that returned nothing and reports a shortfall. Never fails.
pub(crate) fn check_read_back(backend: &str, record_count: usize, values: &[Option<String>]) -> usize {
    let found = values.iter().filter(|value| value.is_some()).count();
    if found != record_count {
        tracing::warn!(
            backend,
            record_count,
            found,
            "not all entries were successfully saved"
        );
    }
    record_count - found.min(record_count)
}

/// A run over zero records would time nothing.
pub(crate) fn ensure_positive(record_count: usize) -> Result<(), BenchError> {
    if record_count == 0 {
        return Err(BenchError::Config("record count must be positive".to_string()));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid benchmark config: {0}")]
    Config(String),
    #[error("object store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),
    #[error("key-value area operation failed: {0}")]
    Area(#[from] AreaError),
    #[error("object store request failed: {0}")]
    ObjectStore(#[from] DbError),
    #[error("timing error: {0}")]
    Timing(#[from] TimingError),
}
