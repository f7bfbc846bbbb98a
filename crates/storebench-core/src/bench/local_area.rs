use tracing::info;

use crate::{
    area::KeyValueArea,
    timing::TimingSession,
    workload::{benchmark_key, benchmark_value},
};

use super::{BenchError, GetTiming, RunTiming, check_read_back, ensure_positive, time_serial};

const BACKEND: &str = "local-area";

/// Times serial writes and reads against a [`KeyValueArea`].
#[derive(Debug)]
pub struct LocalAreaBenchmark<A> {
    area: A,
}

impl<A: KeyValueArea> LocalAreaBenchmark<A> {
    pub fn new(area: A) -> Self {
        Self { area }
    }

    pub fn area(&self) -> &A {
        &self.area
    }

    pub async fn run(
        &self,
        session: &mut TimingSession,
        record_count: usize,
        include_get: bool,
    ) -> Result<RunTiming, BenchError> {
        ensure_positive(record_count)?;
        self.area.clear().await?;

        let area = &self.area;
        let set = time_serial(session, &format!("localAreaSet{record_count}"), record_count, move |i| {
            let key = benchmark_key(record_count, i);
            let value = benchmark_value(i);
            async move { area.set(&key, &value).await.map_err(BenchError::from) }
        })
        .await?;
        info!(backend = BACKEND, record_count, millis = set.millis, "set phase finished");

        if !include_get {
            return Ok(RunTiming {
                record_count,
                set_millis: set.millis,
                get: None,
            });
        }

        let get = time_serial(session, &format!("localAreaGet{record_count}"), record_count, move |i| {
            let key = benchmark_key(record_count, i);
            async move { area.get(&key).await.map_err(BenchError::from) }
        })
        .await?;
        let missing = check_read_back(BACKEND, record_count, &get.outputs);
        info!(backend = BACKEND, record_count, millis = get.millis, "get phase finished");

        Ok(RunTiming {
            record_count,
            set_millis: set.millis,
            get: Some(GetTiming {
                millis: get.millis,
                missing,
            }),
        })
    }
}
