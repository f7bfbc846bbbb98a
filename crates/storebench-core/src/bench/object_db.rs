use tracing::{debug, info};

use crate::{
    objectdb::{ObjectDbFactory, TransactionMode},
    timing::TimingSession,
    workload::{benchmark_key, benchmark_value},
};

use super::{BenchError, GetTiming, RunTiming, check_read_back, ensure_positive, time_serial};

const BACKEND: &str = "object-db";

/// Lifecycle of a single object-store run. `Failed` is only reachable
/// from `Opening`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Closed,
    Opening,
    Upgrading,
    Open,
    Clearing,
    Writing,
    Reading,
    Resolved,
    Failed,
}

/// Times serial puts and gets inside one read-write transaction.
#[derive(Debug)]
pub struct ObjectDbBenchmark {
    factory: ObjectDbFactory,
    db_name: String,
    store_name: String,
    version: u32,
    history: Vec<RunState>,
}

impl ObjectDbBenchmark {
    pub fn new(
        factory: ObjectDbFactory,
        db_name: impl Into<String>,
        store_name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self {
            factory,
            db_name: db_name.into(),
            store_name: store_name.into(),
            version,
            history: vec![RunState::Closed],
        }
    }

    pub fn factory(&self) -> &ObjectDbFactory {
        &self.factory
    }

    /// States visited by the most recent run, starting at `Closed`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn state(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Closed)
    }

    pub async fn run(
        &mut self,
        session: &mut TimingSession,
        record_count: usize,
        include_get: bool,
    ) -> Result<RunTiming, BenchError> {
        ensure_positive(record_count)?;
        self.history.clear();
        self.enter(RunState::Closed);
        self.enter(RunState::Opening);

        let store_name = self.store_name.clone();
        let mut upgraded = false;
        let opened = self
            .factory
            .open(&self.db_name, self.version, |upgrade| {
                upgraded = true;
                if !upgrade.contains(&store_name) {
                    upgrade.create_object_store(&store_name)?;
                }
                Ok(())
            })
            .await;
        let database = match opened {
            Ok(database) => database,
            Err(err) => {
                self.enter(RunState::Failed);
                return Err(BenchError::StoreUnavailable(err));
            }
        };
        if upgraded {
            self.enter(RunState::Upgrading);
        }
        self.enter(RunState::Open);

        let transaction = database.transaction(&[store_name.as_str()], TransactionMode::ReadWrite)?;
        let store = transaction.object_store(&store_name)?;

        self.enter(RunState::Clearing);
        store.clear().await?;

        self.enter(RunState::Writing);
        let set = time_serial(session, &format!("objectDbPut{record_count}"), record_count, |i| {
            let request = store.put(&benchmark_key(record_count, i), &benchmark_value(i));
            async move { request.await.map_err(BenchError::from) }
        })
        .await?;
        info!(backend = BACKEND, record_count, millis = set.millis, "set phase finished");

        let get = if include_get {
            self.enter(RunState::Reading);
            let get = time_serial(session, &format!("objectDbGet{record_count}"), record_count, |i| {
                let request = store.get(&benchmark_key(record_count, i));
                async move { request.await.map_err(BenchError::from) }
            })
            .await?;
            let missing = check_read_back(BACKEND, record_count, &get.outputs);
            info!(backend = BACKEND, record_count, millis = get.millis, "get phase finished");
            Some(GetTiming {
                millis: get.millis,
                missing,
            })
        } else {
            None
        };

        transaction.commit().await?;
        self.enter(RunState::Resolved);

        Ok(RunTiming {
            record_count,
            set_millis: set.millis,
            get,
        })
    }

    fn enter(&mut self, state: RunState) {
        debug!(backend = BACKEND, ?state, "run state");
        self.history.push(state);
    }
}
