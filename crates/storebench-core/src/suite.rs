//! Runs both benchmarks across every configured record count.

use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    area::KeyValueArea,
    bench::{BenchError, LocalAreaBenchmark, ObjectDbBenchmark, Phase},
    objectdb::ObjectDbFactory,
    timing::TimingSession,
};

pub const GENERATE: &str = "generate";

#[derive(Clone, Debug)]
pub struct SuiteConfig {
    pub record_counts: Vec<usize>,
    pub db_name: String,
    pub store_name: String,
    pub db_version: u32,
}

impl SuiteConfig {
    /// Record counts must be non-empty, positive and distinct; timing
    /// labels are keyed by count.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.record_counts.is_empty() {
            return Err(BenchError::Config("no record counts configured".to_string()));
        }
        let mut seen = BTreeSet::new();
        for &count in &self.record_counts {
            if count == 0 {
                return Err(BenchError::Config("record counts must be positive".to_string()));
            }
            if !seen.insert(count) {
                return Err(BenchError::Config(format!("record count {count} listed twice")));
            }
        }
        Ok(())
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            record_counts: vec![1, 10, 100, 1000],
            db_name: "benchmarkObjectDb".to_string(),
            store_name: "benchmarkValues".to_string(),
            db_version: 1,
        }
    }
}

/// One row of the results table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub record_count: usize,
    pub phase: Phase,
    pub local_area_millis: f64,
    pub object_db_millis: f64,
}

/// Shared, append-only view of the rows produced by [`BenchmarkSuite::run`].
#[derive(Clone, Debug, Default)]
pub struct ResultsTable {
    rows: Arc<RwLock<Vec<BenchmarkResult>>>,
}

impl ResultsTable {
    pub async fn snapshot(&self) -> Vec<BenchmarkResult> {
        self.rows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn push(&self, row: BenchmarkResult) {
        self.rows.write().await.push(row);
    }

    async fn clear(&self) {
        self.rows.write().await.clear();
    }
}

/// Inbound request; only `{"message": "generate"}` does anything. Any
/// other `message` value, of any JSON type, is accepted and ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message: Option<Value>,
}

impl Message {
    pub fn generate() -> Self {
        Self {
            message: Some(Value::String(GENERATE.to_string())),
        }
    }

    pub fn is_generate(&self) -> bool {
        matches!(&self.message, Some(Value::String(message)) if message == GENERATE)
    }
}

#[derive(Debug)]
pub struct BenchmarkSuite<A> {
    config: SuiteConfig,
    local_area: LocalAreaBenchmark<A>,
    object_db: ObjectDbBenchmark,
    results: ResultsTable,
}

impl<A: KeyValueArea> BenchmarkSuite<A> {
    pub fn new(config: SuiteConfig, area: A, factory: ObjectDbFactory) -> Self {
        let object_db = ObjectDbBenchmark::new(
            factory,
            config.db_name.clone(),
            config.store_name.clone(),
            config.db_version,
        );
        Self {
            config,
            local_area: LocalAreaBenchmark::new(area),
            object_db,
            results: ResultsTable::default(),
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Handle to the table filled by [`run`](Self::run).
    pub fn results(&self) -> ResultsTable {
        self.results.clone()
    }

    pub fn local_area(&self) -> &LocalAreaBenchmark<A> {
        &self.local_area
    }

    pub fn object_db(&self) -> &ObjectDbBenchmark {
        &self.object_db
    }

    /// Fills the results table with one row per record count and phase.
    /// An invalid config is rejected before the table or any store is touched.
    ///
    /// The set pass and the get pass each get their own timing session. For
    /// every count the local area is measured before the object store. Get
    /// rows keep the get duration.
    pub async fn run(&mut self) -> Result<(), BenchError> {
        self.config.validate()?;
        self.results.clear().await;

        for phase in [Phase::Set, Phase::Get] {
            let include_get = phase == Phase::Get;
            let mut session = TimingSession::new();

            for &record_count in &self.config.record_counts {
                let local_area = self.local_area.run(&mut session, record_count, include_get).await?;
                let object_db = self.object_db.run(&mut session, record_count, include_get).await?;

                self.results
                    .push(BenchmarkResult {
                        record_count,
                        phase,
                        local_area_millis: local_area.duration(),
                        object_db_millis: object_db.duration(),
                    })
                    .await;
            }
        }

        let rows = self.results.len().await;
        info!(rows, "benchmark suite finished");
        Ok(())
    }

    /// Message-driven variant: logs every phase instead of tabulating.
    ///
    /// Returns `Ok(false)` for anything other than a generate request.
    pub async fn handle_message(&mut self, message: &Message) -> Result<bool, BenchError> {
        if !message.is_generate() {
            debug!(message = ?message.message, "ignoring message");
            return Ok(false);
        }
        self.config.validate()?;

        let mut session = TimingSession::new();
        for &record_count in &self.config.record_counts {
            self.local_area.run(&mut session, record_count, true).await?;
        }
        for &record_count in &self.config.record_counts {
            self.object_db.run(&mut session, record_count, true).await?;
        }
        Ok(true)
    }
}
