//! Serial write/read latency benchmarks for two asynchronous key-value
//! stores: a flat key-value area and a versioned, transactional object
//! store.

pub mod area;
pub mod bench;
pub mod duration;
pub mod objectdb;
pub mod suite;
pub mod timing;
pub mod workload;

pub use area::{AreaError, KeyValueArea, LocalArea};
pub use bench::{BenchError, GetTiming, LocalAreaBenchmark, ObjectDbBenchmark, Phase, RunState, RunTiming};
pub use duration::format_millis;
pub use objectdb::{Database, DbError, ObjectDbFactory, ObjectStore, Transaction, TransactionMode, UpgradeContext};
pub use suite::{BenchmarkResult, BenchmarkSuite, GENERATE, Message, ResultsTable, SuiteConfig};
pub use timing::{TimingError, TimingSession};
