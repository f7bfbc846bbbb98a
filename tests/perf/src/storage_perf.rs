use std::sync::Arc;
use std::time::Instant;
use storebench_core::{
    BenchmarkSuite, KeyValueArea, LocalArea, LocalAreaBenchmark, ObjectDbBenchmark, ObjectDbFactory,
    SuiteConfig, TimingSession, TransactionMode,
};
use tempfile::tempdir;
use tokio::task::JoinSet;

/// Full default suite, printed as a table
#[tokio::test]
async fn default_suite_table() {
    let tmp = tempdir().unwrap();
    let area = LocalArea::open(tmp.path().join("area")).await.unwrap();
    let factory = ObjectDbFactory::new(tmp.path().join("db")).await.unwrap();
    let mut suite = BenchmarkSuite::new(SuiteConfig::default(), area, factory);

    let start = Instant::now();
    suite.run().await.unwrap();
    let elapsed = start.elapsed();

    println!("\n=== Default Suite ===");
    for row in suite.results().snapshot().await {
        println!("{:>5} {:?}: local area {:.2}ms, object db {:.2}ms",
                 row.record_count, row.phase, row.local_area_millis, row.object_db_millis);
    }
    println!("Wall time: {:?}", elapsed);
}

/// In-memory vs snapshotted key-value area at 1000 records
#[tokio::test]
async fn local_area_persistence_overhead() {
    let tmp = tempdir().unwrap();
    let record_count = 1000;

    let memory = LocalAreaBenchmark::new(LocalArea::in_memory());
    let memory_timing = memory.run(&mut TimingSession::new(), record_count, true).await.unwrap();

    let snapshot = LocalAreaBenchmark::new(LocalArea::open(tmp.path()).await.unwrap());
    let snapshot_timing = snapshot.run(&mut TimingSession::new(), record_count, true).await.unwrap();

    assert_eq!(snapshot.area().len().await.unwrap(), record_count);

    println!("\n=== Local Area Persistence Overhead ===");
    println!("Memory set: {:.2}ms ({:.2} ops/sec)",
             memory_timing.set_millis,
             record_count as f64 / (memory_timing.set_millis / 1000.0));
    println!("Snapshot set: {:.2}ms ({:.2} ops/sec)",
             snapshot_timing.set_millis,
             record_count as f64 / (snapshot_timing.set_millis / 1000.0));
    println!("Memory get: {:.2}ms", memory_timing.duration());
    println!("Snapshot get: {:.2}ms", snapshot_timing.duration());
}

/// Serial put/get latency in the object store at each magnitude
#[tokio::test]
async fn object_db_serial_latency() {
    let tmp = tempdir().unwrap();
    let factory = ObjectDbFactory::new(tmp.path()).await.unwrap();
    let mut benchmark = ObjectDbBenchmark::new(factory, "perf", "values", 1);
    let mut session = TimingSession::new();

    println!("\n=== Object Store Serial Latency ===");

    for record_count in [1, 10, 100, 1000] {
        let timing = benchmark.run(&mut session, record_count, true).await.unwrap();
        let get = timing.get.unwrap();
        assert_eq!(get.missing, 0);

        println!("{} records: put {:.2}ms ({:.3}ms avg), get {:.2}ms ({:.3}ms avg)",
                 record_count,
                 timing.set_millis,
                 timing.set_millis / record_count as f64,
                 get.millis,
                 get.millis / record_count as f64);
    }
}

/// Concurrent read-only transactions against one database
#[tokio::test]
async fn object_db_concurrent_readers() {
    let tmp = tempdir().unwrap();
    let factory = ObjectDbFactory::new(tmp.path()).await.unwrap();
    let mut benchmark = ObjectDbBenchmark::new(factory.clone(), "perf", "values", 1);
    benchmark.run(&mut TimingSession::new(), 100, false).await.unwrap();

    let database = Arc::new(factory.open("perf", 1, |_| Ok(())).await.unwrap());
    let num_readers = 20;

    let start = Instant::now();
    let mut tasks = JoinSet::new();

    for _ in 0..num_readers {
        let database = Arc::clone(&database);
        tasks.spawn(async move {
            let transaction = database.transaction(&["values"], TransactionMode::ReadOnly).unwrap();
            let store = transaction.object_store("values").unwrap();
            for i in 0..100 {
                let value = store.get(&format!("benchmarkKey-100-{i}")).await.unwrap();
                assert_eq!(value, Some(format!("benchmarkValue{i}")));
            }
            transaction.commit().await.unwrap();
        });
    }

    while tasks.join_next().await.is_some() {}

    let elapsed = start.elapsed();
    let reads = num_readers * 100;

    println!("\n=== Object Store Concurrent Readers ===");
    println!("Readers: {}", num_readers);
    println!("Total reads: {}", reads);
    println!("Total time: {:?}", elapsed);
    println!("Throughput: {:.2} reads/sec", reads as f64 / elapsed.as_secs_f64());
}
