#[cfg(test)]
mod tests {
    use storebench_core::{BenchmarkSuite, LocalArea, ObjectDbFactory, SuiteConfig};
    use tempfile::tempdir;

    #[tokio::test]
    async fn suite_fills_results_table() {
        let tmp = tempdir().unwrap();
        let area = LocalArea::open(tmp.path().join("area")).await.unwrap();
        let factory = ObjectDbFactory::new(tmp.path().join("db")).await.unwrap();
        let config = SuiteConfig {
            record_counts: vec![1, 10],
            ..SuiteConfig::default()
        };
        let mut suite = BenchmarkSuite::new(config, area, factory);

        suite.run().await.unwrap();

        let rows = suite.results().snapshot().await;
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.local_area_millis >= 0.0 && row.object_db_millis >= 0.0));
    }
}
