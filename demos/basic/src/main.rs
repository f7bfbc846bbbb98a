use storebench_core::{BenchmarkSuite, LocalArea, ObjectDbFactory, SuiteConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let area = LocalArea::open("demo-data/local-area").await?;
    let factory = ObjectDbFactory::new("demo-data/object-db").await?;
    let mut suite = BenchmarkSuite::new(SuiteConfig::default(), area, factory);

    suite.run().await?;

    println!("{:>8}  {:<5}  {:>14}  {:>14}", "records", "phase", "local area ms", "object db ms");
    for row in suite.results().snapshot().await {
        println!(
            "{:>8}  {:<5}  {:>14.2}  {:>14.2}",
            row.record_count,
            format!("{:?}", row.phase).to_lowercase(),
            row.local_area_millis,
            row.object_db_millis
        );
    }

    suite.object_db().factory().delete_database(&suite.config().db_name).await?;
    std::fs::remove_dir_all("demo-data")?;
    Ok(())
}
