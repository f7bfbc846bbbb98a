/// Key written at `index` during a run over `record_count` records.
pub fn benchmark_key(record_count: usize, index: usize) -> String {
    format!("benchmarkKey-{record_count}-{index}")
}

/// Value written at `index`; independent of the record count.
pub fn benchmark_value(index: usize) -> String {
    format!("benchmarkValue{index}")
}
