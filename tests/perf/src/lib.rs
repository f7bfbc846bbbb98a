// Performance tests for both benchmarked stores
// Run with: cargo test -p perf --release -- --nocapture --test-threads=1

mod storage_perf;
mod http_perf;
