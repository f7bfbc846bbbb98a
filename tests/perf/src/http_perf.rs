use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storebench_core::{
    BenchmarkResult, BenchmarkSuite, LocalArea, Message, ObjectDbFactory, ResultsTable, SuiteConfig,
};
use tempfile::{tempdir, TempDir};
use tokio::sync::Mutex;

#[derive(Clone)]
struct AppState {
    suite: Arc<Mutex<BenchmarkSuite<LocalArea>>>,
    results: ResultsTable,
}

fn build_test_router(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(post_message))
        .route("/suite", post(start_suite))
        .route("/results", get(get_results))
        .with_state(state)
}

async fn post_message(State(state): State<AppState>, Json(message): Json<Message>) -> StatusCode {
    if !message.is_generate() {
        return StatusCode::NO_CONTENT;
    }
    tokio::spawn(async move {
        let _ = state.suite.lock().await.handle_message(&message).await;
    });
    StatusCode::ACCEPTED
}

async fn start_suite(State(state): State<AppState>) -> StatusCode {
    tokio::spawn(async move {
        let _ = state.suite.lock().await.run().await;
    });
    StatusCode::ACCEPTED
}

async fn get_results(State(state): State<AppState>) -> Json<Vec<BenchmarkResult>> {
    Json(state.results.snapshot().await)
}

/// Start a test server in the background
async fn start_test_server(counts: Vec<usize>) -> (String, TempDir, tokio::task::JoinHandle<()>) {
    let tmp = tempdir().unwrap();
    let area = LocalArea::open(tmp.path().join("area")).await.unwrap();
    let factory = ObjectDbFactory::new(tmp.path().join("db")).await.unwrap();
    let config = SuiteConfig {
        record_counts: counts,
        ..SuiteConfig::default()
    };
    let suite = BenchmarkSuite::new(config, area, factory);
    let state = AppState {
        results: suite.results(),
        suite: Arc::new(Mutex::new(suite)),
    };
    let router = build_test_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 0)); // Random port
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", bound_addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    (base_url, tmp, handle)
}

#[tokio::test]
async fn http_generate_is_accepted_immediately() {
    let (base_url, _tmp, _server) = start_test_server(vec![1, 10, 100, 1000]).await;
    let client = reqwest::Client::new();

    println!("\n=== HTTP Generate Latency ===");

    let start = Instant::now();
    let response = client
        .post(format!("{}/messages", base_url))
        .json(&Message::generate())
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.bytes().await.unwrap().is_empty());
    println!("Accepted in {:?}", elapsed);
}

#[tokio::test]
async fn http_other_messages_are_ignored() {
    let (base_url, _tmp, _server) = start_test_server(vec![1]).await;
    let client = reqwest::Client::new();

    let bodies = [
        serde_json::json!({ "message": "refresh" }),
        serde_json::json!({ "message": 42 }),
        serde_json::json!({ "message": null }),
        serde_json::json!({}),
    ];

    for body in &bodies {
        let response = client
            .post(format!("{}/messages", base_url))
            .json(body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{}", body);
    }
}

#[tokio::test]
async fn http_suite_round_trip() {
    let (base_url, _tmp, _server) = start_test_server(vec![1, 10, 100]).await;
    let client = reqwest::Client::new();

    println!("\n=== HTTP Suite Round Trip ===");

    let start = Instant::now();
    let response = client.post(format!("{}/suite", base_url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let rows = loop {
        let rows: Vec<BenchmarkResult> = client
            .get(format!("{}/results", base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if rows.len() == 6 {
            break rows;
        }
        assert!(start.elapsed() < Duration::from_secs(60), "suite did not finish");
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    let elapsed = start.elapsed();

    for row in &rows {
        println!("{:>4} {:?}: local area {:.2}ms, object db {:.2}ms",
                 row.record_count, row.phase, row.local_area_millis, row.object_db_millis);
    }
    println!("Total time: {:?}", elapsed);
}
