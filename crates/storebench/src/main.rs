use std::{env, error::Error, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use storebench_core::{
    BenchmarkResult, BenchmarkSuite, LocalArea, Message, ObjectDbFactory, ResultsTable,
    SuiteConfig,
};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type AnyError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        error!("storebench failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AnyError> {
    let settings = Settings::from_env()?;
    let config = SuiteConfig {
        record_counts: settings.record_counts.clone(),
        ..SuiteConfig::default()
    };
    config.validate()?;

    let mut area = LocalArea::open(settings.data_dir.join("local-area")).await?;
    if let Some(quota) = settings.quota_bytes {
        area = area.with_quota(quota);
    }
    let mut factory = ObjectDbFactory::new(settings.data_dir.join("object-db")).await?;
    if let Some(records) = settings.record_quota {
        factory = factory.with_record_quota(records);
    }

    let suite = BenchmarkSuite::new(config, area, factory);
    let state = AppState {
        results: suite.results(),
        suite: Arc::new(Mutex::new(suite)),
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_address).await?;
    info!(
        address = %settings.bind_address,
        data_dir = %settings.data_dir.display(),
        counts = ?settings.record_counts,
        "listening"
    );
    axum::serve(listener, router).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    // Runs share the same stores, so only one may be in flight.
    suite: Arc<Mutex<BenchmarkSuite<LocalArea>>>,
    results: ResultsTable,
}

fn build_router(state: AppState) -> Router {
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
        let mut suite = state.suite.lock().await;
        if let Err(err) = suite.handle_message(&message).await {
            error!("generate request failed: {err}");
        }
    });
    StatusCode::ACCEPTED
}

async fn start_suite(State(state): State<AppState>) -> StatusCode {
    tokio::spawn(async move {
        let mut suite = state.suite.lock().await;
        if let Err(err) = suite.run().await {
            error!("benchmark suite failed: {err}");
        }
    });
    StatusCode::ACCEPTED
}

async fn get_results(State(state): State<AppState>) -> Json<Vec<BenchmarkResult>> {
    Json(state.results.snapshot().await)
}

#[derive(Debug)]
struct Settings {
    bind_address: SocketAddr,
    data_dir: PathBuf,
    record_counts: Vec<usize>,
    quota_bytes: Option<usize>,
    record_quota: Option<usize>,
}

impl Settings {
    fn from_env() -> Result<Self, AnyError> {
        let bind_address = env::var("STOREBENCH_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;
        let data_dir =
            PathBuf::from(env::var("STOREBENCH_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let record_counts = match env::var("STOREBENCH_COUNTS") {
            Ok(raw) => parse_counts(&raw)?,
            Err(_) => SuiteConfig::default().record_counts,
        };
        let quota_bytes = env::var("STOREBENCH_QUOTA_BYTES")
            .ok()
            .map(|raw| raw.parse::<usize>())
            .transpose()?;
        let record_quota = env::var("STOREBENCH_RECORD_QUOTA")
            .ok()
            .map(|raw| raw.parse::<usize>())
            .transpose()?;
        Ok(Self {
            bind_address,
            data_dir,
            record_counts,
            quota_bytes,
            record_quota,
        })
    }
}

/// Validation happens in [`SuiteConfig::validate`].
fn parse_counts(raw: &str) -> Result<Vec<usize>, AnyError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<usize>().map_err(AnyError::from))
        .collect()
}
