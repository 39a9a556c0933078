use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;

use config::Config;
use db::{NewRequest, RequestStore, SqliteRequestStore};
use error::ApiError;


/// Largest integer an IEEE-754 double holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Deserialize)]
struct SumInput {
    a: Number,
    b: Number,
}

/// Accepts any integral JSON number, including float spellings like `5.0`
/// or `5e0`. Float spellings must stay within the exact-double range.
fn integral_operand(name: &str, value: &Number) -> Result<i64, ApiError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Ok(f as i64),
        _ => Err(ApiError::InvalidBody(format!(
            "`{name}` must be an integer within range, got {value}"
        ))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SumOutput {
    answer: i64,
    id: i64,
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn RequestStore>,
}

impl AppState {
    fn new(store: impl RequestStore + 'static) -> Self {
        Self { store: Arc::new(store) }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sum_api=debug,tower_http=debug".into()),
        )
        .init();

    let store = SqliteRequestStore::connect(&config.database_url).await?;
    info!(rows = store.count().await?, "existing requests");
    let app = make_app(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn make_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sum", post(sum))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn sum(
    State(state): State<AppState>,
    payload: Result<Json<SumInput>, JsonRejection>,
) -> Result<Json<SumOutput>, ApiError> {
    let Json(input) = payload?;
    let a = integral_operand("a", &input.a)?;
    let b = integral_operand("b", &input.b)?;

    let answer = a.checked_add(b).ok_or(ApiError::Overflow { a, b })?;

    let row = state
        .store
        .create(NewRequest { a, b, answer })
        .await?;
    debug!(
        id = row.id,
        a = row.a,
        b = row.b,
        answer = row.answer,
        created_at = %row.created_at,
        "sum recorded"
    );

    Ok(Json(SumOutput { answer, id: row.id }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
