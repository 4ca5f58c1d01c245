//! HTTP server mode for REST API access to jobs and databases

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{SchedulerConfig, ServerConfig};
use crate::database::DatabaseEngine;
use crate::engine::{Batch, Unit};
use crate::error::{Error, ErrorKind, Result};
use crate::jobs::{is_job, list_jobs, JobRunner, BHAVCOPY};
use crate::scheduler::Scheduler;
use crate::types::{Record, TableOptions, WriteMode};

/// Rows returned by a table preview unless `limit` is given
const DEFAULT_PREVIEW_ROWS: usize = 20;
const MAX_PREVIEW_ROWS: usize = 1000;

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    jobs: Arc<JobRunner>,
}

/// Request body for the ingest endpoint
#[derive(Debug, Deserialize)]
struct IngestRequest {
    /// Domain database
    database: String,
    /// Destination table
    table: String,
    /// Upsert key fields; append when absent
    #[serde(default)]
    keys: Option<Vec<String>>,
    #[serde(default)]
    options: TableOptions,
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct RunQuery {
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    limit: Option<usize>,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(msg: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(msg.into()),
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// HTTP status for an error
fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::UnknownJob { .. } | Error::UnknownDatabase { .. } => StatusCode::NOT_FOUND,
        _ => match err.kind() {
            ErrorKind::Config => StatusCode::BAD_REQUEST,
            ErrorKind::Fetch => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn error_response(err: &Error) -> Response {
    (
        error_status(err),
        Json(ApiResponse::<()>::error(err.to_string())),
    )
        .into_response()
}

/// Build the API router
pub fn router(jobs: Arc<JobRunner>) -> Router {
    // Build CORS layer - allow all origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/jobs", get(get_jobs))
        .route("/jobs/:name/run", post(run_job))
        .route("/ingest", post(ingest))
        .route("/bhavcopy/fetch-today", get(fetch_today))
        .route("/bhavcopy/fetch-range", get(fetch_range))
        .route("/databases/:database/tables", get(list_tables))
        .route("/databases/:database/tables/:table", get(describe_table))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { jobs })
}

/// Start the HTTP server, and the scheduler when enabled
pub async fn serve(
    jobs: Arc<JobRunner>,
    scheduler: &SchedulerConfig,
    server: &ServerConfig,
) -> Result<()> {
    let scheduler = if scheduler.enabled {
        Some(Scheduler::start(Arc::clone(&jobs), scheduler).await?)
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting HTTP server on http://{}", addr);

    axum::serve(listener, router(jobs))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Run blocking database work for a domain off the async runtime
async fn with_database<T, F>(state: &AppState, database: &str, f: F) -> Result<T>
where
    F: FnOnce(&DatabaseEngine) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.jobs.engine().databases().get(database)?;
    tokio::task::spawn_blocking(move || f(db.as_ref()))
        .await
        .map_err(|e| Error::Other(format!("database task failed: {e}")))?
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// List built-in jobs
async fn get_jobs() -> impl IntoResponse {
    Json(ApiResponse::success(json!({ "jobs": list_jobs() })))
}

/// Run a job now, optionally as of `?date=YYYY-MM-DD`
async fn run_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<RunQuery>,
) -> Response {
    if !is_job(&name) {
        return error_response(&Error::UnknownJob { name });
    }

    let result = match query.date {
        Some(date) => state.jobs.run_for(&name, date).await,
        None => state.jobs.run(&name).await,
    };
    match result {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::success(summary))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Write posted records through the engine
async fn ingest(State(state): State<AppState>, Json(request): Json<IngestRequest>) -> Response {
    if let Err(e) = state.jobs.engine().databases().get(&request.database) {
        return error_response(&e);
    }

    let mode = match request.keys {
        Some(keys) => WriteMode::Upsert { keys },
        None => WriteMode::Append,
    };
    let batch = Batch {
        table: request.table.clone(),
        mode,
        options: request.options,
        records: request.records,
    };
    let unit = Unit::from_batch(
        format!("ingest:{}", request.table),
        &request.database,
        batch,
    );

    let summary = state.jobs.engine().run(vec![unit]).await;
    match summary.units.first() {
        Some(result) if result.is_success() => {
            (StatusCode::OK, Json(ApiResponse::success(result.clone()))).into_response()
        }
        Some(result) => {
            let status = match result.error_kind {
                Some(ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            let message = result.error_message.clone().unwrap_or_default();
            (status, Json(ApiResponse::failure(message, result.clone()))).into_response()
        }
        None => error_response(&Error::Other("ingest produced no result".to_string())),
    }
}

/// Fetch today's bhavcopy
async fn fetch_today(State(state): State<AppState>) -> Response {
    match state.jobs.run(BHAVCOPY).await {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::success(summary))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Fetch bhavcopy for `?start_date=..&end_date=..`
async fn fetch_range(State(state): State<AppState>, Query(range): Query<RangeQuery>) -> Response {
    match state.jobs.backfill(range.start_date, range.end_date).await {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::success(summary))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// List tables of a domain database
async fn list_tables(State(state): State<AppState>, Path(database): Path<String>) -> Response {
    match with_database(&state, &database, DatabaseEngine::list_tables).await {
        Ok(tables) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "database": database,
                "tables": tables
            }))),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Describe a table with a row preview
async fn describe_table(
    State(state): State<AppState>,
    Path((database, table)): Path<(String, String)>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PREVIEW_ROWS)
        .min(MAX_PREVIEW_ROWS);
    let name = table.clone();
    let result = with_database(&state, &database, move |db| {
        let Some(info) = db.describe_table(&name)? else {
            return Ok(None);
        };
        let preview = db.preview(&name, limit)?;
        Ok(Some((info, preview)))
    })
    .await;

    match result {
        Ok(Some((info, preview))) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "database": database,
                "table": info,
                "preview": preview
            }))),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(format!(
                "Table '{table}' not found in '{database}'"
            ))),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
