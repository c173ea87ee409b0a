use crate::domain::model::Event;
use crate::domain::ports::{BenchContext, NoSqlDatabase};
use crate::nosql::memory::MemoryDatabase;
use crate::nosql::proxy::ProxyDatabase;
use crate::runtime::invoke;
use crate::storage::local::LocalStorage;
use crate::storage::proxy::ProxyStorage;
use crate::utils::error::{BenchError, Result};
use crate::utils::monitor::SystemMonitor;
use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the container entrypoint. The local storage and
/// in-memory table double as the Worker polyfill backing the `/r2/*` and
/// `/nosql/*` routes.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<LocalStorage>,
    pub nosql: Arc<MemoryDatabase>,
    pub scratch_dir: PathBuf,
    pub worker_url: Option<String>,
    pub monitor: Arc<SystemMonitor>,
}

impl AppState {
    pub fn new(storage_path: &str, scratch_path: &str, worker_url: Option<String>) -> Self {
        Self {
            storage: Arc::new(LocalStorage::new(storage_path)),
            nosql: Arc::new(MemoryDatabase::new()),
            scratch_dir: PathBuf::from(scratch_path),
            worker_url,
            monitor: Arc::new(SystemMonitor::new(false)),
        }
    }

    /// Picks backends per invocation: a per-request `X-Worker-URL` header
    /// wins, then the configured Worker, then the local polyfills.
    fn bench_context(&self, headers: &HeaderMap) -> BenchContext {
        let worker_url = headers
            .get("x-worker-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| self.worker_url.clone());

        match worker_url {
            Some(url) => {
                tracing::debug!(worker_url = %url, "routing storage through worker proxy");
                BenchContext::new(
                    Arc::new(ProxyStorage::new(url.clone())),
                    Arc::new(ProxyDatabase::new(url)),
                    self.scratch_dir.clone(),
                )
            }
            None => BenchContext::new(
                self.storage.clone(),
                self.nosql.clone(),
                self.scratch_dir.clone(),
            ),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", post(invoke_root).get(invoke_root))
        .route("/favicon.ico", get(favicon))
        .route("/r2/upload", post(r2_upload))
        .route("/r2/download", get(r2_download))
        .route("/r2/list", get(r2_list))
        .route("/nosql/:operation", post(nosql_operation))
        .route("/:benchmark", post(invoke_named).get(invoke_named))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn favicon() -> &'static str {
    "None"
}

async fn invoke_root(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Response {
    run_invocation(&state, None, query.as_deref(), &headers, &body).await
}

async fn invoke_named(
    State(state): State<AppState>,
    Path(benchmark): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Response {
    run_invocation(&state, Some(benchmark), query.as_deref(), &headers, &body).await
}

async fn run_invocation(
    state: &AppState,
    benchmark: Option<String>,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &str,
) -> Response {
    let outcome = async {
        let mut event = Event::from_request(body, query.unwrap_or(""))?;
        let benchmark = benchmark
            .or_else(|| event.get_str("benchmark").map(str::to_string))
            .ok_or_else(|| BenchError::EventError {
                message: "no benchmark in path or 'benchmark' event field".to_string(),
            })?;

        let ctx = state.bench_context(headers);
        let wants_html = event.get("html").is_some();
        let response = invoke::invoke(&benchmark, &mut event, &ctx, &state.monitor).await?;
        Ok::<_, BenchError>((response, wants_html))
    }
    .await;

    match outcome {
        Ok((response, true)) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            value_as_html(&response.result.output),
        )
            .into_response(),
        Ok((response, false)) => Json(response).into_response(),
        Err(err) => {
            let error = invoke::error_response(&err, "0");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
        }
    }
}

fn value_as_html(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(serde::Deserialize)]
struct ObjectParams {
    bucket: String,
    key: String,
}

#[derive(serde::Deserialize)]
struct ListParams {
    bucket: String,
    #[serde(default)]
    prefix: String,
}

/// R2 polyfill: stores under the exact key (clients uniquify before
/// calling, as the container wrapper does).
async fn r2_upload(
    State(state): State<AppState>,
    Query(params): Query<ObjectParams>,
    body: Bytes,
) -> Response {
    match state
        .storage
        .put_object(&params.bucket, &params.key, &body)
        .await
    {
        Ok(()) => Json(json!({"key": params.key})).into_response(),
        Err(err) => storage_error(err),
    }
}

async fn r2_download(
    State(state): State<AppState>,
    Query(params): Query<ObjectParams>,
) -> Response {
    use crate::domain::ports::ObjectStorage;
    match state
        .storage
        .download_stream(&params.bucket, &params.key)
        .await
    {
        Ok(data) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            data,
        )
            .into_response(),
        Err(err @ BenchError::ObjectNotFound { .. }) => {
            (StatusCode::NOT_FOUND, Json(json!({"error": err.to_string()}))).into_response()
        }
        Err(err) => storage_error(err),
    }
}

async fn r2_list(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    use crate::domain::ports::ObjectStorage;
    match state.storage.list(&params.bucket, &params.prefix).await {
        Ok(keys) => {
            let objects: Vec<Value> = keys.into_iter().map(|key| json!({"key": key})).collect();
            Json(json!({"objects": objects})).into_response()
        }
        Err(err) => storage_error(err),
    }
}

fn storage_error(err: BenchError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": err.to_string()})),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
struct NoSqlParams {
    table_name: String,
    primary_key: (String, String),
    #[serde(default)]
    secondary_key: Option<(String, String)>,
    #[serde(default)]
    secondary_key_name: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Map<String, Value>>,
}

/// Durable Object polyfill: one route per operation, mirroring the Worker's
/// `/nosql/{operation}` dispatch.
async fn nosql_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Json(params): Json<NoSqlParams>,
) -> Response {
    match run_nosql_operation(&state, &operation, params).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

async fn run_nosql_operation(
    state: &AppState,
    operation: &str,
    params: NoSqlParams,
) -> Result<Value> {
    let table = &params.table_name;
    let pk = (params.primary_key.0.as_str(), params.primary_key.1.as_str());
    let sk = |params: &NoSqlParams| -> Result<(String, String)> {
        params
            .secondary_key
            .clone()
            .ok_or_else(|| BenchError::NoSqlError {
                operation: operation.to_string(),
                table: table.clone(),
                message: "missing secondary_key".to_string(),
            })
    };

    match operation {
        "insert" | "update" => {
            let secondary = sk(&params)?;
            let data = params.data.clone().unwrap_or_default();
            if operation == "insert" {
                state
                    .nosql
                    .insert(table, pk, (&secondary.0, &secondary.1), data)
                    .await?;
            } else {
                state
                    .nosql
                    .update(table, pk, (&secondary.0, &secondary.1), data)
                    .await?;
            }
            Ok(json!({"status": "ok"}))
        }
        "get" => {
            let secondary = sk(&params)?;
            let item = state
                .nosql
                .get(table, pk, (&secondary.0, &secondary.1))
                .await?;
            Ok(json!({"data": item}))
        }
        "query" => {
            let sk_name = params
                .secondary_key_name
                .as_deref()
                .ok_or_else(|| BenchError::NoSqlError {
                    operation: "query".to_string(),
                    table: table.clone(),
                    message: "missing secondary_key_name".to_string(),
                })?;
            let items = state.nosql.query(table, pk, sk_name).await?;
            Ok(json!({"items": items}))
        }
        "delete" => {
            let secondary = sk(&params)?;
            state
                .nosql
                .delete(table, pk, (&secondary.0, &secondary.1))
                .await?;
            Ok(json!({"status": "ok"}))
        }
        other => Err(BenchError::NoSqlError {
            operation: other.to_string(),
            table: table.clone(),
            message: "unknown operation".to_string(),
        }),
    }
}

/// Binds and serves until shutdown.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "container server listening");
    axum::serve(listener, app(state))
        .await
        .map_err(BenchError::IoError)
}
