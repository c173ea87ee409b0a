use crate::benchmarks;
use crate::domain::model::{ErrorResponse, Event, InvocationResponse, LogData};
use crate::domain::ports::{BenchContext, ConfigProvider};
use crate::nosql::memory::MemoryDatabase;
use crate::nosql::proxy::ProxyDatabase;
use crate::runtime::coldstart;
use crate::storage::local::LocalStorage;
use crate::storage::proxy::ProxyStorage;
use crate::utils::error::{BenchError, Result};
use crate::utils::monitor::SystemMonitor;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Builds the invocation backends a config describes: proxies against the
/// fronting Worker when one is configured, local filesystem storage and a
/// fresh in-memory table otherwise.
pub fn context_from(config: &dyn ConfigProvider) -> BenchContext {
    match config.worker_url() {
        Some(url) => BenchContext::new(
            Arc::new(ProxyStorage::new(url)),
            Arc::new(ProxyDatabase::new(url)),
            config.scratch_path().into(),
        ),
        None => BenchContext::new(
            Arc::new(LocalStorage::new(config.storage_path())),
            Arc::new(MemoryDatabase::new()),
            config.scratch_path().into(),
        ),
    }
}

/// Stamps the fields every wrapper injects before the benchmark sees the
/// event. Returns the request id for the response envelope.
pub fn stamp_event(event: &mut Event) -> String {
    let request_id = match event.request_id() {
        Some(id) => id.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            event.insert("request-id", json!(id));
            id
        }
    };
    if event.get("income-timestamp").is_none() {
        event.insert("income-timestamp", json!(now_seconds()));
    }
    request_id
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Runs one benchmark invocation end to end: resolve the handler, execute
/// it against the provided backends, wall-clock the run, and wrap the output
/// in the response envelope. Errors bubble up for the entrypoint to
/// serialize as an error response.
pub async fn invoke(
    benchmark_name: &str,
    event: &mut Event,
    ctx: &BenchContext,
    monitor: &SystemMonitor,
) -> Result<InvocationResponse> {
    let request_id = stamp_event(event);
    let benchmark = benchmarks::lookup(benchmark_name)?;
    let is_cold = coldstart::consume_cold_start();

    tracing::info!(
        benchmark = benchmark_name,
        request_id = %request_id,
        is_cold,
        "invoking benchmark"
    );

    let begin = now_seconds();
    let mut output = benchmark.run(event, ctx).await?;
    let end = now_seconds();

    if let Some(measurement) = output.measurement.as_mut() {
        if measurement.memory_usage_mb.is_none() {
            measurement.memory_usage_mb = monitor.memory_usage_mb();
        }
    }

    let results_time = ((end - begin) * 1_000_000.0).round() as u64;

    Ok(InvocationResponse {
        begin: format!("{:.6}", begin),
        end: format!("{:.6}", end),
        results_time: results_time.to_string(),
        result: LogData {
            output: output.result,
            measurement: output.measurement,
        },
        is_cold,
        container_id: coldstart::container_id().to_string(),
        request_id,
    })
}

/// The error envelope: same identifying fields, an `error` message instead
/// of a result. Entrypoints send it with HTTP 500.
pub fn error_response(err: &BenchError, request_id: &str) -> ErrorResponse {
    tracing::error!(request_id, error = %err, "invocation failed");
    ErrorResponse {
        error: err.user_friendly_message(),
        is_cold: false,
        container_id: coldstart::container_id().to_string(),
        request_id: request_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nosql::memory::MemoryDatabase;
    use crate::storage::local::LocalStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_context(dir: &TempDir) -> BenchContext {
        BenchContext::new(
            Arc::new(LocalStorage::new(dir.path().join("storage"))),
            Arc::new(MemoryDatabase::new()),
            dir.path().join("scratch"),
        )
    }

    #[test]
    fn test_stamp_event_injects_fields() {
        let mut event = Event::new();
        let request_id = stamp_event(&mut event);

        assert_eq!(event.request_id(), Some(request_id.as_str()));
        assert!(event.get("income-timestamp").is_some());
    }

    #[test]
    fn test_stamp_event_keeps_existing_request_id() {
        let mut event = Event::new();
        event.insert("request-id", json!("fixed-id"));
        assert_eq!(stamp_event(&mut event), "fixed-id");
    }

    #[tokio::test]
    async fn test_invoke_unknown_benchmark() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);
        let monitor = SystemMonitor::new(false);

        let mut event = Event::new();
        let err = invoke("no-such-benchmark", &mut event, &ctx, &monitor)
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::UnknownBenchmark(_)));
    }

    #[tokio::test]
    async fn test_invoke_crud_populates_envelope() {
        let dir = TempDir::new().unwrap();
        let ctx = test_context(&dir);
        let monitor = SystemMonitor::new(false);

        let mut event = Event::from_value(json!({
            "requests": [
                {"route": "PUT /cart", "body": {
                    "cart": "c1", "product_id": "p1", "name": "widget", "price": 5
                }}
            ]
        }))
        .unwrap();

        let response = invoke("crud-api", &mut event, &ctx, &monitor)
            .await
            .unwrap();

        assert!(!response.request_id.is_empty());
        assert!(!response.container_id.is_empty());
        let begin: f64 = response.begin.parse().unwrap();
        let end: f64 = response.end.parse().unwrap();
        assert!(end >= begin);
        let results_time: u64 = response.results_time.parse().unwrap();
        assert!(results_time < 60_000_000, "well under a minute");
    }

    #[tokio::test]
    async fn test_context_from_local_config() {
        use crate::domain::ports::ObjectStorage;

        struct LocalOnly {
            storage: String,
            scratch: String,
        }
        impl ConfigProvider for LocalOnly {
            fn storage_path(&self) -> &str {
                &self.storage
            }
            fn scratch_path(&self) -> &str {
                &self.scratch
            }
            fn worker_url(&self) -> Option<&str> {
                None
            }
        }

        let dir = TempDir::new().unwrap();
        let config = LocalOnly {
            storage: dir.path().join("storage").to_string_lossy().into_owned(),
            scratch: dir.path().join("scratch").to_string_lossy().into_owned(),
        };

        let ctx = context_from(&config);
        let key = ctx
            .storage
            .upload_stream("bench", "a.txt", b"hello")
            .await
            .unwrap();
        let data = ctx.storage.download_stream("bench", &key).await.unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(ctx.scratch_dir, dir.path().join("scratch"));
    }

    #[test]
    fn test_error_response_shape() {
        let err = BenchError::UnknownBenchmark("x".to_string());
        let response = error_response(&err, "req-1");
        assert_eq!(response.request_id, "req-1");
        assert!(response.error.contains('x'));
    }
}
