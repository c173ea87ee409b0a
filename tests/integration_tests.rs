use faasbench::domain::model::Event;
use faasbench::domain::ports::{BenchContext, ObjectStorage};
use faasbench::runtime::invoke;
use faasbench::utils::monitor::SystemMonitor;
use faasbench::{LocalStorage, MemoryDatabase};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn local_context(dir: &TempDir) -> (Arc<LocalStorage>, BenchContext) {
    let storage = Arc::new(LocalStorage::new(dir.path().join("storage")));
    let ctx = BenchContext::new(
        storage.clone(),
        Arc::new(MemoryDatabase::new()),
        dir.path().join("scratch"),
    );
    (storage, ctx)
}

#[tokio::test]
async fn test_uploader_end_to_end() {
    let dir = TempDir::new().unwrap();
    let (storage, ctx) = local_context(&dir);
    let monitor = SystemMonitor::new(false);

    let server = MockServer::start();
    let payload = vec![42u8; 4096];
    let file_mock = server.mock(|when, then| {
        when.method(GET).path("/data/big-file.bin");
        then.status(200).body(&payload[..]);
    });

    let mut event = Event::from_value(json!({
        "bucket": {"bucket": "bench", "output": "uploads"},
        "object": {"url": server.url("/data/big-file.bin")},
    }))
    .unwrap();

    let response = invoke::invoke("uploader", &mut event, &ctx, &monitor)
        .await
        .unwrap();
    file_mock.assert();

    // envelope
    assert!(!response.request_id.is_empty());
    assert!(!response.container_id.is_empty());
    let results_time: u64 = response.results_time.parse().unwrap();
    assert!(results_time > 0);

    // output format
    let output = &response.result.output;
    assert_eq!(output["bucket"], "bench");
    let key = output["key"].as_str().unwrap();
    assert!(key.starts_with("uploads/big-file."));

    // stored object matches what the mock served
    let stored = storage.download_stream("bench", key).await.unwrap();
    assert_eq!(stored, payload);

    // measurement populated for the phases that ran; the fetch is booked
    // under compute for this benchmark
    let measurement = response.result.measurement.unwrap();
    assert_eq!(measurement.upload_size, 4096);
    assert_eq!(measurement.download_size, 0);
    assert_eq!(measurement.download_time, 0);
    assert!(measurement.compute_time > 0);
    assert!(measurement.upload_time > 0);
}

#[tokio::test]
async fn test_compression_end_to_end() {
    let dir = TempDir::new().unwrap();
    let (storage, ctx) = local_context(&dir);
    let monitor = SystemMonitor::new(false);

    storage
        .upload_stream("bench", "corpus/one.txt", b"first file contents")
        .await
        .unwrap();
    storage
        .upload_stream("bench", "corpus/nested/two.txt", b"second")
        .await
        .unwrap();

    let mut event = Event::from_value(json!({
        "bucket": {"bucket": "bench", "input": "corpus", "output": "archives"},
        "key": "corpus",
    }))
    .unwrap();

    let response = invoke::invoke("compression", &mut event, &ctx, &monitor)
        .await
        .unwrap();

    let key = response.result.output["key"].as_str().unwrap();
    assert!(key.starts_with("archives/corpus."));
    assert!(key.ends_with(".zip"));

    let data = storage.download_stream("bench", key).await.unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
    assert_eq!(archive.len(), 2);

    let measurement = response.result.measurement.unwrap();
    assert_eq!(measurement.download_size, 19 + 6);
    assert!(measurement.upload_size > 0);
}

#[tokio::test]
async fn test_crud_api_end_to_end() {
    let dir = TempDir::new().unwrap();
    let (_storage, ctx) = local_context(&dir);
    let monitor = SystemMonitor::new(false);

    let mut event = Event::from_value(json!({
        "table": "carts",
        "requests": [
            {"route": "PUT /cart", "body": {
                "cart": "alpha", "product_id": "p1", "name": "widget",
                "price": 4, "quantity": 3
            }},
            {"route": "GET /cart", "body": {"cart": "alpha"}},
        ]
    }))
    .unwrap();

    let response = invoke::invoke("crud-api", &mut event, &ctx, &monitor)
        .await
        .unwrap();

    let responses = response.result.output["responses"].as_array().unwrap();
    assert_eq!(responses[0]["status"], "added");
    assert_eq!(responses[1]["price"], 12.0);
}

#[tokio::test]
async fn test_unknown_benchmark_yields_error_envelope() {
    let dir = TempDir::new().unwrap();
    let (_storage, ctx) = local_context(&dir);
    let monitor = SystemMonitor::new(false);

    let mut event = Event::new();
    let err = invoke::invoke("bfs", &mut event, &ctx, &monitor)
        .await
        .unwrap_err();

    let envelope = invoke::error_response(&err, event.request_id().unwrap());
    assert!(envelope.error.contains("bfs"));
    assert!(!envelope.container_id.is_empty());
}

#[tokio::test]
async fn test_uploader_upstream_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let (_storage, ctx) = local_context(&dir);
    let monitor = SystemMonitor::new(false);

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/flaky");
        then.status(503);
    });

    let mut event = Event::from_value(json!({
        "bucket": {"bucket": "bench"},
        "object": {"url": server.url("/flaky")},
    }))
    .unwrap();

    assert!(invoke::invoke("uploader", &mut event, &ctx, &monitor)
        .await
        .is_err());
}
